// End-to-end tests for fixed-width indexes and the indexed record store

use planetcore::codec::BincodeCodec;
use planetcore::index::{
    IdOffsetElement, IndexReader, IndexWriter, IndexedRecordStoreReader, IndexedRecordStoreWriter,
    TileIdElement,
};
use planetcore::{Error, SortOptions};
use proptest::prelude::*;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn id_codec() -> Arc<BincodeCodec<IdOffsetElement>> {
    Arc::new(BincodeCodec::new())
}

fn write_ids(path: &Path, ids: &[i64]) {
    let mut writer = IndexWriter::create(path, id_codec()).unwrap();
    for &id in ids {
        writer.write(&IdOffsetElement::new(id, id.unsigned_abs() * 10)).unwrap();
    }
    writer.complete().unwrap();
}

/// Index 100k shuffled ids, then look every tenth one up
#[test]
fn test_index_large_unordered() {
    env_logger::try_init().ok();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nodes.idx");

    let mut ids: Vec<i64> = (0..100_000).map(|i| i * 2).collect();
    ids.shuffle(&mut rand::rng());

    let options = SortOptions::new().buffer_capacity(10_000).temp_dir(dir.path());
    let mut writer = IndexWriter::with_sort_options(&path, id_codec(), options).unwrap();
    for &id in &ids {
        writer.write(&IdOffsetElement::new(id, id as u64 + 1)).unwrap();
    }
    writer.complete().unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 100_000 * 16);

    let mut reader = IndexReader::open(&path, id_codec()).unwrap();
    assert_eq!(reader.len(), 100_000);
    assert_eq!(reader.element_size(), 16);
    for id in (0..200_000).step_by(10) {
        let found = reader.find(&id).unwrap();
        if id % 2 == 0 {
            assert_eq!(found, Some(IdOffsetElement::new(id, id as u64 + 1)));
        } else {
            assert_eq!(found, None);
        }
    }
    assert!(reader.get(&200_000).unwrap_err().is_not_found());
    assert!(reader.get(&-1).unwrap_err().is_not_found());
}

/// Ranges over a tile index return every element of the requested tiles
#[test]
fn test_tile_ranges() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tiles.idx");
    let codec = Arc::new(BincodeCodec::<TileIdElement>::new());

    let mut writer = IndexWriter::create(&path, codec.clone()).unwrap();
    for tile in [10u32, 20, 30] {
        for id in 0..4 {
            writer.write(&TileIdElement::new(tile, tile as i64 * 100 + id)).unwrap();
        }
    }
    writer.complete().unwrap();

    let mut reader = IndexReader::open(&path, codec).unwrap();
    let ids = |reader: &mut IndexReader<TileIdElement>, begin: u32, end: u32| -> Vec<i64> {
        reader.get_range(&begin, &end).unwrap().map(|e| e.unwrap().id).collect()
    };

    assert_eq!(ids(&mut reader, 20, 20), vec![2000, 2001, 2002, 2003]);
    assert_eq!(ids(&mut reader, 15, 25), vec![2000, 2001, 2002, 2003]);
    assert_eq!(ids(&mut reader, 0, 10).len(), 4);
    assert_eq!(ids(&mut reader, 10, 30).len(), 12);
    assert!(ids(&mut reader, 21, 29).is_empty());
    assert!(ids(&mut reader, 31, 100).is_empty());
    assert!(ids(&mut reader, 30, 10).is_empty());
}

/// Keys that occur more than once: find returns the first of them
#[test]
fn test_duplicate_keys_first_match() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dups.idx");

    let mut writer = IndexWriter::create(&path, id_codec()).unwrap();
    for (id, offset) in [(1, 0), (5, 1), (5, 2), (5, 3), (9, 4)] {
        writer.write(&IdOffsetElement::new(id, offset)).unwrap();
    }
    writer.complete().unwrap();

    let mut reader = IndexReader::open(&path, id_codec()).unwrap();
    assert_eq!(reader.get(&5).unwrap().offset, 1);
    let offsets: Vec<u64> = reader.get_range(&5, &5).unwrap().map(|e| e.unwrap().offset).collect();
    assert_eq!(offsets, vec![1, 2, 3]);
}

/// An empty index opens and finds nothing
#[test]
fn test_empty_index() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.idx");
    write_ids(&path, &[]);

    let mut reader = IndexReader::open(&path, id_codec()).unwrap();
    assert!(reader.is_empty());
    assert_eq!(reader.find(&0).unwrap(), None);
    assert_eq!(reader.get_range(&i64::MIN, &i64::MAX).unwrap().count(), 0);
}

/// A truncated index is reported as corrupt
#[test]
fn test_truncated_index() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cut.idx");
    write_ids(&path, &[1, 2, 3]);

    let data = std::fs::read(&path).unwrap();
    std::fs::write(&path, &data[..data.len() - 5]).unwrap();
    assert!(matches!(IndexReader::open(&path, id_codec()), Err(Error::Corruption(_))));
}

/// Readers and writers can be released any number of times
#[test]
fn test_index_release_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rel.idx");
    write_ids(&path, &[4, 8]);

    let mut reader = IndexReader::open(&path, id_codec()).unwrap();
    assert!(reader.find(&4).unwrap().is_some());
    reader.release();
    reader.release();
    assert!(reader.find(&4).is_err());

    let mut writer = IndexWriter::create(dir.path().join("other.idx"), id_codec()).unwrap();
    writer.release();
    writer.release();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Relation {
    id: i64,
    members: Vec<(char, i64, String)>,
}

/// Variable-size records fetched by id through the offset index
#[test]
fn test_record_store() {
    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("relations.dat");
    let index_path = dir.path().join("relations.idx");
    let codec = Arc::new(BincodeCodec::<Relation>::new());

    let relation = |id: i64| Relation {
        id,
        members: (0..id % 5).map(|n| ('w', id * 10 + n, format!("outer{}", n))).collect(),
    };

    let mut ids: Vec<i64> = (1..=500).collect();
    ids.shuffle(&mut rand::rng());
    let mut writer = IndexedRecordStoreWriter::create(&data_path, &index_path, codec.clone()).unwrap();
    for &id in &ids {
        writer.add(id, &relation(id)).unwrap();
    }
    writer.complete().unwrap();

    let mut reader = IndexedRecordStoreReader::open(&data_path, &index_path, codec).unwrap();
    assert_eq!(reader.len(), 500);
    for id in [1, 77, 250, 500] {
        assert_eq!(reader.get(id).unwrap(), relation(id));
    }
    assert!(reader.find(501).unwrap().is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// find and get_range agree with an ordered map of the same elements
    #[test]
    fn prop_index_matches_map(
        ids in prop::collection::vec(-1000i64..1000, 0..300),
        probes in prop::collection::vec(-1100i64..1100, 1..50),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prop.idx");

        let mut expected: BTreeMap<i64, Vec<u64>> = BTreeMap::new();
        let mut writer = IndexWriter::with_sort_options(
            &path,
            id_codec(),
            SortOptions::new().buffer_capacity(32).temp_dir(dir.path()),
        )
        .unwrap();
        for (offset, &id) in ids.iter().enumerate() {
            writer.write(&IdOffsetElement::new(id, offset as u64)).unwrap();
            expected.entry(id).or_default().push(offset as u64);
        }
        writer.complete().unwrap();

        let mut reader = IndexReader::open(&path, id_codec()).unwrap();
        prop_assert_eq!(reader.len(), ids.len() as u64);

        for window in probes.windows(2) {
            let (id, other) = (window[0], window[1]);
            let found = reader.find(&id).unwrap().map(|e| e.offset);
            prop_assert_eq!(found, expected.get(&id).map(|offsets| offsets[0]));

            let (begin, end) = (id.min(other), id.max(other));
            let range: Vec<u64> =
                reader.get_range(&begin, &end).unwrap().map(|e| e.unwrap().offset).collect();
            let wanted: Vec<u64> =
                expected.range(begin..=end).flat_map(|(_, offsets)| offsets.clone()).collect();
            prop_assert_eq!(range, wanted);
        }
    }
}
