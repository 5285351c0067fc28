//! Index and id set example for planetcore
//!
//! This example demonstrates:
//! - Storing variable-size records addressable by id
//! - Range queries over a tile index
//! - Tracking selected ids with an id set

use planetcore::codec::BincodeCodec;
use planetcore::index::{
    IndexReader, IndexWriter, IndexedRecordStoreReader, IndexedRecordStoreWriter, TileIdElement,
};
use planetcore::{new_id_tracker, IdTrackerType};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let dir = tempfile::tempdir()?;
    let data_path = dir.path().join("nodes.dat");
    let index_path = dir.path().join("nodes.idx");
    let tiles_path = dir.path().join("tiles.idx");

    // Write node names by id and a tile index, in arbitrary order
    let codec = Arc::new(BincodeCodec::<String>::new());
    let mut store = IndexedRecordStoreWriter::create(&data_path, &index_path, codec.clone())?;
    let tile_codec = Arc::new(BincodeCodec::<TileIdElement>::new());
    let mut tiles = IndexWriter::create(&tiles_path, tile_codec.clone())?;
    for id in [42i64, 7, 1000, 3, 512] {
        store.add(id, &format!("node {}", id))?;
        tiles.write(&TileIdElement::new((id % 4) as u32, id))?;
    }
    store.complete()?;
    tiles.complete()?;

    // Fetch records by id
    let mut store = IndexedRecordStoreReader::open(&data_path, &index_path, codec)?;
    println!("id 42 => {}", store.get(42)?);
    println!("id 43 => {:?}", store.find(43)?);

    // Select every node in tiles 0..=2
    let mut selected = new_id_tracker(IdTrackerType::default());
    let mut tiles = IndexReader::open(&tiles_path, tile_codec)?;
    for element in tiles.get_range(&0, &2)? {
        selected.insert(element?.id)?;
    }
    let count = selected.len();
    println!("Selected {} nodes: {:?}", count, selected.iter().collect::<Vec<_>>());

    store.release();
    tiles.release();
    selected.release();

    Ok(())
}
