//! Persistent record store.
//!
//! Holds one sequence of records in a single stream without chunk
//! boundaries. The sorter uses it to materialise an intermediate merge
//! result so the iterators feeding that merge can be closed.

use crate::codec::Codec;
use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::store::stream::{open_region, RecordEncoder, RecordIterator, StreamWriter};
use std::io::{BufWriter, Seek};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Single-stream temporary record store.
pub struct PersistentStore<T> {
    file: Option<NamedTempFile>,
    writer: Option<StreamWriter>,
    encoder: RecordEncoder<T>,
    codec: Arc<dyn Codec<T>>,
    compression: CompressionType,
    len: u64,
    size: Option<u64>,
}

impl<T> PersistentStore<T> {
    /// Create an empty store backed by a new temporary file in `dir`.
    pub fn new(dir: &Path, codec: Arc<dyn Codec<T>>, compression: CompressionType) -> Result<Self> {
        let file = NamedTempFile::new_in(dir)?;
        let writer = BufWriter::new(file.reopen()?);

        Ok(Self {
            file: Some(file),
            writer: Some(StreamWriter::new(writer, compression)),
            encoder: RecordEncoder::new(Arc::clone(&codec)),
            codec,
            compression,
            len: 0,
            size: None,
        })
    }

    /// Create a store holding every record produced by `source`.
    ///
    /// The source is consumed completely; its first error aborts the drain.
    pub fn drain<I>(
        dir: &Path,
        codec: Arc<dyn Codec<T>>,
        compression: CompressionType,
        source: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Result<T>>,
    {
        let mut store = Self::new(dir, codec, compression)?;
        for record in source {
            store.add(&record?)?;
        }
        store.complete()?;
        Ok(store)
    }

    /// Append a record.
    pub fn add(&mut self, record: &T) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Persistent store is not writable"))?;
        self.encoder.write(record, writer)?;
        self.len += 1;
        Ok(())
    }

    /// Finish writing. Further adds fail; reading becomes possible.
    pub fn complete(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            let mut inner = writer.finish()?;
            self.size = Some(inner.get_mut().stream_position()?);
        }
        Ok(())
    }

    /// Number of records written
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Open an iterator over all records, completing the store first if
    /// it is still being written.
    pub fn iter(&mut self) -> Result<RecordIterator<T>> {
        self.complete()?;
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| Error::invalid_state("Persistent store has been released"))?;
        let size = self.size.unwrap_or(0);

        let reader = open_region(file.path(), 0, size, self.compression)?;
        Ok(RecordIterator::new(reader, Arc::clone(&self.codec)))
    }

    /// Delete the backing file. Safe to call more than once.
    pub fn release(&mut self) {
        self.writer = None;
        if let Some(file) = self.file.take() {
            if let Err(e) = file.close() {
                log::warn!("Failed to remove persistent store file: {}", e);
            }
        }
    }
}

impl<T> Drop for PersistentStore<T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BincodeCodec;
    use tempfile::TempDir;

    fn codec() -> Arc<dyn Codec<String>> {
        Arc::new(BincodeCodec::<String>::new())
    }

    #[test]
    fn test_write_then_iterate() {
        let temp_dir = TempDir::new().unwrap();
        let mut store =
            PersistentStore::new(temp_dir.path(), codec(), CompressionType::default()).unwrap();

        store.add(&"way".to_string()).unwrap();
        store.add(&"node".to_string()).unwrap();
        assert_eq!(store.len(), 2);

        let records: Vec<String> = store.iter().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(records, vec!["way", "node"]);

        // Writing is over once reading starts.
        assert!(store.add(&"relation".to_string()).is_err());

        // A second pass sees the same records.
        assert_eq!(store.iter().unwrap().count(), 2);
    }

    #[test]
    fn test_drain() {
        let temp_dir = TempDir::new().unwrap();
        let source = (0..10).map(|i| Ok(format!("r{}", i)));
        let mut store =
            PersistentStore::drain(temp_dir.path(), codec(), CompressionType::None, source)
                .unwrap();

        assert_eq!(store.len(), 10);
        let records: Vec<String> = store.iter().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(records.first().map(String::as_str), Some("r0"));
        assert_eq!(records.last().map(String::as_str), Some("r9"));
    }

    #[test]
    fn test_drain_propagates_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = vec![Ok("a".to_string()), Err(Error::corruption("bad chunk"))];
        let result = PersistentStore::drain(temp_dir.path(), codec(), CompressionType::None, source);
        assert!(matches!(result, Err(Error::Corruption(_))));
    }

    #[test]
    fn test_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let mut store =
            PersistentStore::new(temp_dir.path(), codec(), CompressionType::default()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.iter().unwrap().count(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut store =
            PersistentStore::new(temp_dir.path(), codec(), CompressionType::None).unwrap();
        store.add(&"x".to_string()).unwrap();

        store.release();
        store.release();
        assert!(store.iter().is_err());
    }
}
