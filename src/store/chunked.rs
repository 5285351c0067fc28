//! Chunked record store.
//!
//! Records are appended to one temporary file in sequential segments
//! ("chunks"). Once a chunk is closed it is immutable and can be opened and
//! iterated on its own, independently of every other chunk.

use crate::codec::Codec;
use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::store::stream::{open_region, RecordEncoder, RecordIterator, StreamWriter};
use std::io::{BufWriter, Seek};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Location of one closed chunk within the store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHandle {
    /// File offset of the first byte of the chunk
    pub offset: u64,
    /// Size of the chunk in bytes
    pub size: u64,
    /// Number of records in the chunk
    pub records: u64,
}

/// Appends records to disk in independently iterable chunks.
pub struct ChunkedStore<T> {
    file: Option<NamedTempFile>,
    writer: Option<StreamWriter>,
    encoder: RecordEncoder<T>,
    codec: Arc<dyn Codec<T>>,
    compression: CompressionType,
    chunks: Vec<ChunkHandle>,
    chunk_offset: u64,
    chunk_records: u64,
}

impl<T> ChunkedStore<T> {
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
            chunks: Vec::new(),
            chunk_offset: 0,
            chunk_records: 0,
        })
    }

    /// Append a record to the currently open chunk.
    pub fn add(&mut self, record: &T) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::invalid_state("Chunked store has been released"))?;
        self.encoder.write(record, writer)?;
        self.chunk_records += 1;
        Ok(())
    }

    /// Close the current chunk and start a new one.
    ///
    /// Everything written so far is flushed, so the closed chunk can be read
    /// immediately.
    pub fn close_chunk(&mut self) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| Error::invalid_state("Chunked store has been released"))?;
        let mut inner = writer.finish()?;
        let end = inner.get_mut().stream_position()?;

        let handle = ChunkHandle {
            offset: self.chunk_offset,
            size: end - self.chunk_offset,
            records: self.chunk_records,
        };
        log::trace!(
            "Closed chunk {} ({} records, {} bytes)",
            self.chunks.len(),
            handle.records,
            handle.size
        );
        self.chunks.push(handle);
        self.chunk_offset = end;
        self.chunk_records = 0;
        self.writer = Some(StreamWriter::new(inner, self.compression));
        Ok(())
    }

    /// Number of closed chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Handle of a closed chunk
    pub fn chunk(&self, index: usize) -> Option<ChunkHandle> {
        self.chunks.get(index).copied()
    }

    /// Open an iterator over the records of one closed chunk.
    ///
    /// Each call opens its own file handle.
    pub fn iter_chunk(&self, index: usize) -> Result<RecordIterator<T>> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| Error::invalid_state("Chunked store has been released"))?;
        let handle = self.chunks.get(index).ok_or_else(|| {
            Error::invalid_argument(format!(
                "Chunk {} does not exist ({} closed chunks)",
                index,
                self.chunks.len()
            ))
        })?;

        let reader = open_region(file.path(), handle.offset, handle.size, self.compression)?;
        Ok(RecordIterator::new(reader, Arc::clone(&self.codec)))
    }

    /// Delete the backing file. Safe to call more than once.
    pub fn release(&mut self) {
        self.writer = None;
        if let Some(file) = self.file.take() {
            if let Err(e) = file.close() {
                log::warn!("Failed to remove chunk store file: {}", e);
            }
        }
    }
}

impl<T> Drop for ChunkedStore<T> {
    fn drop(&mut self) {
        self.release();
    }
}
