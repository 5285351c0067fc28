//! External merge sort.
//!
//! Records are buffered in memory up to `buffer_capacity`. A full buffer is
//! sorted and spilled to a [`ChunkedStore`] as one chunk. Iteration merges
//! the chunks recursively, at most `fan_out` sources per merge, and drains
//! the partial result to a [`PersistentStore`] every `persistence_interval`
//! levels so the number of open files stays bounded for any input size.

use crate::codec::Codec;
use crate::config::SortOptions;
use crate::error::{Error, Result};
use crate::sort::merge::{Comparator, MergeIterator, RecordSource};
use crate::store::{ChunkedStore, PersistentStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Sorts an unbounded number of records using bounded memory.
///
/// Usage:
/// ```no_run
/// use planetcore::codec::BincodeCodec;
/// use planetcore::sort::ExternalSorter;
/// use planetcore::SortOptions;
/// use std::sync::Arc;
///
/// let mut sorter =
///     ExternalSorter::with_ord(SortOptions::default(), Arc::new(BincodeCodec::<i64>::new()))
///         .unwrap();
/// sorter.add(42).unwrap();
/// sorter.add(-7).unwrap();
/// for id in sorter.iterate().unwrap() {
///     println!("{}", id.unwrap());
/// }
/// sorter.release();
/// ```
pub struct ExternalSorter<T> {
    options: SortOptions,
    codec: Arc<dyn Codec<T>>,
    comparator: Comparator<T>,
    buffer: Vec<T>,
    temp_dir: Option<TempDir>,
    chunks: Option<ChunkedStore<T>>,
    persisted: Vec<PersistentStore<T>>,
    len: u64,
    iterated: bool,
    released: bool,
}

impl<T: Send + 'static> ExternalSorter<T> {
    /// Create a sorter ordering records with `comparator`.
    pub fn new(
        options: SortOptions,
        codec: Arc<dyn Codec<T>>,
        comparator: Comparator<T>,
    ) -> Result<Self> {
        options.validate()?;
        let buffer = Vec::with_capacity(options.buffer_capacity.min(64 * 1024));

        Ok(Self {
            options,
            codec,
            comparator,
            buffer,
            temp_dir: None,
            chunks: None,
            persisted: Vec::new(),
            len: 0,
            iterated: false,
            released: false,
        })
    }

    /// Create a sorter using the natural order of `T`.
    pub fn with_ord(options: SortOptions, codec: Arc<dyn Codec<T>>) -> Result<Self>
    where
        T: Ord,
    {
        Self::new(options, codec, Arc::new(|a: &T, b: &T| a.cmp(b)))
    }

    /// Add a record. Records may arrive in any order.
    pub fn add(&mut self, record: T) -> Result<()> {
        self.check_writable()?;
        self.buffer.push(record);
        self.len += 1;
        if self.buffer.len() >= self.options.buffer_capacity {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Number of records added
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check if no records have been added
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chunks spilled to disk so far
    pub fn chunk_count(&self) -> usize {
        self.chunks.as_ref().map_or(0, |c| c.chunk_count())
    }

    /// Return all added records in ascending order.
    ///
    /// This can only be called once. The returned sequence reads from
    /// temporary files owned by the sorter; [`release`](Self::release) the
    /// sorter once the sequence is no longer needed.
    pub fn iterate(&mut self) -> Result<SortedIter<T>> {
        self.check_writable()?;
        self.iterated = true;

        if !self.buffer.is_empty() {
            self.flush_buffer()?;
        }

        let chunk_count = self.chunk_count();
        if chunk_count == 0 {
            return Ok(SortedIter { inner: Box::new(std::iter::empty()) });
        }

        log::debug!("Merging {} records from {} chunks", self.len, chunk_count);
        let inner = self.merge_range(0, 0, chunk_count)?;
        Ok(SortedIter { inner })
    }

    /// Delete all temporary files. Never fails and is safe to call more than
    /// once, including after a failed sort.
    pub fn release(&mut self) {
        self.released = true;
        self.buffer = Vec::new();
        for mut store in self.persisted.drain(..) {
            store.release();
        }
        if let Some(mut chunks) = self.chunks.take() {
            chunks.release();
        }
        if let Some(dir) = self.temp_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                log::warn!("Failed to remove sort directory {}: {}", path.display(), e);
            }
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.released {
            return Err(Error::invalid_state("Sorter has been released"));
        }
        if self.iterated {
            return Err(Error::invalid_state("Sorter has already been iterated"));
        }
        Ok(())
    }

    fn temp_path(&mut self) -> Result<PathBuf> {
        if self.temp_dir.is_none() {
            self.temp_dir = Some(self.options.create_temp_dir()?);
        }
        match &self.temp_dir {
            Some(dir) => Ok(dir.path().to_path_buf()),
            None => Err(Error::invalid_state("Sort directory unavailable")),
        }
    }

    /// Sort the buffer and write it out as one chunk.
    fn flush_buffer(&mut self) -> Result<()> {
        if self.chunks.is_none() {
            let dir = self.temp_path()?;
            self.chunks =
                Some(ChunkedStore::new(&dir, Arc::clone(&self.codec), self.options.compression)?);
        }

        let comparator = Arc::clone(&self.comparator);
        self.buffer.sort_by(|a, b| comparator(a, b));

        let chunks = match self.chunks.as_mut() {
            Some(chunks) => chunks,
            None => return Err(Error::invalid_state("Chunk store unavailable")),
        };
        for record in &self.buffer {
            chunks.add(record)?;
        }
        chunks.close_chunk()?;
        log::debug!(
            "Spilled chunk {} with {} records",
            chunks.chunk_count() - 1,
            self.buffer.len()
        );

        self.buffer.clear();
        Ok(())
    }

    /// Merge chunks `[start, start + count)` into one sorted source.
    fn merge_range(&mut self, depth: usize, start: usize, count: usize) -> Result<RecordSource<T>> {
        let fan_out = self.options.fan_out;

        if count <= fan_out {
            let chunks = self
                .chunks
                .as_ref()
                .ok_or_else(|| Error::invalid_state("Chunk store unavailable"))?;
            let mut sources: Vec<RecordSource<T>> = Vec::with_capacity(count);
            for index in start..start + count {
                log::trace!("Opening chunk {} at depth {}", index, depth);
                sources.push(Box::new(chunks.iter_chunk(index)?));
            }
            if sources.len() == 1 {
                return Ok(sources.remove(0));
            }
            return Ok(Box::new(MergeIterator::new(sources, Arc::clone(&self.comparator))?));
        }

        let group_size = (count / fan_out).max(fan_out);
        let end = start + count;
        let mut sources = Vec::with_capacity(count.div_ceil(group_size));
        let mut group_start = start;
        while group_start < end {
            let group_count = group_size.min(end - group_start);
            sources.push(self.merge_range(depth + 1, group_start, group_count)?);
            group_start += group_count;
        }
        let merged = MergeIterator::new(sources, Arc::clone(&self.comparator))?;

        if (depth + 1) % self.options.persistence_interval == 0 {
            let dir = self.temp_path()?;
            let mut store = PersistentStore::drain(
                &dir,
                Arc::clone(&self.codec),
                self.options.compression,
                merged,
            )?;
            log::debug!(
                "Persisted {} records from chunks {}..{} at depth {}",
                store.len(),
                start,
                end,
                depth
            );
            let iter = store.iter()?;
            self.persisted.push(store);
            return Ok(Box::new(iter));
        }

        Ok(Box::new(merged))
    }
}

impl<T> Drop for ExternalSorter<T> {
    fn drop(&mut self) {
        if let Some(mut chunks) = self.chunks.take() {
            chunks.release();
        }
        for store in self.persisted.iter_mut() {
            store.release();
        }
        if let Some(dir) = self.temp_dir.take() {
            if let Err(e) = dir.close() {
                log::warn!("Failed to remove sort directory: {}", e);
            }
        }
    }
}

/// One-shot ascending sequence of sorted records.
pub struct SortedIter<T> {
    inner: RecordSource<T>,
}

impl<T> Iterator for SortedIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
