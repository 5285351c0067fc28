//! Multi-way merge iterator.
//!
//! This module provides an iterator that merges multiple sorted record
//! sources into a single sorted stream.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// Total order over records, consistent for the lifetime of a sort.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A lazily evaluated, fallible sequence of records.
pub type RecordSource<T> = Box<dyn Iterator<Item = Result<T>> + Send>;

/// Entry in the merge heap
struct MergeEntry<T> {
    record: T,
    source_index: usize,
    comparator: Comparator<T>,
}

impl<T> PartialEq for MergeEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for MergeEntry<T> {}

impl<T> PartialOrd for MergeEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for MergeEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (smallest record first)
        (self.comparator)(&other.record, &self.record).then_with(|| {
            // For equal records, prefer the earlier source
            other.source_index.cmp(&self.source_index)
        })
    }
}

/// Multi-way merge iterator over sorted sources.
///
/// Always yields the smallest head across all open sources. Records that
/// compare equal come out in source order, so merging chunks that were
/// written in input order keeps the sort stable.
///
/// An error from any source is yielded once, after which the iterator ends.
pub struct MergeIterator<T> {
    heap: BinaryHeap<MergeEntry<T>>,
    sources: Vec<RecordSource<T>>,
    comparator: Comparator<T>,
    pending_error: Option<Error>,
    failed: bool,
}

impl<T> MergeIterator<T> {
    /// Create a new merge iterator, reading the first record of every source.
    pub fn new(sources: Vec<RecordSource<T>>, comparator: Comparator<T>) -> Result<Self> {
        let mut merge = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            comparator,
            pending_error: None,
            failed: false,
        };

        for index in 0..merge.sources.len() {
            merge.advance_source(index)?;
        }

        Ok(merge)
    }

    /// Number of sources being merged
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Advance the source at the given index and add its next record to the heap
    fn advance_source(&mut self, index: usize) -> Result<()> {
        if let Some(record) = self.sources[index].next() {
            self.heap.push(MergeEntry {
                record: record?,
                source_index: index,
                comparator: Arc::clone(&self.comparator),
            });
        }
        Ok(())
    }
}

impl<T> Iterator for MergeIterator<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(e) = self.pending_error.take() {
            self.failed = true;
            return Some(Err(e));
        }

        // Pop the smallest entry from the heap
        let entry = self.heap.pop()?;

        // Refill from the source that provided this entry
        if let Err(e) = self.advance_source(entry.source_index) {
            log::error!("Error advancing merge source {}: {}", entry.source_index, e);
            self.heap.clear();
            self.pending_error = Some(e);
        }

        Some(Ok(entry.record))
    }
}
