//! External merge sort.
//!
//! [`ExternalSorter`] sorts more records than fit in memory by spilling
//! sorted chunks to disk and merging them with [`MergeIterator`].

pub mod merge;
pub mod sorter;

pub use merge::{Comparator, MergeIterator, RecordSource};
pub use sorter::{ExternalSorter, SortedIter};
