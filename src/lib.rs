//! # planetcore - Out-of-Core Sorting and Indexing for Map Data
//!
//! planetcore provides the storage primitives a map-data pipeline needs when
//! the input (billions of nodes, ways and relations) does not fit in memory.
//!
//! ## Architecture
//!
//! - **Stores**: Temporary record files. A chunked store keeps many
//!   independently readable chunks in one file; a persistent store holds one
//!   sequence that can be replayed any number of times.
//! - **External sorter**: Sorts any number of records with a bounded buffer,
//!   spilling sorted chunks and merging them back recursively.
//! - **Index**: Fixed-width, key-sorted index files with cached binary
//!   search for point and range lookups.
//! - **Id sets**: Dense, sparse and segmented realizations of a set of ids.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use planetcore::codec::BincodeCodec;
//! use planetcore::index::{IdOffsetElement, IndexReader, IndexWriter};
//! use planetcore::{ExternalSorter, SortOptions};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), planetcore::Error> {
//! // Sort ids with at most 1024 of them in memory
//! let options = SortOptions::new().buffer_capacity(1024);
//! let mut sorter = ExternalSorter::with_ord(options, Arc::new(BincodeCodec::<i64>::new()))?;
//! for id in (0..100_000).rev() {
//!     sorter.add(id)?;
//! }
//!
//! // Index each id by its position
//! let codec = Arc::new(BincodeCodec::<IdOffsetElement>::new());
//! let mut writer = IndexWriter::create("ids.idx", codec.clone())?;
//! for (position, id) in sorter.iterate()?.enumerate() {
//!     writer.write(&IdOffsetElement::new(id?, position as u64))?;
//! }
//! writer.complete()?;
//! sorter.release();
//!
//! // Look ids up
//! let mut reader = IndexReader::open("ids.idx", codec)?;
//! assert_eq!(reader.get(&500)?.offset, 500);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod codec;
pub mod config;
pub mod error;
pub mod idset;
pub mod index;
pub mod sort;
pub mod store;

// Re-exports
pub use codec::{BincodeCodec, Codec};
pub use config::{CompressionType, IdTrackerType, SortOptions};
pub use error::{Error, Result};
pub use idset::{new_id_tracker, DenseIdSet, IdTracker, SegmentedIdSet, SparseIdSet};
pub use index::{IndexElement, IndexReader, IndexWriter};
pub use sort::{Comparator, ExternalSorter, MergeIterator};
