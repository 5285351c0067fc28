//! Fixed-width random-access index.
//!
//! An index file is a flat sequence of equally sized encoded elements with
//! no header:
//!
//! ```text
//! [Element 0][Element 1]...[Element N-1]
//! ```
//!
//! Element `i` starts at byte `i * element_size`, and the element size is
//! recovered at open time from the encoded width of element 0. Elements are
//! stored in ascending key order, which [`IndexWriter`] guarantees (sorting
//! on completion if needed) and [`IndexReader`] relies on for binary search.

pub mod element;
pub mod object_store;
pub mod reader;
pub mod writer;

pub use element::{IdOffsetElement, IndexElement, TileIdElement};
pub use object_store::{IndexedRecordStoreReader, IndexedRecordStoreWriter};
pub use reader::{IndexReader, RangeIter};
pub use writer::IndexWriter;
