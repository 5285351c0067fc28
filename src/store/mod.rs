//! Temporary record stores used by the external sorter.
//!
//! ## File Format
//!
//! Both stores write a sequence of framed records:
//!
//! ```text
//! [length: u32][crc32: u32][payload]
//! [length: u32][crc32: u32][payload]
//! ...
//! ```
//!
//! A [`ChunkedStore`] file is a concatenation of chunks, each an independent
//! stream (compressed on its own when compression is enabled). A
//! [`PersistentStore`] file is a single stream.

pub mod chunked;
pub mod persistent;
pub mod record;
pub(crate) mod stream;

pub use chunked::{ChunkHandle, ChunkedStore};
pub use persistent::PersistentStore;
pub use stream::RecordIterator;
