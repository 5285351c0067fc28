//! Index element types.

use crate::codec::Codec;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A record stored in a fixed-width index, ordered by its key.
pub trait IndexElement: Send + 'static {
    /// Lookup key. Its order must stay the same for the lifetime of an index.
    type Key: Ord + Clone + Debug + Send + 'static;

    /// Extract the key of this element
    fn key(&self) -> Self::Key;
}

/// Maps an entity id to a byte offset in a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdOffsetElement {
    /// Entity id
    pub id: i64,
    /// Offset of the entity's record
    pub offset: u64,
}

impl IdOffsetElement {
    /// Create a new IdOffsetElement
    pub fn new(id: i64, offset: u64) -> Self {
        Self { id, offset }
    }
}

impl IndexElement for IdOffsetElement {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

/// Associates an entity id with the map tile it falls in.
///
/// Keyed by tile, so one key usually has many elements; a range over tile
/// keys yields every id in those tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileIdElement {
    /// Tile number
    pub tile: u32,
    /// Entity id
    pub id: i64,
}

impl TileIdElement {
    /// Create a new TileIdElement
    pub fn new(tile: u32, id: i64) -> Self {
        Self { tile, id }
    }
}

impl IndexElement for TileIdElement {
    type Key = u32;

    fn key(&self) -> u32 {
        self.tile
    }
}

/// Decode exactly one element from `bytes`.
pub(crate) fn decode_element<T>(codec: &dyn Codec<T>, bytes: &[u8]) -> Result<T> {
    let mut input = bytes;
    let element = codec.decode(&mut input)?;
    if !input.is_empty() {
        return Err(Error::corruption(format!(
            "Element slot of {} bytes has {} unread bytes",
            bytes.len(),
            input.len()
        )));
    }
    Ok(element)
}
