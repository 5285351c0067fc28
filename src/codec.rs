//! Serialization strategies for stored records.
//!
//! Stores and sorters are generic over the record type and take a [`Codec`]
//! to turn records into bytes and back. [`BincodeCodec`] covers any serde
//! type; its fixed-int encoding gives every value of a struct made of
//! primitive fields the same width, as fixed-width indexes require.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Serializer/deserializer pair for records of type `T`.
pub trait Codec<T>: Send + Sync {
    /// Append the encoded form of `value` to `buf`.
    fn encode(&self, value: &T, buf: &mut Vec<u8>) -> Result<()>;

    /// Decode one value from the front of `input`, advancing it past the
    /// consumed bytes.
    fn decode(&self, input: &mut &[u8]) -> Result<T>;
}

/// Codec backed by bincode's default (fixed-int, little endian) encoding.
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    /// Create a new codec
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BincodeCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BincodeCodec")
    }
}

impl<T: Serialize + DeserializeOwned> Codec<T> for BincodeCodec<T> {
    fn encode(&self, value: &T, buf: &mut Vec<u8>) -> Result<()> {
        bincode::serialize_into(buf, value)?;
        Ok(())
    }

    fn decode(&self, input: &mut &[u8]) -> Result<T> {
        Ok(bincode::deserialize_from(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Node {
        id: i64,
        lat: i32,
        lon: i32,
    }

    #[test]
    fn test_decode_advances_input() {
        let codec = BincodeCodec::<Node>::new();
        let mut buf = Vec::new();
        codec.encode(&Node { id: 1, lat: 2, lon: 3 }, &mut buf).unwrap();
        codec.encode(&Node { id: -4, lat: 5, lon: 6 }, &mut buf).unwrap();
        assert_eq!(buf.len(), 32);

        let mut input = buf.as_slice();
        assert_eq!(codec.decode(&mut input).unwrap(), Node { id: 1, lat: 2, lon: 3 });
        assert_eq!(input.len(), 16);
        assert_eq!(codec.decode(&mut input).unwrap(), Node { id: -4, lat: 5, lon: 6 });
        assert!(input.is_empty());
    }

    #[test]
    fn test_decode_truncated() {
        let codec = BincodeCodec::<Node>::new();
        let mut buf = Vec::new();
        codec.encode(&Node { id: 1, lat: 2, lon: 3 }, &mut buf).unwrap();

        let mut input = &buf[..10];
        assert!(codec.decode(&mut input).is_err());
    }
}
