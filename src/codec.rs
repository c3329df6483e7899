//! Value codecs
//!
//! A [`Codec`] turns application values into the bytes stored in a box and
//! back. It also knows how to splice N independently encoded values into one
//! encoded collection, which is how a whole namespace is decoded in one go
//! without materializing an intermediate generic value.

use crate::error::{NestboxError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

const JSON_ARRAY_START: u8 = b'[';
const JSON_ARRAY_END: u8 = b']';
const JSON_ARRAY_SEPARATOR: u8 = b',';

/// Pluggable value encoding used by the `*_encoded` / `*_decoded` box operations
pub trait Codec: Clone + Send + Sync {
    /// Encode a single value
    fn marshal<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized;

    /// Decode bytes produced by [`Codec::marshal`] (or [`Codec::join`])
    fn unmarshal<T>(&self, data: &[u8]) -> Result<T>
    where
        T: DeserializeOwned;

    /// Combine independently marshaled elements into one encoded collection
    ///
    /// The result must unmarshal into a collection holding the elements in
    /// order. An empty input yields an empty collection, never an error.
    fn join(&self, items: Vec<Vec<u8>>) -> Vec<u8>;
}

/// JSON codec backed by `serde_json`
///
/// Collections are JSON arrays, so `join` wraps the elements in `[` `]` and
/// separates them with `,`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        JsonCodec
    }
}

impl Codec for JsonCodec {
    fn marshal<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_vec(value).map_err(NestboxError::codec)
    }

    fn unmarshal<T>(&self, data: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(data).map_err(NestboxError::codec)
    }

    fn join(&self, items: Vec<Vec<u8>>) -> Vec<u8> {
        let payload: usize = items.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(payload + items.len() + 2);

        out.push(JSON_ARRAY_START);
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(JSON_ARRAY_SEPARATOR);
            }
            out.extend_from_slice(item);
        }
        out.push(JSON_ARRAY_END);

        out
    }
}

/// Binary codec backed by `bincode` (default fixed-int, little-endian options)
///
/// bincode encodes a sequence as a `u64` length followed by its elements, so
/// `join` prefixes the element count and concatenates the element bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl BincodeCodec {
    pub fn new() -> Self {
        BincodeCodec
    }
}

impl Codec for BincodeCodec {
    fn marshal<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        bincode::serialize(value).map_err(NestboxError::codec)
    }

    fn unmarshal<T>(&self, data: &[u8]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        bincode::deserialize(data).map_err(NestboxError::codec)
    }

    fn join(&self, items: Vec<Vec<u8>>) -> Vec<u8> {
        let payload: usize = items.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(payload + 8);

        out.extend_from_slice(&(items.len() as u64).to_le_bytes());
        for item in &items {
            out.extend_from_slice(item);
        }

        out
    }
}
