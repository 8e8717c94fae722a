// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Marshaling strategies for byte-oriented backends.

use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Converts records to and from bytes.
///
/// Only [`RedisStore`](super::RedisStore) uses a marshaler; the engine itself
/// never encodes anything.
pub trait Marshaler: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Encode a value.
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<Vec<u8>>;

    /// Decode a value.
    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> StoreResult<T>;
}

/// MessagePack with named fields (the default).
///
/// Field names are written, so adding or reordering fields on the record type
/// does not silently shift values between fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackMarshaler;

impl Marshaler for MsgPackMarshaler {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<Vec<u8>> {
        rmp_serde::to_vec_named(value).map_err(|e| StoreError::marshal("encode", e))
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> StoreResult<T> {
        rmp_serde::from_slice(bytes).map_err(|e| StoreError::marshal("decode", e))
    }
}

/// JSON, for stores that are also read by other tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMarshaler;

impl Marshaler for JsonMarshaler {
    fn name(&self) -> &'static str {
        "json"
    }

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| StoreError::marshal("encode", e))
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> StoreResult<T> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::marshal("decode", e))
    }
}
