// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the mirror engine and its stores.
//!
//! Errors are split by layer: [`StoreError`] is what a [`KvStore`](crate::store::KvStore)
//! backend returns, [`MirrorError`] is what the engine's public operations return.
//! Store errors are never swallowed or retried by the engine; they surface
//! unchanged inside [`MirrorError::Store`] (sync/fetch) or inside a
//! [`Report`](crate::model::Report) (async path).
//!
//! # Error Categories
//!
//! | Error Type | Path | Description |
//! |------------|------|-------------|
//! | `NotSyncable` | sync | Value has no key-producing capability |
//! | `InvalidDestination` | fetch | Destination type is not a registered record |
//! | `Store` | sync / fetch | Backend failure, passed through |
//! | `Shutdown` | enqueue | Engine cancelled before the fan-out was queued |
//! | `Config` | start | Engine could not be constructed |

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors returned by the engine's public operations.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// The value does not implement the key-producing contract.
    ///
    /// Only returned by the synchronous path; the asynchronous path drops
    /// such values silently.
    #[error("Model is not syncable: {type_name}")]
    NotSyncable { type_name: String },

    /// Fetch was called with a destination that cannot receive a record.
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// A store backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The engine was cancelled while the operation was waiting.
    #[error("Shutdown in progress")]
    Shutdown,

    /// The engine could not be constructed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MirrorError {
    /// Create a not-syncable error for a type name.
    pub fn not_syncable(type_name: impl Into<String>) -> Self {
        Self::NotSyncable {
            type_name: type_name.into(),
        }
    }

    /// Check if this is a store "key not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound { .. }))
    }
}

/// Errors returned by [`KvStore`](crate::store::KvStore) backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No value is stored under the key.
    #[error("Key not found: {key}")]
    NotFound { key: String },

    /// The stored value's type differs from the destination's type.
    #[error("Type mismatch for key {key}: stored {stored}, destination {destination}")]
    TypeMismatch {
        key: String,
        stored: String,
        destination: String,
    },

    /// Encoding or decoding through a marshaling strategy failed.
    #[error("Marshal error ({operation}): {message}")]
    Marshal {
        operation: &'static str,
        message: String,
    },

    /// Redis connection or command error.
    #[error("Redis error ({operation}): {message}")]
    Redis {
        operation: String,
        message: String,
        #[source]
        source: Option<redis::RedisError>,
    },

    /// Any other backend failure (custom stores).
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a Redis error from a redis::RedisError
    pub fn redis(operation: impl Into<String>, source: redis::RedisError) -> Self {
        Self::Redis {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a Redis error without source
    pub fn redis_msg(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Redis {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a marshal error.
    pub fn marshal(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Marshal {
            operation,
            message: err.to_string(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::Marshal { .. } => "marshal",
            Self::Redis { .. } => "redis",
            Self::Backend(_) => "backend",
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        Self::redis("unknown", e)
    }
}
