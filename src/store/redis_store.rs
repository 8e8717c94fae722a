// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Redis-backed store.
//!
//! Values are encoded with a [`Marshaler`] and written with `SET`, optionally
//! with a `PX` expiration. Every physical key is prefixed.
//!
//! The store is generic over the connection so the same code serves a
//! single node ([`ConnectionManager`]) and a cluster
//! ([`ClusterConnection`]). Both are multiplexed and cheap to clone, so each
//! operation clones the handle instead of locking a shared connection.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), kv_mirror::StoreError> {
//! use kv_mirror::config::RedisStoreConfig;
//! use kv_mirror::store::{JsonMarshaler, RedisStore};
//!
//! let config = RedisStoreConfig::for_testing("redis://localhost:6379");
//! let store = RedisStore::connect(&config).await?.with_marshaler(JsonMarshaler);
//! assert_eq!(store.prefixed_key("user:id:1"), "kvmirror:user:id:1");
//! # Ok(())
//! # }
//! ```

use super::marshal::{Marshaler, MsgPackMarshaler};
use super::{BoxFuture, KvStore};
use crate::config::RedisStoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::Syncable;
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use std::time::Duration;
use tracing::{debug, info};

/// A [`KvStore`] backed by Redis.
pub struct RedisStore<M = MsgPackMarshaler, C = ConnectionManager> {
    conn: C,
    prefix: String,
    expiration: Option<Duration>,
    marshaler: M,
}

impl RedisStore<MsgPackMarshaler, ConnectionManager> {
    /// Connect to a single Redis node at `config.url`.
    pub async fn connect(config: &RedisStoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::redis("open", e))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::redis("connect", e))?;

        info!(url = %config.url, prefix = %config.prefix, "Connected Redis store");
        Ok(Self::new(conn, config))
    }
}

impl RedisStore<MsgPackMarshaler, ClusterConnection> {
    /// Connect to a Redis cluster through its seed nodes.
    pub async fn connect_cluster(config: &RedisStoreConfig) -> StoreResult<Self> {
        let seeds = config.cluster_seeds();
        let client =
            ClusterClient::new(seeds.clone()).map_err(|e| StoreError::redis("open", e))?;
        let conn = client
            .get_async_connection()
            .await
            .map_err(|e| StoreError::redis("connect", e))?;

        info!(seeds = ?seeds, prefix = %config.prefix, "Connected Redis cluster store");
        Ok(Self::new(conn, config))
    }
}

impl<C> RedisStore<MsgPackMarshaler, C> {
    /// Wrap an existing connection.
    pub fn new(conn: C, config: &RedisStoreConfig) -> Self {
        Self {
            conn,
            prefix: config.prefix.clone(),
            expiration: config.expiration_duration(),
            marshaler: MsgPackMarshaler,
        }
    }
}

impl<M, C> RedisStore<M, C> {
    /// Replace the marshaling strategy.
    pub fn with_marshaler<M2: Marshaler>(self, marshaler: M2) -> RedisStore<M2, C> {
        RedisStore {
            conn: self.conn,
            prefix: self.prefix,
            expiration: self.expiration,
            marshaler,
        }
    }

    /// Key prefix applied to every physical key.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Expiration applied to every write.
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }

    /// The key actually used in Redis.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl<M, C> KvStore for RedisStore<M, C>
where
    M: Marshaler,
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    fn put<'a, R: Syncable>(&'a self, key: &'a str, value: &'a R) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let bytes = self.marshaler.marshal(value)?;
            let full_key = self.prefixed_key(key);

            let mut cmd = redis::cmd("SET");
            cmd.arg(&full_key).arg(bytes);
            if let Some(ttl) = self.expiration {
                cmd.arg("PX").arg(ttl.as_millis() as u64);
            }

            let mut conn = self.conn.clone();
            cmd.query_async::<_, ()>(&mut conn)
                .await
                .map_err(|e| StoreError::redis("SET", e))?;

            debug!(key = %full_key, marshaler = self.marshaler.name(), "SET");
            Ok(())
        })
    }

    fn fetch<'a, R: Syncable>(&'a self, key: &'a str, dest: &'a mut R) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let full_key = self.prefixed_key(key);

            let mut conn = self.conn.clone();
            let raw: Option<Vec<u8>> = redis::cmd("GET")
                .arg(&full_key)
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::redis("GET", e))?;

            let bytes = raw.ok_or_else(|| StoreError::not_found(key))?;
            *dest = self.marshaler.unmarshal(&bytes)?;
            Ok(())
        })
    }
}
