//! # KV Mirror
//!
//! Replicates in-process records into a key-value cache under several
//! lookup keys at once, and reads them back by any of those keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                              MirrorEngine                                 │
//! │                                                                           │
//! │  ┌──────────────┐    ┌───────────────┐    ┌────────────────────────────┐  │
//! │  │ enqueue /    │───►│ bounded queue │───►│ workers (N) → store.put    │  │
//! │  │ mutation hook│    │ (task per key)│    └────────────────────────────┘  │
//! │  └──────────────┘    └───────────────┘                 │                  │
//! │         │                                              ▼                  │
//! │         ▼                                 ┌────────────────────────────┐  │
//! │  ┌──────────────┐                         │ dispatcher → observer      │  │
//! │  │ Registry     │                         │ (one report per write)     │  │
//! │  │ (TypeId)     │                         └────────────────────────────┘  │
//! │  └──────────────┘                                                         │
//! │                                                                           │
//! │  sync(record) ──► store.put per key (caller's task)                       │
//! │  fetch(dest, key_name) ──► store.fetch(dest.sync_keys()[key_name])        │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stores
//!
//! - [`InMemoryStore`]: process-local map, keeps values as typed objects
//! - [`RedisStore`]: Redis or Redis Cluster, values marshaled with a
//!   [`Marshaler`](store::Marshaler) (MessagePack by default)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kv_mirror::{cancellation, InMemoryStore, MirrorEngine, MirrorOptions, Syncable, SyncKeys};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct User {
//!     id: u64,
//!     uuid: String,
//! }
//!
//! impl Syncable for User {
//!     fn sync_keys(&self) -> SyncKeys {
//!         SyncKeys::from([
//!             ("id".to_string(), format!("user:{}", self.id)),
//!             ("uuid".to_string(), format!("user:{}", self.uuid)),
//!         ])
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> kv_mirror::Result<()> {
//!     let (cancel_tx, cancel_rx) = cancellation();
//!     let options = MirrorOptions::new(Arc::new(InMemoryStore::new()))
//!         .workers(4)
//!         .observer(|report| println!("{} -> {:?}", report.key, report.error));
//!
//!     let engine = MirrorEngine::start(options, cancel_rx)?;
//!     engine.enqueue(&User { id: 1, uuid: "abc".into() }).await?;
//!
//!     let mut user = User { id: 1, ..Default::default() };
//!     engine.fetch(&mut user, "id").await?;
//!
//!     cancel_tx.send(true).ok();
//!     engine.stopped().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod model;
pub mod resolve;
pub mod store;

mod registry;

// Re-exports for convenience
pub use config::{MirrorConfig, RedisStoreConfig};
pub use engine::{cancellation, MirrorEngine, MirrorOptions};
pub use error::{MirrorError, Result, StoreError, StoreResult};
pub use model::{Observer, Report, SyncKeys, Syncable};
pub use registry::FetchFuture;
pub use store::{InMemoryStore, KvStore, RedisStore};
