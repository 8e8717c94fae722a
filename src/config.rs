// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the mirror engine and the Redis store.
//!
//! Both structs can be constructed programmatically or deserialized from
//! YAML/JSON. Durations are human-readable strings (`"30s"`, `"5m"`).
//!
//! # Configuration Structure
//!
//! ```text
//! MirrorConfig
//! ├── workers: usize               # Worker task count (min 1)
//! └── queue_capacity: Option<usize> # Task queue bound (default = workers)
//!
//! RedisStoreConfig
//! ├── url: String                  # Single-node URL
//! ├── cluster_nodes: Vec<String>   # Cluster seed nodes
//! ├── prefix: String               # Prepended to every physical key
//! └── expiration: String           # "0s" = never expire
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! engine:
//!   workers: 4
//!
//! redis:
//!   cluster_nodes: ["redis://10.0.0.1:7000", "redis://10.0.0.2:7000"]
//!   prefix: "users:"
//!   expiration: "1h"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// MirrorConfig: worker pool sizing
// ═══════════════════════════════════════════════════════════════════════════════

/// Worker pool configuration for [`MirrorEngine`](crate::MirrorEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Number of worker tasks performing store writes.
    /// Values below 1 are raised to 1.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the task queue. Enqueue waits when the queue is full.
    /// Defaults to the worker count.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

fn default_workers() -> usize {
    1
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            queue_capacity: None,
        }
    }
}

impl MirrorConfig {
    /// Config with the given worker count.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    /// Worker count actually spawned.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Task queue capacity actually used.
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or(self.workers)
            .max(1)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RedisStoreConfig: networked store settings
// ═══════════════════════════════════════════════════════════════════════════════

/// Connection and keying settings for [`RedisStore`](crate::store::RedisStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis URL for single-node deployments.
    /// Example: `"redis://cache.example.com:6379"`
    #[serde(default = "default_url")]
    pub url: String,

    /// Seed nodes for cluster deployments. Used by `connect_cluster`.
    #[serde(default)]
    pub cluster_nodes: Vec<String>,

    /// Prefix prepended to every physical key.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Time-to-live for written values as a duration string.
    /// `"0s"` disables expiration.
    #[serde(default = "default_expiration")]
    pub expiration: String,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_prefix() -> String {
    "kvmirror:".to_string()
}

fn default_expiration() -> String {
    "0s".to_string()
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            cluster_nodes: Vec::new(),
            prefix: default_prefix(),
            expiration: default_expiration(),
        }
    }
}

impl RedisStoreConfig {
    /// Create a single-node config for testing.
    pub fn for_testing(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Parse the expiration string.
    ///
    /// Returns `None` for zero or unparseable values (no expiration).
    pub fn expiration_duration(&self) -> Option<Duration> {
        humantime::parse_duration(&self.expiration)
            .ok()
            .filter(|d| !d.is_zero())
    }

    /// Seed nodes for a cluster connection, falling back to `url`.
    pub fn cluster_seeds(&self) -> Vec<String> {
        if self.cluster_nodes.is_empty() {
            vec![self.url.clone()]
        } else {
            self.cluster_nodes.clone()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
