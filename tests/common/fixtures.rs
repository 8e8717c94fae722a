//! Record types used across the test suites.

use kv_mirror::{SyncKeys, Syncable};
use serde::{Deserialize, Serialize};

/// Two access paths: by numeric id and by uuid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub uuid: String,
    pub name: String,
}

impl User {
    pub fn new(id: u64, uuid: &str) -> Self {
        Self {
            id,
            uuid: uuid.to_string(),
            name: format!("user-{}", id),
        }
    }
}

impl Syncable for User {
    fn sync_keys(&self) -> SyncKeys {
        SyncKeys::from([
            ("id".to_string(), format!("User:id:{}", self.id)),
            ("uuid".to_string(), format!("User:uuid:{}", self.uuid)),
        ])
    }
}

/// Single access path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub total_cents: i64,
}

impl Syncable for Order {
    fn sync_keys(&self) -> SyncKeys {
        SyncKeys::from([("id".to_string(), format!("Order:id:{}", self.id))])
    }
}

/// A record with a configurable number of keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wide {
    pub id: u64,
    pub keys: u8,
}

impl Syncable for Wide {
    fn sync_keys(&self) -> SyncKeys {
        (0..self.keys)
            .map(|k| (format!("k{}", k), format!("Wide:{}:{}", k, self.id)))
            .collect()
    }
}

/// Not registered with any engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Unregistered {
    pub id: u64,
}

impl Syncable for Unregistered {
    fn sync_keys(&self) -> SyncKeys {
        SyncKeys::from([("id".to_string(), format!("Unregistered:{}", self.id))])
    }
}
