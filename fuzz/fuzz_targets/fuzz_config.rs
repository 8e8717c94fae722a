//! Fuzz target for configuration parsing.
//!
//! Arbitrary JSON must either fail to parse or yield a config whose derived
//! values are sane.

#![no_main]

use kv_mirror::{MirrorConfig, RedisStoreConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<MirrorConfig>(data) {
        assert!(config.effective_workers() >= 1);
        assert!(config.effective_queue_capacity() >= 1);
    }

    if let Ok(config) = serde_json::from_slice::<RedisStoreConfig>(data) {
        if let Some(ttl) = config.expiration_duration() {
            assert!(!ttl.is_zero());
        }
        assert!(!config.cluster_seeds().is_empty());
    }
});
