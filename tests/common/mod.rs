//! Shared test utilities for engine, chaos and integration tests.
//!
//! This module provides:
//! - Redis testcontainer setup
//! - A recording [`KvStore`](kv_mirror::KvStore) mock with injectable failures
//! - Record fixtures
//!
//! Suites import from the submodules directly so each binary only names
//! what it uses.

#![allow(dead_code)]

pub mod containers;
pub mod fixtures;
pub mod mock_store;
