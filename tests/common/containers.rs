// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Testcontainers setup for Redis.
//!
//! Provides helpers to spin up Redis containers for integration tests.

#![allow(dead_code)]

use testcontainers::{clients::Cli, core::WaitFor, Container, GenericImage};

/// Create a vanilla Redis container.
///
/// Uses official redis:7 image. Waits for "Ready to accept connections".
pub fn redis_container(docker: &Cli) -> Container<'_, GenericImage> {
    let image = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(6379)
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));
    docker.run(image)
}

/// Get the Redis URL for a container.
pub fn redis_url(container: &Container<'_, GenericImage>) -> String {
    let port = container.get_host_port_ipv4(6379);
    format!("redis://127.0.0.1:{}", port)
}

/// Read a raw value straight from Redis, bypassing any store.
pub async fn raw_get(url: &str, key: &str) -> redis::RedisResult<Option<Vec<u8>>> {
    let client = redis::Client::open(url)?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    use redis::AsyncCommands;
    conn.get(key).await
}

/// Write a raw value straight to Redis.
pub async fn raw_set(url: &str, key: &str, value: &[u8]) -> redis::RedisResult<()> {
    let client = redis::Client::open(url)?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    use redis::AsyncCommands;
    conn.set(key, value).await
}

/// Remaining TTL of a key in milliseconds (-1 without expiry, -2 if missing).
pub async fn raw_pttl(url: &str, key: &str) -> redis::RedisResult<i64> {
    let client = redis::Client::open(url)?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    use redis::AsyncCommands;
    conn.pttl(key).await
}
