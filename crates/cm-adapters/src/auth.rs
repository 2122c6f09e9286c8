// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL-backed cache of engine authentication state, with in-flight probe
//! serialization so concurrent callers for the same engine don't double-probe.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use cm_core::{Clock, SystemClock};

const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

#[derive(Clone, Copy)]
struct CacheEntry {
    authenticated: bool,
    checked_at_ms: u64,
}

/// Caches `is_authenticated` results per engine id behind a TTL.
///
/// Generic over [`Clock`] so the TTL can be driven deterministically in
/// tests via `FakeClock` instead of real wall-clock time.
pub struct AuthCache<C: Clock = SystemClock> {
    ttl_ms: u64,
    clock: C,
    entries: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Default for AuthCache<SystemClock> {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TTL_MS))
    }
}

impl AuthCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> AuthCache<C> {
    /// Build a cache driven by an injected [`Clock`] instead of real time.
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl_ms: ttl.as_millis() as u64,
            clock,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn fresh_entry(&self, engine_id: &str) -> Option<bool> {
        let now_ms = self.clock.epoch_ms();
        let entries = self.entries.lock();
        entries.get(engine_id).and_then(|entry| {
            if now_ms.saturating_sub(entry.checked_at_ms) < self.ttl_ms {
                Some(entry.authenticated)
            } else {
                None
            }
        })
    }

    fn engine_lock(&self, engine_id: &str) -> Arc<AsyncMutex<()>> {
        self.in_flight
            .lock()
            .entry(engine_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Return the cached authentication state for `engine_id`, probing via
    /// `probe` only on a cache miss. Concurrent callers for the same engine
    /// id share a single in-flight probe.
    pub async fn is_authenticated<F, Fut>(&self, engine_id: &str, probe: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        if let Some(cached) = self.fresh_entry(engine_id) {
            return cached;
        }

        let lock = self.engine_lock(engine_id);
        let _guard = lock.lock().await;

        // Another caller may have populated the cache while we waited on the lock.
        if let Some(cached) = self.fresh_entry(engine_id) {
            return cached;
        }

        let authenticated = probe().await;
        self.entries.lock().insert(
            engine_id.to_string(),
            CacheEntry {
                authenticated,
                checked_at_ms: self.clock.epoch_ms(),
            },
        );
        authenticated
    }

    pub fn invalidate(&self, engine_id: &str) {
        self.entries.lock().remove(engine_id);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
