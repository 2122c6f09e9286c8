// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Testable wall-clock abstraction.
//!
//! The auth cache TTL (§4.2), the tracking file's `lastUpdated` stamp (§4.4),
//! and adapter timeouts (§4.1) all need a clock that can be frozen in tests.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time, abstracted for deterministic tests.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current time as milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;
}

/// Real wall-clock time.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Fake clock for tests: starts at a fixed instant and only advances when told to.
#[derive(Clone, Default)]
pub struct FakeClock {
    now_ms: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(Mutex::new(start_ms)),
        }
    }

    pub fn advance_ms(&self, delta: u64) {
        *self.now_ms.lock() += delta;
    }

    pub fn set_ms(&self, ms: u64) {
        *self.now_ms.lock() = ms;
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        *self.now_ms.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
