// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by engine adapters, the auth cache, and engine selection.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("no engines registered")]
    NoEnginesRegistered,
    #[error("engine {0:?} is not registered")]
    UnknownEngine(String),
    #[error("engine {0:?} spawn failed: {1}")]
    SpawnFailed(String, std::io::Error),
    #[error("engine {0:?} timed out after {1:?}")]
    TimedOut(String, std::time::Duration),
    #[error("engine {0:?} was cancelled")]
    Cancelled(String),
    #[error("engine {0:?} auth probe failed: {1}")]
    AuthProbeFailed(String, String),
}
