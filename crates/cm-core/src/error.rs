// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error tags shared by crates that don't own a more specific error type.
//!
//! Concrete component errors (`AdapterError`, `RuntimeError`, `StorageError`)
//! live in their owning crates; this enum covers the taxonomy entries from
//! spec §7 that are recovered locally rather than surfaced to callers, and
//! are therefore shared vocabulary rather than a single crate's concern.

use thiserror::Error;

/// Error tags from spec §7 that are recovered locally (logged, then defaulted)
/// rather than propagated as a hard failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Missing/invalid template, unknown agent id, missing required fields.
    #[error("config error: {0}")]
    Config(String),
    /// Directive file present but malformed. Logged, treated as `continue`.
    #[error("directive parse error: {0}")]
    DirectiveParse(String),
    /// Tracking file unreadable. Logged, treated as a fresh start.
    #[error("index corruption: {0}")]
    IndexCorruption(String),
}
