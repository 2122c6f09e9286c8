// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Runner-level failures. Variants map to the error codes the UI surfaces
/// in its `workflow:error` event (spec §4.11, §7).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[CM-E101] {0}")]
    StartupFailure(String),
    #[error("[CM-E100] {0}")]
    RuntimeFailure(String),
    #[error("unknown agent id {0:?} in trigger directive")]
    UnknownTriggerTarget(String),
    #[error(transparent)]
    Runbook(#[from] cm_runbook::RunbookError),
    #[error(transparent)]
    Storage(#[from] cm_storage::StorageError),
    #[error(transparent)]
    Adapter(#[from] cm_adapters::AdapterError),
}

impl RuntimeError {
    /// The short error code the UI's error modal displays.
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::StartupFailure(_) => "CM-E101",
            _ => "CM-E100",
        }
    }
}

/// Process exit code for a finished workflow run (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);

    pub fn from_result<T>(result: &Result<T, RuntimeError>) -> Self {
        match result {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
