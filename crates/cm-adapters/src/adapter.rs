// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `EngineAdapter` contract: run a prompt against an external
//! code-generation engine as a subprocess, streaming its output.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;

/// Default wall-clock budget for a single engine run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Callback invoked with each stdout/stderr chunk as it arrives.
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-run configuration handed to an [`EngineAdapter`].
#[derive(Clone)]
pub struct RunOptions {
    pub working_dir: PathBuf,
    pub model: Option<String>,
    pub resume_session_id: Option<String>,
    pub resume_prompt: Option<String>,
    pub cancel: CancellationToken,
    pub timeout: Duration,
    pub on_stdout: OutputSink,
    pub on_stderr: OutputSink,
}

impl RunOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            model: None,
            resume_session_id: None,
            resume_prompt: None,
            cancel: CancellationToken::new(),
            timeout: DEFAULT_TIMEOUT,
            on_stdout: Arc::new(|_| {}),
            on_stderr: Arc::new(|_| {}),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Resuming a session suppresses a fresh `model` flag; the engine
    /// continues with whatever model the original session used.
    pub fn with_resume(mut self, session_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        self.resume_session_id = Some(session_id.into());
        self.resume_prompt = Some(prompt.into());
        self.model = None;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_stdout_sink(mut self, sink: OutputSink) -> Self {
        self.on_stdout = sink;
        self
    }

    pub fn with_stderr_sink(mut self, sink: OutputSink) -> Self {
        self.on_stderr = sink;
        self
    }

    /// Whether this run is continuing a prior session rather than starting fresh.
    pub fn is_resume(&self) -> bool {
        self.resume_session_id.is_some()
    }
}

/// Outcome of a completed (or aborted) engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRunResult {
    pub exit_code: Option<i32>,
    pub session_id: String,
}

/// Runs a prompt against a code-generation engine as a subprocess.
///
/// Implementations must: invoke `on_stdout`/`on_stderr` in arrival order;
/// return only after the child process has exited or been aborted; kill
/// the child promptly on cancellation or timeout; and suppress a fresh
/// `model` flag whenever `options.resume_session_id` is set.
#[async_trait]
pub trait EngineAdapter: Send + Sync + 'static {
    async fn run(&self, prompt: &str, options: RunOptions) -> Result<EngineRunResult, AdapterError>;
}

/// Authentication and MCP-configuration probe for an engine.
#[async_trait]
pub trait EngineAuthProbe: Send + Sync + 'static {
    async fn is_authenticated(&self) -> bool;
    async fn configure_mcp(&self, workflow_dir: &Path) -> Result<(), AdapterError>;
    async fn cleanup_mcp(&self, workflow_dir: &Path) -> Result<(), AdapterError>;
    async fn is_mcp_configured(&self, workflow_dir: &Path) -> bool;
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
