// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable adapter for deterministic engine-run testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::adapter::{EngineAdapter, EngineRunResult, RunOptions};
use crate::error::AdapterError;

/// Recorded call to [`FakeEngineAdapter`].
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub prompt: String,
    pub model: Option<String>,
    pub resume_session_id: Option<String>,
}

struct FakeState {
    queued_results: VecDeque<Result<EngineRunResult, AdapterError>>,
    stdout_chunks: VecDeque<String>,
    calls: Vec<EngineCall>,
}

/// Fake engine adapter: returns queued results and replays canned stdout
/// chunks through `options.on_stdout` before returning.
#[derive(Clone)]
pub struct FakeEngineAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeEngineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngineAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                queued_results: VecDeque::new(),
                stdout_chunks: VecDeque::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Queue the result returned by the next `run()` call.
    pub fn queue_result(&self, result: Result<EngineRunResult, AdapterError>) {
        self.inner.lock().queued_results.push_back(result);
    }

    /// Queue a successful result with the given session id.
    pub fn queue_success(&self, session_id: impl Into<String>) {
        self.queue_result(Ok(EngineRunResult {
            exit_code: Some(0),
            session_id: session_id.into(),
        }));
    }

    /// Queue a stdout chunk replayed on the next `run()` call, in order.
    pub fn queue_stdout(&self, chunk: impl Into<String>) {
        self.inner.lock().stdout_chunks.push_back(chunk.into());
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }
}

#[async_trait]
impl EngineAdapter for FakeEngineAdapter {
    async fn run(&self, prompt: &str, options: RunOptions) -> Result<EngineRunResult, AdapterError> {
        let (chunks, result) = {
            let mut inner = self.inner.lock();
            inner.calls.push(EngineCall {
                prompt: prompt.to_string(),
                model: options.model.clone(),
                resume_session_id: options.resume_session_id.clone(),
            });
            let chunks: Vec<String> = inner.stdout_chunks.drain(..).collect();
            let result = inner.queued_results.pop_front().unwrap_or(Ok(EngineRunResult {
                exit_code: Some(0),
                session_id: options.resume_session_id.clone().unwrap_or_default(),
            }));
            (chunks, result)
        };

        for chunk in chunks {
            (options.on_stdout)(&chunk);
        }

        result
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
