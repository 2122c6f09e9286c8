// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single step's execution state: its prompt queue, cancellation token,
//! and a bounded tail of subprocess output kept for escalation context
//! (spec §4.8 data flow, §5).

use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;

/// How many trailing output lines a session keeps for escalation context.
const OUTPUT_TAIL_CAPACITY: usize = 50;

pub struct StepSession {
    prompts: VecDeque<String>,
    cancel: CancellationToken,
    output_tail: VecDeque<String>,
    engine_session_id: Option<String>,
}

impl StepSession {
    pub fn new(prompts: Vec<String>) -> Self {
        Self {
            prompts: prompts.into(),
            cancel: CancellationToken::new(),
            output_tail: VecDeque::with_capacity(OUTPUT_TAIL_CAPACITY),
            engine_session_id: None,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the in-flight adapter call, if any, without failing the step.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Pop the next queued prompt, for chained-prompt (autonomous) iteration.
    pub fn next_prompt(&mut self) -> Option<String> {
        self.prompts.pop_front()
    }

    pub fn has_more_prompts(&self) -> bool {
        !self.prompts.is_empty()
    }

    pub fn remaining_prompts(&self) -> usize {
        self.prompts.len()
    }

    pub fn engine_session_id(&self) -> Option<&str> {
        self.engine_session_id.as_deref()
    }

    pub fn set_engine_session_id(&mut self, session_id: impl Into<String>) {
        self.engine_session_id = Some(session_id.into());
    }

    /// Record a chunk of subprocess output, trimming the oldest line once
    /// the tail capacity is exceeded.
    pub fn record_output(&mut self, chunk: &str) {
        for line in chunk.lines() {
            if self.output_tail.len() == OUTPUT_TAIL_CAPACITY {
                self.output_tail.pop_front();
            }
            self.output_tail.push_back(line.to_string());
        }
    }

    /// The accumulated output tail, oldest first.
    pub fn output_tail(&self) -> Vec<String> {
        self.output_tail.iter().cloned().collect()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
