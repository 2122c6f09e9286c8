// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input providers: the user-keypress-driven and controller-driven
//! implementations of the `InputProvider` interface (spec §4.6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;

use cm_adapters::{EngineAdapter, RunOptions};

/// The sentinel the user UI sends to flip into auto mode without resuming the step.
pub const SWITCH_TO_AUTO: &str = "__SWITCH_TO_AUTO__";
/// The sentinel the user UI sends to flip back to manual input.
pub const SWITCH_TO_MANUAL: &str = "__SWITCH_TO_MANUAL__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    User,
    Controller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSwitchTarget {
    ToAuto,
    ToManual,
}

/// What an `awaitInput` call produced: either the next prompt text, or an
/// instruction to flip mode without resuming the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    Prompt {
        source: InputSource,
        text: String,
        monitoring_id: Option<u64>,
    },
    ModeSwitch(ModeSwitchTarget),
}

/// Context handed to the active provider when awaiting the next input.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub step_index: usize,
    pub agent_id: String,
}

#[async_trait]
pub trait InputProvider: Send + Sync {
    async fn activate(&self);
    async fn deactivate(&self);
    async fn await_input(&self, ctx: &StepContext) -> InputOutcome;
}

/// Reads keypresses forwarded from the controlling terminal's UI layer.
pub struct UserInputProvider {
    active: AtomicBool,
    /// A `tokio::sync::Mutex`, not `parking_lot`: the guard must be held
    /// across `rx.recv().await` below, and a `parking_lot::MutexGuard` is
    /// `!Send`, which would make this `async_trait` future `!Send`.
    rx: AsyncMutex<mpsc::Receiver<String>>,
}

impl UserInputProvider {
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self {
            active: AtomicBool::new(false),
            rx: AsyncMutex::new(rx),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InputProvider for UserInputProvider {
    async fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    async fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    async fn await_input(&self, _ctx: &StepContext) -> InputOutcome {
        let received = self.rx.lock().await.recv().await;
        match received.as_deref() {
            Some(SWITCH_TO_AUTO) => InputOutcome::ModeSwitch(ModeSwitchTarget::ToAuto),
            Some(SWITCH_TO_MANUAL) => InputOutcome::ModeSwitch(ModeSwitchTarget::ToManual),
            Some(text) => InputOutcome::Prompt {
                source: InputSource::User,
                text: text.to_string(),
                monitoring_id: None,
            },
            None => InputOutcome::Prompt {
                source: InputSource::User,
                text: String::new(),
                monitoring_id: None,
            },
        }
    }
}

/// Delegates to a designated controller agent, re-using its running session.
pub struct ControllerInputProvider {
    controller_agent_id: String,
    adapter: Arc<dyn EngineAdapter>,
    session_id: SyncMutex<Option<String>>,
    working_dir: std::path::PathBuf,
}

impl ControllerInputProvider {
    pub fn new(
        controller_agent_id: impl Into<String>,
        adapter: Arc<dyn EngineAdapter>,
        working_dir: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            controller_agent_id: controller_agent_id.into(),
            adapter,
            session_id: SyncMutex::new(None),
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl InputProvider for ControllerInputProvider {
    async fn activate(&self) {}

    async fn deactivate(&self) {
        *self.session_id.lock() = None;
    }

    async fn await_input(&self, ctx: &StepContext) -> InputOutcome {
        let resume = self.session_id.lock().clone();
        let request = format!(
            "controller request: what is the next instruction for step {} (agent {})?",
            ctx.step_index, ctx.agent_id
        );

        let output = Arc::new(SyncMutex::new(String::new()));
        let sink_output = output.clone();
        let on_stdout: cm_adapters::OutputSink = Arc::new(move |chunk| sink_output.lock().push_str(chunk));

        let mut options = RunOptions::new(&self.working_dir).with_stdout_sink(on_stdout);
        if let Some(session_id) = resume {
            options = options.with_resume(session_id, request.clone());
        }

        tracing::debug!(controller = %self.controller_agent_id, step = ctx.step_index, "awaiting controller input");

        match self.adapter.run(&request, options).await {
            Ok(result) => {
                *self.session_id.lock() = Some(result.session_id.clone());
                InputOutcome::Prompt {
                    source: InputSource::Controller,
                    text: Self::extract_instruction(&output.lock()),
                    monitoring_id: None,
                }
            }
            Err(error) => {
                tracing::warn!(controller = %self.controller_agent_id, %error, "controller provider failed, treating as empty advance");
                InputOutcome::Prompt {
                    source: InputSource::Controller,
                    text: String::new(),
                    monitoring_id: None,
                }
            }
        }
    }
}

impl ControllerInputProvider {
    /// The controller's next instruction is its last non-blank line of
    /// output — the controller may reason over several lines before
    /// stating the instruction it wants acted on.
    fn extract_instruction(raw_output: &str) -> String {
        raw_output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .next_back()
            .unwrap_or("")
            .to_string()
    }
}

/// Records activate/deactivate calls and replays queued outcomes, for
/// exercising [`crate::mode::WorkflowMode`] and the mode handlers without a
/// real terminal or controller session.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeInputProvider {
    active: AtomicBool,
    activations: SyncMutex<u32>,
    deactivations: SyncMutex<u32>,
    queued: SyncMutex<std::collections::VecDeque<InputOutcome>>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeInputProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl FakeInputProvider {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            activations: SyncMutex::new(0),
            deactivations: SyncMutex::new(0),
            queued: SyncMutex::new(std::collections::VecDeque::new()),
        }
    }

    pub fn queue(&self, outcome: InputOutcome) {
        self.queued.lock().push_back(outcome);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn activation_count(&self) -> u32 {
        *self.activations.lock()
    }

    pub fn deactivation_count(&self) -> u32 {
        *self.deactivations.lock()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl InputProvider for FakeInputProvider {
    async fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
        *self.activations.lock() += 1;
    }

    async fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        *self.deactivations.lock() += 1;
    }

    async fn await_input(&self, _ctx: &StepContext) -> InputOutcome {
        self.queued.lock().pop_front().unwrap_or(InputOutcome::Prompt {
            source: InputSource::User,
            text: String::new(),
            monitoring_id: None,
        })
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
