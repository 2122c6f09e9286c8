// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow signal bus: a broadcast channel the UI and controller
//! providers subscribe to for pause/skip/stop/mode-change/error events (spec §6).

use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowSignal {
    Pause,
    Skip,
    Stop,
    ModeChange { autonomous_mode: bool },
    Error { reason: String },
}

impl WorkflowSignal {
    /// The wire name used by the UI-facing event stream.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowSignal::Pause => "workflow:pause",
            WorkflowSignal::Skip => "workflow:skip",
            WorkflowSignal::Stop => "workflow:stop",
            WorkflowSignal::ModeChange { .. } => "workflow:mode-change",
            WorkflowSignal::Error { .. } => "workflow:error",
        }
    }
}

/// Fan-out channel for workflow signals. Cloning shares the same bus.
#[derive(Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<WorkflowSignal>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        let (sender, _rx) = broadcast::channel(128);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowSignal> {
        self.sender.subscribe()
    }

    /// Publish a signal. Silently drops it if nobody is listening.
    pub fn publish(&self, signal: WorkflowSignal) {
        let _ = self.sender.send(signal);
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
