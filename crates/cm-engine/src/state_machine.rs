// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow state machine (spec §4.5). Subscribers receive every
//! transition; the runner uses this to tear down listeners at a terminal state.

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Running,
    Awaiting,
    Delegated,
    Paused,
    Final,
    Error,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Final | WorkflowState::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    Start,
    WaitForInput,
    InputReceived,
    EnterAuto,
    ExitAuto,
    Pause,
    Resume,
    Stop,
    Complete,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub event: WorkflowEvent,
}

#[derive(Debug, thiserror::Error)]
#[error("event {event:?} is not valid from state {state:?}")]
pub struct InvalidTransition {
    pub state: WorkflowState,
    pub event: WorkflowEvent,
}

/// The workflow's current state, plus a broadcast channel of transitions.
pub struct WorkflowStateMachine {
    state: WorkflowState,
    /// The state `paused` should return to on `Resume`.
    pre_pause: Option<WorkflowState>,
    transitions: broadcast::Sender<Transition>,
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowStateMachine {
    pub fn new() -> Self {
        let (transitions, _rx) = broadcast::channel(64);
        Self {
            state: WorkflowState::Idle,
            pre_pause: None,
            transitions,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    pub fn apply(&mut self, event: WorkflowEvent) -> Result<WorkflowState, InvalidTransition> {
        let to = self.next_state(event)?;
        let from = self.state;
        self.state = to;
        if matches!(event, WorkflowEvent::Pause) {
            self.pre_pause = Some(from);
        }
        let _ = self.transitions.send(Transition { from, to, event });
        Ok(to)
    }

    fn next_state(&self, event: WorkflowEvent) -> Result<WorkflowState, InvalidTransition> {
        use WorkflowEvent::*;
        use WorkflowState::*;

        if self.state.is_terminal() {
            return Err(InvalidTransition {
                state: self.state,
                event,
            });
        }

        let to = match (self.state, event) {
            (Idle, Start) => Running,
            (Running, WaitForInput) => Awaiting,
            (Awaiting, InputReceived) => Running,
            (Running, EnterAuto) => Delegated,
            (Delegated, ExitAuto) => Running,
            (_, Pause) => Paused,
            (Paused, Resume) => self.pre_pause.unwrap_or(Running),
            (_, Stop) => Final,
            (_, Complete) => Final,
            (_, Fail) => Error,
            _ => {
                return Err(InvalidTransition {
                    state: self.state,
                    event,
                })
            }
        };
        Ok(to)
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
