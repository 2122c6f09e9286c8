// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent-issued directive, and its on-disk JSON shape.
//!
//! Agents write `<cwd>/.codemachine/memory/directive.json` to influence the
//! orchestrator. A missing file is equivalent to `{"action": "continue"}`.

use serde::{Deserialize, Serialize};

/// The full vocabulary of actions an agent may write to the directive file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveAction {
    /// Explicit no-op; also the value written to clear the store.
    Continue,
    /// Combined with a `loop` step behavior, rewind `steps` indices.
    Loop,
    /// End the workflow cleanly.
    Stop,
    /// End the workflow with a reported failure reason.
    Error,
    /// Pause and surface the reason for manual review; resumable.
    Checkpoint,
    /// Agent-initiated pause (distinct from a user keypress pause).
    Pause,
    /// Execute a specific other agent by id before advancing.
    Trigger,
}

impl DirectiveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveAction::Continue => "continue",
            DirectiveAction::Loop => "loop",
            DirectiveAction::Stop => "stop",
            DirectiveAction::Error => "error",
            DirectiveAction::Checkpoint => "checkpoint",
            DirectiveAction::Pause => "pause",
            DirectiveAction::Trigger => "trigger",
        }
    }
}

/// The directive file's parsed contents.
///
/// Field names on the wire are camelCase (`triggerAgentId`) to match the
/// directive file format agents write, per spec §6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub action: DirectiveAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "triggerAgentId"
    )]
    pub trigger_agent_id: Option<String>,
}

impl Directive {
    /// The value a missing directive file, or a user "advance" keypress, resets to.
    pub fn continue_() -> Self {
        Self {
            action: DirectiveAction::Continue,
            reason: None,
            trigger_agent_id: None,
        }
    }

    pub fn is_continue(&self) -> bool {
        self.action == DirectiveAction::Continue
    }
}

impl Default for Directive {
    fn default() -> Self {
        Self::continue_()
    }
}

#[cfg(test)]
#[path = "directive_tests.rs"]
mod tests;
