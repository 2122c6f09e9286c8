// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status vocabularies emitted on the control plane for the (out-of-scope) UI.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-agent status reported over the control plane (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Running,
    Completed,
    Skipped,
    Failed,
    Retrying,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Pending => write!(f, "pending"),
            AgentStatus::Running => write!(f, "running"),
            AgentStatus::Completed => write!(f, "completed"),
            AgentStatus::Skipped => write!(f, "skipped"),
            AgentStatus::Failed => write!(f, "failed"),
            AgentStatus::Retrying => write!(f, "retrying"),
        }
    }
}

/// Workflow-level status reported over the control plane (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Idle,
    Running,
    Paused,
    Error,
    Completed,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Idle => write!(f, "idle"),
            WorkflowStatus::Running => write!(f, "running"),
            WorkflowStatus::Paused => write!(f, "paused"),
            WorkflowStatus::Error => write!(f, "error"),
            WorkflowStatus::Completed => write!(f, "completed"),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
