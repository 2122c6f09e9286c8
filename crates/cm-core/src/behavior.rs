// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-module step behavior: the tagged variant a step's `module` block may carry.

use serde::{Deserialize, Serialize};

/// Behavior attached to a module step, gating which directive evaluators apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepBehavior {
    Loop {
        action: LoopAction,
        steps: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_iterations: Option<u32>,
    },
    Trigger {
        action: TriggerAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger_agent_id: Option<String>,
    },
}

/// Discriminant for `loop`-typed behaviors; currently only `stepBack` is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopAction {
    StepBack,
}

/// Discriminant for `trigger`-typed behaviors; currently only `mainAgentCall` is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerAction {
    MainAgentCall,
}

impl StepBehavior {
    pub fn step_back(steps: u32, max_iterations: Option<u32>) -> Self {
        StepBehavior::Loop {
            action: LoopAction::StepBack,
            steps,
            max_iterations,
        }
    }

    pub fn main_agent_call(trigger_agent_id: Option<String>) -> Self {
        StepBehavior::Trigger {
            action: TriggerAction::MainAgentCall,
            trigger_agent_id,
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, StepBehavior::Loop { .. })
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, StepBehavior::Trigger { .. })
    }
}

#[cfg(test)]
#[path = "behavior_tests.rs"]
mod tests;
