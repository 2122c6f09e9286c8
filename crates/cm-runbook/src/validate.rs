// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger-target validation, run at template construction time and reusable
//! against runtime `triggerAgentId`s supplied by directives.

use std::collections::HashSet;

use cm_core::StepBehavior;
use thiserror::Error;

use crate::step::Step;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunbookError {
    #[error("trigger behavior references unknown agent id {0:?}")]
    UnknownAgent(String),
}

/// Validate every statically declared trigger target against the step set.
///
/// A `Trigger` behavior with no `trigger_agent_id` defers its target to the
/// directive at runtime and is not checked here; callers should run
/// [`validate_agent_id`] against that id once the directive is read.
pub(crate) fn validate_steps(steps: &[Step]) -> Result<(), RunbookError> {
    let agent_ids: HashSet<&str> = steps
        .iter()
        .filter_map(Step::as_module)
        .map(|m| m.agent_id.as_str())
        .collect();

    for step in steps {
        let Some(module) = step.as_module() else {
            continue;
        };
        let Some(module_ref) = &module.module else {
            continue;
        };
        if let Some(StepBehavior::Trigger {
            trigger_agent_id: Some(target),
            ..
        }) = &module_ref.behavior
        {
            validate_agent_id(&agent_ids, target)?;
        }
    }
    Ok(())
}

/// Validate a runtime `triggerAgentId` against the template's registered agent ids.
pub fn validate_agent_id(agent_ids: &HashSet<&str>, candidate: &str) -> Result<(), RunbookError> {
    if agent_ids.contains(candidate) {
        Ok(())
    } else {
        Err(RunbookError::UnknownAgent(candidate.to_string()))
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
