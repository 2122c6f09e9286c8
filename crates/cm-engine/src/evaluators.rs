// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directive evaluators and the fixed priority chain that turns a step's
//! behavior plus the directive file's contents into a single `Decision`
//! (spec §4.10).

use std::collections::HashSet;

use cm_core::{Directive, DirectiveAction, StepBehavior};

use crate::error::RuntimeError;

/// The winning action for the runner to act on after a step finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Loop { steps_back: u32 },
    Trigger { target_agent_id: String },
    Checkpoint { reason: Option<String> },
    Error { reason: Option<String> },
    Pause { reason: Option<String> },
    Stop,
    Continue,
}

/// How many times the active loop behavior has already repeated this step.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopState {
    pub iterations_so_far: u32,
}

fn evaluate_error(directive: &Directive) -> Option<Decision> {
    (directive.action == DirectiveAction::Error).then(|| Decision::Error {
        reason: directive.reason.clone(),
    })
}

fn evaluate_checkpoint(directive: &Directive) -> Option<Decision> {
    (directive.action == DirectiveAction::Checkpoint).then(|| Decision::Checkpoint {
        reason: directive.reason.clone(),
    })
}

/// Requires a `loop` step behavior. Honours `maxIterations`: once the cap is
/// hit, the step simply advances instead of repeating again.
fn evaluate_loop(
    behavior: Option<&StepBehavior>,
    directive: &Directive,
    loop_state: LoopState,
) -> Option<Decision> {
    if directive.action != DirectiveAction::Loop {
        return None;
    }
    let StepBehavior::Loop { steps, max_iterations, .. } = behavior? else {
        return None;
    };

    if let Some(max) = max_iterations {
        if loop_state.iterations_so_far >= *max {
            tracing::info!(
                iterations = loop_state.iterations_so_far,
                max_iterations = max,
                "loop limit reached"
            );
            return Some(Decision::Continue);
        }
    }

    Some(Decision::Loop { steps_back: *steps })
}

/// Requires a `trigger` step behavior. The directive's explicit target takes
/// precedence over the behavior's default target. A target naming an
/// unknown agent is rejected and the directive treated as absent (spec §8
/// boundary behaviour), not propagated as a runtime error.
fn evaluate_trigger(
    behavior: Option<&StepBehavior>,
    directive: &Directive,
    known_agent_ids: &HashSet<&str>,
) -> Option<Decision> {
    if directive.action != DirectiveAction::Trigger {
        return None;
    }
    let Some(StepBehavior::Trigger { trigger_agent_id: default_target, .. }) = behavior else {
        return None;
    };

    let target = directive.trigger_agent_id.clone().or_else(|| default_target.clone())?;

    if !known_agent_ids.contains(target.as_str()) {
        tracing::warn!(target, "trigger directive names an unknown agent, treating as absent");
        return None;
    }

    Some(Decision::Trigger { target_agent_id: target })
}

fn evaluate_pause(directive: &Directive) -> Option<Decision> {
    (directive.action == DirectiveAction::Pause).then(|| Decision::Pause {
        reason: directive.reason.clone(),
    })
}

fn evaluate_stop(directive: &Directive) -> Option<Decision> {
    (directive.action == DirectiveAction::Stop).then_some(Decision::Stop)
}

/// Runs every evaluator in the fixed priority order
/// `error → checkpoint → loop → trigger → pause → stop → continue`
/// and returns the first non-null result.
pub fn evaluate_directives(
    behavior: Option<&StepBehavior>,
    directive: &Directive,
    known_agent_ids: &HashSet<&str>,
    loop_state: LoopState,
) -> Result<Decision, RuntimeError> {
    if let Some(decision) = evaluate_error(directive) {
        return Ok(decision);
    }
    if let Some(decision) = evaluate_checkpoint(directive) {
        return Ok(decision);
    }
    if let Some(decision) = evaluate_loop(behavior, directive, loop_state) {
        return Ok(decision);
    }
    if let Some(decision) = evaluate_trigger(behavior, directive, known_agent_ids) {
        return Ok(decision);
    }
    if let Some(decision) = evaluate_pause(directive) {
        return Ok(decision);
    }
    if let Some(decision) = evaluate_stop(directive) {
        return Ok(decision);
    }
    Ok(Decision::Continue)
}

#[cfg(test)]
#[path = "evaluators_tests.rs"]
mod tests;
