// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The three concrete mode handlers keyed by resolved scenario (spec §4.9).
//!
//! A handler's job ends at "the engine ran"; it returns `Advance` on normal
//! completion and lets the runner's own post-execution directive evaluation
//! (spec §4.11 step d) decide what happens next. The autonomous handler is
//! the one exception: it evaluates directives between prompts so a
//! `stop`/`error`/`loop`/`pause`/`checkpoint` can short-circuit the chained
//! queue without waiting for every prompt to run.

use std::collections::HashSet;

use async_trait::async_trait;
use cm_adapters::{EngineAdapter, RunOptions};
use cm_core::StepBehavior;
use cm_storage::{DirectiveStore, StepIndexManager};

use crate::error::RuntimeError;
use crate::evaluators::{evaluate_directives, Decision, LoopState};
use crate::input::{InputOutcome, InputProvider, ModeSwitchTarget, StepContext};
use crate::session::StepSession;

/// What a mode handler produced after running (or not running) the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeHandlerResult {
    Continue,
    Advance,
    Loop(usize),
    Stop,
    Pause(Option<String>),
    Checkpoint(Option<String>),
    Error(Option<String>),
    ModeSwitch(ModeSwitchTarget),
}

/// Everything a handler needs to run one step.
pub struct StepRunContext<'a> {
    pub session: &'a mut StepSession,
    pub agent_id: &'a str,
    pub step_index: usize,
    pub provider: std::sync::Arc<dyn InputProvider>,
    pub adapter: std::sync::Arc<dyn EngineAdapter>,
    pub options_template: RunOptions,
    pub directives: &'a DirectiveStore,
    pub behavior: Option<&'a StepBehavior>,
    pub known_agent_ids: &'a HashSet<&'a str>,
    pub loop_state: LoopState,
    pub index: &'a mut StepIndexManager,
    /// Chain index to resume from when re-entering a step after a crash
    /// mid-chain (spec §4.4 `resumeFromChain`); zero otherwise.
    pub chain_start: u32,
}

impl<'a> StepRunContext<'a> {
    fn step_context(&self) -> StepContext {
        StepContext {
            step_index: self.step_index,
            agent_id: self.agent_id.to_string(),
        }
    }

    fn options_for(&self, prompt: &str) -> RunOptions {
        let mut options = self.options_template.clone();
        if let Some(session_id) = self.session.engine_session_id() {
            options = options.with_resume(session_id.to_string(), prompt.to_string());
        }
        options
    }

    /// Stamp the engine-returned session id onto both the in-memory session
    /// and the on-disk tracking record (spec §9: persist it verbatim so a
    /// later crash can resume the same engine session), then persist.
    fn record_session_id(&mut self, session_id: String) -> Result<(), RuntimeError> {
        self.session.set_engine_session_id(session_id.clone());
        self.index.record_session_id(self.step_index, session_id);
        self.index.save().map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))
    }
}

#[async_trait]
pub trait ModeHandler: Send + Sync {
    async fn handle(&self, ctx: &mut StepRunContext<'_>) -> Result<ModeHandlerResult, RuntimeError>;
}

/// Scenarios 1-4, 7-8: await the active provider, then run (or resume) the
/// engine with whatever text it produced.
pub struct InteractiveModeHandler;

#[async_trait]
impl ModeHandler for InteractiveModeHandler {
    async fn handle(&self, ctx: &mut StepRunContext<'_>) -> Result<ModeHandlerResult, RuntimeError> {
        let step_ctx = ctx.step_context();
        match ctx.provider.await_input(&step_ctx).await {
            InputOutcome::ModeSwitch(target) => Ok(ModeHandlerResult::ModeSwitch(target)),
            InputOutcome::Prompt { text, .. } => {
                let options = ctx.options_for(&text);
                let result = ctx.adapter.run(&text, options).await?;
                ctx.record_session_id(result.session_id)?;
                Ok(ModeHandlerResult::Advance)
            }
        }
    }
}

/// Scenario 5: replay the whole chained-prompt queue back-to-back under one
/// session, evaluating directives between prompts to allow early exit.
pub struct AutonomousModeHandler;

#[async_trait]
impl ModeHandler for AutonomousModeHandler {
    async fn handle(&self, ctx: &mut StepRunContext<'_>) -> Result<ModeHandlerResult, RuntimeError> {
        let mut chain_index = ctx.chain_start;
        while let Some(prompt) = ctx.session.next_prompt() {
            let options = ctx.options_for(&prompt);
            let result = ctx.adapter.run(&prompt, options).await?;
            ctx.record_session_id(result.session_id)?;

            ctx.index.mark_chain_completed(ctx.step_index, chain_index);
            ctx.index
                .save()
                .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
            chain_index += 1;

            let directive = ctx.directives.read();
            let decision =
                evaluate_directives(ctx.behavior, &directive, ctx.known_agent_ids, ctx.loop_state)?;

            match decision {
                Decision::Stop => return Ok(ModeHandlerResult::Stop),
                Decision::Error { reason } => return Ok(ModeHandlerResult::Error(reason)),
                Decision::Pause { reason } => return Ok(ModeHandlerResult::Pause(reason)),
                Decision::Checkpoint { reason } => return Ok(ModeHandlerResult::Checkpoint(reason)),
                Decision::Loop { steps_back } => {
                    let target = ctx.step_index.saturating_sub(steps_back as usize);
                    return Ok(ModeHandlerResult::Loop(target));
                }
                // A trigger fired mid-queue is deferred to the runner's own
                // post-execution evaluation once the handler returns.
                Decision::Trigger { .. } | Decision::Continue => continue,
            }
        }
        Ok(ModeHandlerResult::Advance)
    }
}

/// Scenario 6: advance without running anything or touching input.
pub struct ContinuousModeHandler;

#[async_trait]
impl ModeHandler for ContinuousModeHandler {
    async fn handle(&self, _ctx: &mut StepRunContext<'_>) -> Result<ModeHandlerResult, RuntimeError> {
        Ok(ModeHandlerResult::Advance)
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
