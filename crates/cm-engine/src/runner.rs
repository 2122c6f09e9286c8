// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level workflow runner (spec §4.11): loads the template, resolves
//! resume info, and drives each step through scenario resolution, mode
//! handler dispatch, and directive evaluation until a terminal state.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use cm_adapters::{select_engine, AdapterError, AuthCache, EngineAdapter, EngineAuthProbe, EngineRegistry, RunOptions};
use cm_core::ResumeInfo;
use cm_runbook::{AutonomousMode, Step, WorkflowTemplate};
use cm_storage::{DirectiveStore, StepIndexManager};
use tokio::sync::broadcast;

use crate::error::RuntimeError;
use crate::evaluators::{evaluate_directives, Decision, LoopState};
use crate::handlers::{
    AutonomousModeHandler, ContinuousModeHandler, InteractiveModeHandler, ModeHandler, ModeHandlerResult,
    StepRunContext,
};
use crate::input::{InputProvider, ModeSwitchTarget};
use crate::mode::{ActiveProvider, WorkflowMode};
use crate::scenario::{resolve_scenario, HandlerKind};
use crate::session::StepSession;
use crate::signals::{SignalBus, WorkflowSignal};
use crate::state_machine::{WorkflowEvent, WorkflowState, WorkflowStateMachine};

/// A user-initiated skip or stop signal, narrowed out of the full
/// [`WorkflowSignal`] bus (spec §5, §8 property 6 "cancellation liveness").
enum ControlSignal {
    Skip,
    Stop,
}

/// Waits for the next skip/stop signal, ignoring everything else the bus
/// carries (pause/mode-change/error have their own dedicated handling). A
/// closed bus never fires skip/stop, so park forever rather than spin.
async fn next_control_signal(rx: &mut broadcast::Receiver<WorkflowSignal>) -> ControlSignal {
    loop {
        match rx.recv().await {
            Ok(WorkflowSignal::Skip) => return ControlSignal::Skip,
            Ok(WorkflowSignal::Stop) => return ControlSignal::Stop,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => std::future::pending().await,
        }
    }
}

/// The set of unique agent ids a loop rewind is skipping over this pass
/// (spec §4.11(e) `activeLoop.skip`). Consumed one id at a time as the
/// runner steps back over the skipped range; empties itself out.
struct ActiveLoop {
    skip: HashSet<String>,
}

/// A loop rewind from `step_index` back to `target` skips every step
/// strictly between the two on the next pass, and drops their recorded
/// chain progress so a later crash-resume doesn't read it as still
/// in-flight (spec §4.11(e)).
///
/// Takes `index` as an explicit reference (rather than `&mut self`) so
/// callers can hold it alongside a `filtered` step list borrowed from
/// `self.template`.
fn compute_loop_skip(
    index: &mut StepIndexManager,
    filtered: &[(usize, &Step)],
    target: usize,
    step_index: usize,
) -> Option<ActiveLoop> {
    let mut skip = HashSet::new();
    for (idx, step) in filtered.iter().filter(|(idx, _)| *idx > target && *idx < step_index) {
        if let Some(module) = step.as_module() {
            skip.insert(module.unique_agent_id(*idx));
        }
        index.clear_chain_progress(*idx);
    }
    if skip.is_empty() {
        None
    } else {
        Some(ActiveLoop { skip })
    }
}

/// Why the runner stopped driving the workflow loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stopped,
    Paused { reason: Option<String> },
    Checkpoint { reason: Option<String> },
}

/// The engines available to the runner, keyed by engine id.
pub struct EngineBindings {
    pub registry: EngineRegistry,
    pub adapters: HashMap<String, Arc<dyn EngineAdapter>>,
    pub auth_probes: HashMap<String, Arc<dyn EngineAuthProbe>>,
}

pub struct WorkflowRunner {
    template: WorkflowTemplate,
    index: StepIndexManager,
    directives: DirectiveStore,
    fsm: WorkflowStateMachine,
    mode: WorkflowMode,
    engines: EngineBindings,
    auth_cache: AuthCache,
    signals: SignalBus,
    working_dir: PathBuf,
    monitoring_id: u64,
    /// Completed loop-back count per step index, for the `maxIterations` cap
    /// (spec §4.10, §8 property 3). Runtime-only: a crash resets the count,
    /// same as the reference's in-memory `activeLoop` bookkeeping.
    loop_iterations: HashMap<usize, u32>,
    /// The steps a loop rewind is currently skipping over, if any.
    active_loop: Option<ActiveLoop>,
}

impl WorkflowRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        template: WorkflowTemplate,
        index: StepIndexManager,
        directives: DirectiveStore,
        engines: EngineBindings,
        user_provider: Arc<dyn InputProvider>,
        controller_provider: Arc<dyn InputProvider>,
        working_dir: impl Into<PathBuf>,
        monitoring_id: u64,
    ) -> Self {
        let signals = SignalBus::new();
        let auto_mode_default = matches!(template.autonomous_mode, AutonomousMode::Always);
        let mode = WorkflowMode::new(auto_mode_default, user_provider, controller_provider, signals.clone());
        Self {
            template,
            index,
            directives,
            fsm: WorkflowStateMachine::new(),
            mode,
            engines,
            auth_cache: AuthCache::default(),
            signals,
            working_dir: working_dir.into(),
            monitoring_id,
            loop_iterations: HashMap::new(),
            active_loop: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.fsm.state()
    }

    pub fn signals(&self) -> SignalBus {
        self.signals.clone()
    }

    #[cfg(test)]
    fn test_subscribe_transitions(&self) -> broadcast::Receiver<crate::state_machine::Transition> {
        self.fsm.subscribe()
    }

    async fn select_engine_for(
        registry: &EngineRegistry,
        probes: &HashMap<String, Arc<dyn EngineAuthProbe>>,
        cache: &AuthCache,
        step_override: Option<&str>,
    ) -> Result<String, RuntimeError> {
        let id = select_engine(step_override, registry, |engine_id| {
            let probe = probes.get(engine_id).cloned();
            async move {
                match probe {
                    Some(probe) => cache.is_authenticated(engine_id, || async move { probe.is_authenticated().await }).await,
                    None => false,
                }
            }
        })
        .await?;
        Ok(id)
    }

    fn handler_for(kind: HandlerKind) -> Box<dyn ModeHandler> {
        match kind {
            HandlerKind::Interactive => Box::new(InteractiveModeHandler),
            HandlerKind::Autonomous => Box::new(AutonomousModeHandler),
            HandlerKind::Continuous => Box::new(ContinuousModeHandler),
        }
    }

    /// Drive the workflow loop from its current resume point to a terminal
    /// or suspended state. Returns `Ok` describing why the loop stopped, or
    /// `Err` if an unrecoverable failure transitioned the FSM to `error`.
    pub async fn run(&mut self) -> Result<RunOutcome, RuntimeError> {
        self.fsm
            .apply(WorkflowEvent::Start)
            .map_err(|e| RuntimeError::StartupFailure(e.to_string()))?;

        let selected_track = self.index.selected_track().map(str::to_string);
        let selected_conditions = self
            .index
            .state()
            .selected_conditions
            .clone()
            .unwrap_or_default();
        let filtered = self.template.filter_steps(selected_track.as_deref(), &selected_conditions);
        let known_agent_ids = self.template.agent_ids();

        let resume = self.index.resume_info();
        let start_index = resume.start_index();

        // A crash or partial-chain resume re-enters the same step it left off
        // on; seed that step's session with the previously recorded engine
        // session id so the adapter resumes rather than starts fresh (S1).
        let mut resume_seed = match resume {
            ResumeInfo::ResumeFromCrash { index } | ResumeInfo::ResumeFromChain { index, .. } => self
                .index
                .state()
                .completed_steps
                .get(&index)
                .map(|record| record.session_id.clone())
                .filter(|session_id| !session_id.is_empty())
                .map(|session_id| (index, session_id)),
            _ => None,
        };
        // A chain resume continues one past the highest chain index already
        // recorded, rather than replaying the whole queue from the top.
        let mut chain_start: u32 = match resume {
            ResumeInfo::ResumeFromChain { chain_index, .. } => chain_index + 1,
            _ => 0,
        };

        // The workflow starts already delegated to the controller when its
        // template forces autonomous mode from the outset.
        if self.mode.is_auto() {
            self.fsm
                .apply(WorkflowEvent::EnterAuto)
                .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
        }

        let mut pos = filtered
            .iter()
            .position(|(idx, _)| *idx >= start_index)
            .unwrap_or(filtered.len());

        while pos < filtered.len() {
            let (step_index, step) = filtered[pos];
            let module = match step {
                Step::Separator(_) => {
                    pos += 1;
                    continue;
                }
                Step::Module(m) => m,
            };

            if module.execute_once && self.index.is_step_completed(step_index) {
                pos += 1;
                continue;
            }

            let skip_unique_id = module.unique_agent_id(step_index);
            let skipped_by_loop = self
                .active_loop
                .as_mut()
                .is_some_and(|active_loop| active_loop.skip.remove(&skip_unique_id));
            if skipped_by_loop {
                if self.active_loop.as_ref().is_some_and(|active_loop| active_loop.skip.is_empty()) {
                    self.active_loop = None;
                }
                pos += 1;
                continue;
            }

            let seeded_session_id = match &resume_seed {
                Some((seed_index, _)) if *seed_index == step_index => {
                    resume_seed.take().map(|(_, session_id)| session_id)
                }
                _ => None,
            };
            let step_chain_start = if seeded_session_id.is_some() {
                std::mem::take(&mut chain_start)
            } else {
                0
            };

            self.index.mark_step_started(
                step_index,
                seeded_session_id.clone().unwrap_or_default(),
                self.monitoring_id,
            );
            self.index
                .save()
                .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;

            let behavior = module.module.as_ref().and_then(|m| m.behavior.clone());
            let has_chained = module.has_chained_prompts();
            let scenario = resolve_scenario(module.interactive, self.mode.is_auto(), has_chained);
            let handler = Self::handler_for(scenario.handler_kind());

            let engine_id = Self::select_engine_for(
                &self.engines.registry,
                &self.engines.auth_probes,
                &self.auth_cache,
                module.engine.as_deref(),
            )
            .await?;
            let adapter = self
                .engines
                .adapters
                .get(&engine_id)
                .cloned()
                .ok_or_else(|| RuntimeError::StartupFailure(format!("no adapter registered for engine {engine_id}")))?;

            let mut options_template = RunOptions::new(&self.working_dir);
            if let Some(model) = &module.model {
                options_template = options_template.with_model(model.clone());
            }

            let mut session = StepSession::new(module.prompt_path.as_slice().to_vec());
            if let Some(session_id) = seeded_session_id {
                session.set_engine_session_id(session_id);
                for _ in 0..step_chain_start {
                    session.next_prompt();
                }
            }
            options_template = options_template.with_cancel(session.cancel_token());
            let loop_state = LoopState {
                iterations_so_far: *self.loop_iterations.get(&step_index).unwrap_or(&0),
            };

            // Scenarios that wait on a live person (not the controller) pass
            // through `Awaiting` for the duration of the handler call (spec §4.5).
            let awaiting_user =
                scenario.should_wait && self.mode.active_provider_kind() == ActiveProvider::User;
            if awaiting_user {
                self.fsm
                    .apply(WorkflowEvent::WaitForInput)
                    .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
            }

            let mut ctx = StepRunContext {
                session: &mut session,
                agent_id: &module.agent_id,
                step_index,
                provider: self.mode.active_provider(),
                adapter,
                options_template,
                directives: &self.directives,
                behavior: behavior.as_ref(),
                known_agent_ids: &known_agent_ids,
                loop_state,
                index: &mut self.index,
                chain_start: step_chain_start,
            };

            let mut signal_rx = self.signals.subscribe();
            let handler_result = tokio::select! {
                biased;
                signal = next_control_signal(&mut signal_rx) => {
                    session.cancel();
                    match signal {
                        ControlSignal::Skip => {
                            tracing::info!(step = step_index, "step skipped by signal");
                            if awaiting_user {
                                self.fsm
                                    .apply(WorkflowEvent::InputReceived)
                                    .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                            }
                            pos += 1;
                            continue;
                        }
                        ControlSignal::Stop => {
                            self.fsm
                                .apply(WorkflowEvent::Stop)
                                .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                            return Ok(RunOutcome::Stopped);
                        }
                    }
                }
                result = handler.handle(&mut ctx) => {
                    match result {
                        Ok(result) => result,
                        // A cancellation raced in just as the adapter noticed it;
                        // treat it the same as a skip signal (spec §7: cancelled
                        // is a normal outcome, not an error).
                        Err(RuntimeError::Adapter(AdapterError::Cancelled(_))) => {
                            tracing::info!(step = step_index, "step cancelled, treating as skip");
                            if awaiting_user {
                                self.fsm
                                    .apply(WorkflowEvent::InputReceived)
                                    .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                            }
                            pos += 1;
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                }
            };

            if awaiting_user {
                self.fsm
                    .apply(WorkflowEvent::InputReceived)
                    .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
            }

            match handler_result {
                ModeHandlerResult::ModeSwitch(target) => {
                    match target {
                        ModeSwitchTarget::ToAuto => {
                            self.mode.set_auto_mode(true).await;
                            if self.fsm.state() == WorkflowState::Running {
                                self.fsm
                                    .apply(WorkflowEvent::EnterAuto)
                                    .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                            }
                        }
                        ModeSwitchTarget::ToManual => {
                            self.mode.set_auto_mode(false).await;
                            if self.fsm.state() == WorkflowState::Delegated {
                                self.fsm
                                    .apply(WorkflowEvent::ExitAuto)
                                    .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                            }
                        }
                    }
                    continue;
                }
                ModeHandlerResult::Pause(reason) => {
                    return self.enter_pause(reason).await;
                }
                ModeHandlerResult::Checkpoint(reason) => {
                    self.fsm
                        .apply(WorkflowEvent::Pause)
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    self.mode.pause().await;
                    return Ok(RunOutcome::Checkpoint { reason });
                }
                ModeHandlerResult::Stop => {
                    self.fsm
                        .apply(WorkflowEvent::Stop)
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    return Ok(RunOutcome::Stopped);
                }
                ModeHandlerResult::Error(reason) => {
                    self.fsm
                        .apply(WorkflowEvent::Fail)
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    self.signals.publish(WorkflowSignal::Error {
                        reason: reason.clone().unwrap_or_default(),
                    });
                    return Err(RuntimeError::RuntimeFailure(reason.unwrap_or_default()));
                }
                ModeHandlerResult::Loop(target_index) => {
                    *self.loop_iterations.entry(step_index).or_insert(0) += 1;
                    self.active_loop = compute_loop_skip(&mut self.index, &filtered, target_index, step_index);
                    pos = filtered
                        .iter()
                        .position(|(idx, _)| *idx == target_index)
                        .unwrap_or(0);
                    self.directives
                        .reset_to_continue()
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    continue;
                }
                ModeHandlerResult::Continue | ModeHandlerResult::Advance => {}
            }

            let directive = self.directives.read();
            let decision = evaluate_directives(behavior.as_ref(), &directive, &known_agent_ids, loop_state)?;

            match decision {
                Decision::Continue => {
                    self.index.mark_step_completed(step_index);
                    self.index
                        .save()
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    self.directives
                        .reset_to_continue()
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    pos += 1;
                }
                Decision::Loop { steps_back } => {
                    *self.loop_iterations.entry(step_index).or_insert(0) += 1;
                    let target = step_index.saturating_sub(steps_back as usize);
                    self.active_loop = compute_loop_skip(&mut self.index, &filtered, target, step_index);
                    pos = filtered.iter().position(|(idx, _)| *idx == target).unwrap_or(0);
                    self.directives
                        .reset_to_continue()
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                }
                Decision::Trigger { target_agent_id } => {
                    Self::run_triggered_agent(
                        &self.engines,
                        &self.auth_cache,
                        &self.working_dir,
                        &target_agent_id,
                        &filtered,
                    )
                    .await?;
                    self.index.mark_step_completed(step_index);
                    self.index
                        .save()
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    self.directives
                        .reset_to_continue()
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    pos += 1;
                }
                Decision::Pause { reason } => {
                    return self.enter_pause(reason).await;
                }
                Decision::Checkpoint { reason } => {
                    self.fsm
                        .apply(WorkflowEvent::Pause)
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    self.mode.pause().await;
                    return Ok(RunOutcome::Checkpoint { reason });
                }
                Decision::Stop => {
                    self.fsm
                        .apply(WorkflowEvent::Stop)
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    return Ok(RunOutcome::Stopped);
                }
                Decision::Error { reason } => {
                    self.fsm
                        .apply(WorkflowEvent::Fail)
                        .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
                    self.signals.publish(WorkflowSignal::Error {
                        reason: reason.clone().unwrap_or_default(),
                    });
                    return Err(RuntimeError::RuntimeFailure(reason.unwrap_or_default()));
                }
            }
        }

        self.fsm
            .apply(WorkflowEvent::Complete)
            .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
        Ok(RunOutcome::Completed)
    }

    async fn enter_pause(&mut self, reason: Option<String>) -> Result<RunOutcome, RuntimeError> {
        self.fsm
            .apply(WorkflowEvent::Pause)
            .map_err(|e| RuntimeError::RuntimeFailure(e.to_string()))?;
        self.mode.pause().await;
        Ok(RunOutcome::Paused { reason })
    }

    /// Run a `trigger` directive's target agent once, ahead of the current
    /// step's normal advance (spec §4.2 `trigger` behavior, S5). The
    /// triggered run does not participate in directive evaluation or the
    /// index's completion bookkeeping of its own; it is a side run.
    ///
    /// Takes explicit field references rather than `&mut self` so callers
    /// can hold it alongside a `filtered` step list borrowed from `self.template`.
    #[allow(clippy::too_many_arguments)]
    async fn run_triggered_agent(
        engines: &EngineBindings,
        auth_cache: &AuthCache,
        working_dir: &std::path::Path,
        target_agent_id: &str,
        filtered: &[(usize, &Step)],
    ) -> Result<(), RuntimeError> {
        let Some(module) = filtered
            .iter()
            .find_map(|(_, step)| step.as_module().filter(|m| m.agent_id == target_agent_id))
        else {
            return Err(RuntimeError::UnknownTriggerTarget(target_agent_id.to_string()));
        };

        let engine_id = Self::select_engine_for(
            &engines.registry,
            &engines.auth_probes,
            auth_cache,
            module.engine.as_deref(),
        )
        .await?;
        let adapter = engines
            .adapters
            .get(&engine_id)
            .cloned()
            .ok_or_else(|| RuntimeError::StartupFailure(format!("no adapter registered for engine {engine_id}")))?;

        let mut options = RunOptions::new(working_dir);
        if let Some(model) = &module.model {
            options = options.with_model(model.clone());
        }

        let prompt = module.prompt_path.as_slice().first().cloned().unwrap_or_default();
        tracing::info!(target = target_agent_id, "running triggered agent");
        adapter.run(&prompt, options).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
