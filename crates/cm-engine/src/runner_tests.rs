// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cm_adapters::{AdapterError, EngineAuthProbe, EngineRegistration, EngineRegistry, FakeEngineAdapter};
use cm_core::{Directive, DirectiveAction, StepBehavior};
use cm_runbook::{module, separator, step, AutonomousMode, WorkflowTemplate};
use tempfile::TempDir;

use super::*;
use crate::input::{FakeInputProvider, InputOutcome, InputSource, UserInputProvider};

struct AlwaysAuthProbe;

#[async_trait]
impl EngineAuthProbe for AlwaysAuthProbe {
    async fn is_authenticated(&self) -> bool {
        true
    }

    async fn configure_mcp(&self, _workflow_dir: &Path) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn cleanup_mcp(&self, _workflow_dir: &Path) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn is_mcp_configured(&self, _workflow_dir: &Path) -> bool {
        true
    }
}

struct NeverAuthProbe;

#[async_trait]
impl EngineAuthProbe for NeverAuthProbe {
    async fn is_authenticated(&self) -> bool {
        false
    }

    async fn configure_mcp(&self, _workflow_dir: &Path) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn cleanup_mcp(&self, _workflow_dir: &Path) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn is_mcp_configured(&self, _workflow_dir: &Path) -> bool {
        false
    }
}

fn fixture(
) -> (TempDir, Arc<FakeEngineAdapter>, EngineBindings, Arc<FakeInputProvider>, Arc<FakeInputProvider>) {
    let dir = TempDir::new().unwrap();
    let adapter = Arc::new(FakeEngineAdapter::new());

    let registry = EngineRegistry::new().register(EngineRegistration::default_engine("claude"));
    let mut adapters: HashMap<String, Arc<dyn EngineAdapter>> = HashMap::new();
    adapters.insert("claude".to_string(), adapter.clone());
    let mut auth_probes: HashMap<String, Arc<dyn EngineAuthProbe>> = HashMap::new();
    auth_probes.insert("claude".to_string(), Arc::new(AlwaysAuthProbe));

    let engines = EngineBindings {
        registry,
        adapters,
        auth_probes,
    };

    let user = Arc::new(FakeInputProvider::new());
    let controller = Arc::new(FakeInputProvider::new());

    (dir, adapter, engines, user, controller)
}

fn runner(
    template: WorkflowTemplate,
    dir: &TempDir,
    engines: EngineBindings,
    user: Arc<FakeInputProvider>,
    controller: Arc<FakeInputProvider>,
) -> WorkflowRunner {
    let index = StepIndexManager::load(dir.path().join("template.json")).unwrap();
    let directives = DirectiveStore::new(dir.path());
    WorkflowRunner::new(template, index, directives, engines, user, controller, dir.path(), 1)
}

fn prompt_outcome(text: &str) -> InputOutcome {
    InputOutcome::Prompt {
        source: InputSource::User,
        text: text.to_string(),
        monitoring_id: None,
    }
}

#[tokio::test]
async fn linear_workflow_completes_across_both_steps() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("write the thing"));
    user.queue(prompt_outcome("review the thing"));
    adapter.queue_success("sess-writer");
    adapter.queue_success("sess-reviewer");

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .step(step("reviewer").prompt("review prompt"))
        .build()
        .unwrap();

    let mut runner = runner(template, &dir, engines, user, controller);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(runner.state(), WorkflowState::Final);
    assert_eq!(adapter.call_count(), 2);
    assert_eq!(adapter.calls()[0].prompt, "write the thing");
    assert_eq!(adapter.calls()[1].prompt, "review the thing");
}

#[tokio::test]
async fn separators_and_completed_execute_once_steps_are_skipped() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("go"));
    adapter.queue_success("sess-1");

    let template = WorkflowTemplate::builder("wf")
        .step(separator("--- phase one ---"))
        .step(step("setup").prompt("setup prompt").execute_once(true))
        .step(step("writer").prompt("write prompt"))
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let mut index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    // Already completed a prior run of the once-only setup step; resuming a
    // fresh run should skip straight past it as well as the separator.
    index.mark_step_started(1, "already-done", 1);
    index.mark_step_completed(1);
    index.set_state(|s| s.resume_from_last_step = false);
    index.save().unwrap();
    let directives = DirectiveStore::new(&dir_path);

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 2);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(adapter.call_count(), 1);
    assert_eq!(adapter.calls()[0].prompt, "go");
}

#[tokio::test]
async fn resumes_from_crash_and_seeds_adapter_with_prior_session_id() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("resume please"));
    adapter.queue_success("sess-reviewer-2");

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .step(step("reviewer").prompt("review prompt"))
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let mut index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    index.mark_step_started(0, "sess-writer", 7);
    index.mark_step_completed(0);
    index.mark_step_started(1, "abc", 7);
    index.save().unwrap();
    let directives = DirectiveStore::new(&dir_path);

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 8);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(adapter.call_count(), 1);
    assert_eq!(adapter.calls()[0].resume_session_id.as_deref(), Some("abc"));
}

// A `loop` directive is the engine's own single-shot signal (it would have
// to be re-issued on every subsequent run to keep rewinding); the runner
// resets the directive store to `continue` as soon as it is consumed, same
// as `stop`/`trigger`. One pre-written directive therefore produces exactly
// one rewind here, not an unbounded loop.
#[tokio::test]
async fn loop_directive_rewinds_to_earlier_step_once() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("draft one"));
    user.queue(prompt_outcome("draft two"));
    adapter.queue_success("sess-1");
    adapter.queue_success("sess-2");

    let template = WorkflowTemplate::builder("wf")
        .step(
            module("qa-loop", "writer")
                .prompt("write prompt")
                .behavior("qa-loop", StepBehavior::step_back(0, Some(2))),
        )
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    let directives = DirectiveStore::new(&dir_path);
    directives
        .write(&Directive {
            action: DirectiveAction::Loop,
            reason: None,
            trigger_agent_id: None,
        })
        .unwrap();

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 1);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(adapter.call_count(), 2);
    assert_eq!(adapter.calls()[0].prompt, "draft one");
    assert_eq!(adapter.calls()[1].prompt, "draft two");
}

#[tokio::test]
async fn loop_directive_respects_zero_max_iterations_cap() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("draft one"));
    adapter.queue_success("sess-1");

    let template = WorkflowTemplate::builder("wf")
        .step(
            module("qa-loop", "writer")
                .prompt("write prompt")
                .behavior("qa-loop", StepBehavior::step_back(0, Some(0))),
        )
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    let directives = DirectiveStore::new(&dir_path);
    directives
        .write(&Directive {
            action: DirectiveAction::Loop,
            reason: None,
            trigger_agent_id: None,
        })
        .unwrap();

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 1);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(adapter.call_count(), 1);
}

// A trigger fires a side run of its target agent (using the target module's
// configured prompt, not the interactive input stream) and then advances
// past the *current* step as usual — it does not mark the target step
// completed, so the target still runs its own normal turn later.
#[tokio::test]
async fn trigger_directive_runs_target_agent_then_advances() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("go writer"));
    user.queue(prompt_outcome("go qa"));
    adapter.queue_success("sess-writer");
    adapter.queue_success("sess-qa-triggered");
    adapter.queue_success("sess-qa-normal");

    let template = WorkflowTemplate::builder("wf")
        .step(
            module("trigger-qa", "writer")
                .prompt("write prompt")
                .behavior("trigger-qa", StepBehavior::main_agent_call(None)),
        )
        .step(step("qa").prompt("qa prompt"))
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    let directives = DirectiveStore::new(&dir_path);
    directives
        .write(&Directive {
            action: DirectiveAction::Trigger,
            reason: None,
            trigger_agent_id: Some("qa".to_string()),
        })
        .unwrap();

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 1);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(adapter.call_count(), 3);
    assert_eq!(adapter.calls()[0].prompt, "go writer");
    assert_eq!(adapter.calls()[1].prompt, "qa prompt");
    assert_eq!(adapter.calls()[2].prompt, "go qa");
}

#[tokio::test]
async fn stop_directive_ends_workflow_in_final_state() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("go"));
    adapter.queue_success("sess-1");

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .step(step("reviewer").prompt("review prompt"))
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    let directives = DirectiveStore::new(&dir_path);
    directives
        .write(&Directive {
            action: DirectiveAction::Stop,
            reason: None,
            trigger_agent_id: None,
        })
        .unwrap();

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 1);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(runner.state(), WorkflowState::Final);
    assert_eq!(adapter.call_count(), 1);
}

#[tokio::test]
async fn checkpoint_directive_pauses_workflow_and_surfaces_reason() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("go"));
    adapter.queue_success("sess-1");

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    let directives = DirectiveStore::new(&dir_path);
    directives
        .write(&Directive {
            action: DirectiveAction::Checkpoint,
            reason: Some("needs human review".to_string()),
            trigger_agent_id: None,
        })
        .unwrap();

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 1);
    let outcome = runner.run().await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Checkpoint {
            reason: Some("needs human review".to_string())
        }
    );
    assert_eq!(runner.state(), WorkflowState::Paused);
}

#[tokio::test]
async fn error_directive_fails_workflow_and_emits_error_signal() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("go"));
    adapter.queue_success("sess-1");

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    let directives = DirectiveStore::new(&dir_path);
    directives
        .write(&Directive {
            action: DirectiveAction::Error,
            reason: Some("boom".to_string()),
            trigger_agent_id: None,
        })
        .unwrap();

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 1);
    let mut signals = runner.signals().subscribe();
    let err = runner.run().await.unwrap_err();

    assert_eq!(err.code(), "CM-E100");
    assert_eq!(runner.state(), WorkflowState::Error);
    let signal = signals.recv().await.unwrap();
    assert_eq!(signal, WorkflowSignal::Error { reason: "boom".to_string() });
}

#[tokio::test]
async fn empty_engine_registry_fails_startup() {
    let (dir, _adapter, _engines, user, controller) = fixture();
    let engines = EngineBindings {
        registry: EngineRegistry::new(),
        adapters: HashMap::new(),
        auth_probes: HashMap::new(),
    };

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .build()
        .unwrap();

    let mut runner = runner(template, &dir, engines, user, controller);
    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, RuntimeError::Adapter(AdapterError::NoEnginesRegistered)));
}

#[tokio::test]
async fn auth_fallback_skips_unauthenticated_override_engine() {
    let (dir, adapter, mut engines, user, controller) = fixture();
    user.queue(prompt_outcome("go"));
    adapter.queue_success("sess-1");

    engines.registry = EngineRegistry::new()
        .register(EngineRegistration::new("cursor"))
        .register(EngineRegistration::default_engine("claude"));
    engines
        .auth_probes
        .insert("cursor".to_string(), Arc::new(NeverAuthProbe));

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt").engine("cursor"))
        .build()
        .unwrap();

    let mut runner = runner(template, &dir, engines, user, controller);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(adapter.call_count(), 1);
}

// The user provider's channel is never sent on, so `await_input` blocks
// forever until the published signal races it in `tokio::select!`.
#[tokio::test]
async fn skip_signal_cancels_pending_step_and_completes_workflow() {
    let (dir, adapter, engines, _unused_user, controller) = fixture();

    let (_tx, rx) = tokio::sync::mpsc::channel(4);
    let user: Arc<dyn InputProvider> = Arc::new(UserInputProvider::new(rx));

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .build()
        .unwrap();

    let mut runner = runner(template, &dir, engines, user, controller);
    let signals = runner.signals();

    let handle = tokio::spawn(async move {
        let outcome = runner.run().await.unwrap();
        (outcome, runner.state())
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    signals.publish(WorkflowSignal::Skip);

    let (outcome, state) = handle.await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(state, WorkflowState::Final);
    assert_eq!(adapter.call_count(), 0);
}

#[tokio::test]
async fn stop_signal_cancels_pending_step_and_stops_workflow() {
    let (dir, adapter, engines, _unused_user, controller) = fixture();

    let (_tx, rx) = tokio::sync::mpsc::channel(4);
    let user: Arc<dyn InputProvider> = Arc::new(UserInputProvider::new(rx));

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .step(step("reviewer").prompt("review prompt"))
        .build()
        .unwrap();

    let mut runner = runner(template, &dir, engines, user, controller);
    let signals = runner.signals();

    let handle = tokio::spawn(async move {
        let outcome = runner.run().await.unwrap();
        (outcome, runner.state())
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    signals.publish(WorkflowSignal::Stop);

    let (outcome, state) = handle.await.unwrap();
    assert_eq!(outcome, RunOutcome::Stopped);
    assert_eq!(state, WorkflowState::Final);
    assert_eq!(adapter.call_count(), 0);
}

// A resumed chain continues from one past the highest recorded chain index
// instead of replaying already-sent chained prompts from the top (spec §4.4
// `resumeFromChain`).
#[tokio::test]
async fn resume_from_chain_replays_only_remaining_chained_prompts() {
    let (dir, adapter, engines, user, controller) = fixture();
    adapter.queue_success("sess-writer");
    adapter.queue_success("sess-writer");

    let template = WorkflowTemplate::builder("wf")
        .autonomous_mode(AutonomousMode::Always)
        .step(
            step("writer")
                .interactive(false)
                .prompt(vec![
                    "first prompt".to_string(),
                    "second prompt".to_string(),
                    "third prompt".to_string(),
                ]),
        )
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let mut index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    index.mark_step_started(0, "sess-writer", 1);
    index.mark_chain_completed(0, 0);
    index.save().unwrap();
    let directives = DirectiveStore::new(&dir_path);

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 1);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(adapter.call_count(), 2);
    assert_eq!(adapter.calls()[0].prompt, "second prompt");
    assert_eq!(adapter.calls()[1].prompt, "third prompt");
}

// A loop rewind skips re-running the step strictly between its target and
// the looping step on the rewound pass (spec §4.11(e) `activeLoop.skip`).
#[tokio::test]
async fn loop_rewind_skips_intermediate_step_on_rewound_pass() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("draft one"));
    user.queue(prompt_outcome("draft two"));
    adapter.queue_success("sess-writer-1");
    adapter.queue_success("sess-editor-1");
    adapter.queue_success("sess-qa-1");
    adapter.queue_success("sess-writer-2");
    adapter.queue_success("sess-qa-2");

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .step(step("editor").prompt("edit prompt"))
        .step(
            module("qa-loop", "qa")
                .prompt("qa prompt")
                .behavior("qa-loop", StepBehavior::step_back(2, Some(2))),
        )
        .build()
        .unwrap();

    let dir_path = dir.path().to_path_buf();
    let index = StepIndexManager::load(dir_path.join("template.json")).unwrap();
    let directives = DirectiveStore::new(&dir_path);
    directives
        .write(&Directive {
            action: DirectiveAction::Loop,
            reason: None,
            trigger_agent_id: None,
        })
        .unwrap();

    let mut runner = WorkflowRunner::new(template, index, directives, engines, user, controller, &dir_path, 1);
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(adapter.call_count(), 4);
    assert_eq!(adapter.calls()[0].prompt, "write prompt");
    assert_eq!(adapter.calls()[1].prompt, "qa prompt");
    assert_eq!(adapter.calls()[2].prompt, "write prompt");
    assert_eq!(adapter.calls()[3].prompt, "qa prompt");
}

// `compute_loop_skip` is the free function backing the above end-to-end
// behavior; tested directly here for the chain-progress-clearing half of
// spec §4.11(e), which the full-runner test above has no way to observe
// (the editor step there never accumulates chain progress in the first
// place, since it's a single, non-chained prompt).
#[test]
fn compute_loop_skip_builds_skip_set_and_clears_chain_progress() {
    let dir = TempDir::new().unwrap();
    let mut index = StepIndexManager::load(dir.path().join("template.json")).unwrap();
    index.mark_step_started(1, "sess-editor-1", 1);
    index.mark_chain_completed(1, 0);
    index.save().unwrap();

    let writer: Step = step("writer").prompt("write prompt").into();
    let editor: Step = step("editor").prompt("edit prompt").into();
    let qa: Step = module("qa-loop", "qa").prompt("qa prompt").into();
    let filtered: Vec<(usize, &Step)> = vec![(0, &writer), (1, &editor), (2, &qa)];

    let active_loop = compute_loop_skip(&mut index, &filtered, 0, 2).unwrap();
    assert_eq!(active_loop.skip, HashSet::from(["editor:1".to_string()]));

    let record = index.state().completed_steps.get(&1).unwrap();
    assert_eq!(record.completed_chains, None);
}

// The FSM passes through `Awaiting` for the duration of any interactive step
// that waits on the user rather than the controller (spec §4.5).
#[tokio::test]
async fn fsm_reaches_awaiting_while_a_step_waits_on_the_user() {
    let (dir, adapter, engines, user, controller) = fixture();
    user.queue(prompt_outcome("go"));
    adapter.queue_success("sess-1");

    let template = WorkflowTemplate::builder("wf")
        .step(step("writer").prompt("write prompt"))
        .build()
        .unwrap();

    let mut runner = runner(template, &dir, engines, user, controller);
    let mut transitions = runner.test_subscribe_transitions();
    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    let mut saw_awaiting = false;
    while let Ok(transition) = transitions.try_recv() {
        if transition.to == WorkflowState::Awaiting {
            saw_awaiting = true;
        }
    }
    assert!(saw_awaiting, "expected the FSM to pass through Awaiting");
}
