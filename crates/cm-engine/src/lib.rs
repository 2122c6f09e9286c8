// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cm-engine: the workflow state machine, scenario resolver, mode handlers,
//! directive evaluators, and the top-level runner that ties every control
//! plane together (spec §4.5-§4.11).

pub mod env;
mod error;
mod evaluators;
mod handlers;
mod input;
mod mode;
mod runner;
mod scenario;
mod session;
mod signals;
mod state_machine;

pub use error::{ExitCode, RuntimeError};
pub use evaluators::{evaluate_directives, Decision, LoopState};
pub use handlers::{
    AutonomousModeHandler, ContinuousModeHandler, InteractiveModeHandler, ModeHandler, ModeHandlerResult,
    StepRunContext,
};
pub use input::{
    ControllerInputProvider, InputOutcome, InputProvider, InputSource, ModeSwitchTarget, StepContext,
    UserInputProvider, SWITCH_TO_AUTO, SWITCH_TO_MANUAL,
};
pub use mode::{ActiveProvider, WorkflowMode};
pub use runner::{EngineBindings, RunOutcome, WorkflowRunner};
pub use scenario::{resolve_scenario, HandlerKind, Scenario};
pub use session::StepSession;
pub use signals::{SignalBus, WorkflowSignal};
pub use state_machine::{InvalidTransition, Transition, WorkflowEvent, WorkflowState, WorkflowStateMachine};

#[cfg(any(test, feature = "test-support"))]
pub use input::FakeInputProvider;
