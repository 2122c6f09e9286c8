// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cm-runbook: the workflow template data model and its builder surface.

mod filter;
mod step;
mod template;
mod validate;

pub use filter::filter_steps;
pub use step::{module, separator, step, ModuleRef, ModuleStep, PromptPath, SeparatorStep, Step};
pub use template::{AutonomousMode, WorkflowTemplate, WorkflowTemplateBuilder};
pub use validate::RunbookError;
