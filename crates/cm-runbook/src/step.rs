// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two step variants, and the `step()` / `module()` / `separator()` builders.

use cm_core::StepBehavior;
use serde::{Deserialize, Serialize};

/// A step's prompt: either a single prompt or a chain of prompts delivered
/// to the same session in sequence (spec §3, §4.9's autonomous mode handler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptPath {
    Single(String),
    Chained(Vec<String>),
}

impl PromptPath {
    pub fn is_chained(&self) -> bool {
        matches!(self, PromptPath::Chained(v) if v.len() > 1)
    }

    pub fn as_slice(&self) -> &[String] {
        match self {
            PromptPath::Single(s) => std::slice::from_ref(s),
            PromptPath::Chained(v) => v,
        }
    }
}

impl From<&str> for PromptPath {
    fn from(s: &str) -> Self {
        PromptPath::Single(s.to_string())
    }
}

impl From<String> for PromptPath {
    fn from(s: String) -> Self {
        PromptPath::Single(s)
    }
}

impl From<Vec<String>> for PromptPath {
    fn from(v: Vec<String>) -> Self {
        PromptPath::Chained(v)
    }
}

/// Reference to a registered module, carrying its optional behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<StepBehavior>,
}

/// A module step: launches one engine subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStep {
    pub agent_id: String,
    pub agent_name: String,
    pub prompt_path: PromptPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_reasoning_effort: Option<String>,
    #[serde(default)]
    pub execute_once: bool,
    /// `None` is the "unset" tri-state from spec §4.8, defaulted by the
    /// scenario resolver to `has_chained_prompts`.
    #[serde(default)]
    pub interactive: Option<bool>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub conditions_any: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleRef>,
}

impl ModuleStep {
    fn new(agent_id: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        Self {
            agent_name: agent_id.clone(),
            agent_id,
            prompt_path: PromptPath::Single(String::new()),
            engine: None,
            model: None,
            model_reasoning_effort: None,
            execute_once: false,
            interactive: None,
            tracks: Vec::new(),
            conditions: Vec::new(),
            conditions_any: Vec::new(),
            module: None,
        }
    }

    pub fn agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = name.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<PromptPath>) -> Self {
        self.prompt_path = prompt.into();
        self
    }

    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn model_reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.model_reasoning_effort = Some(effort.into());
        self
    }

    pub fn execute_once(mut self, v: bool) -> Self {
        self.execute_once = v;
        self
    }

    pub fn interactive(mut self, v: bool) -> Self {
        self.interactive = Some(v);
        self
    }

    pub fn tracks(mut self, tracks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tracks = tracks.into_iter().map(Into::into).collect();
        self
    }

    pub fn conditions(mut self, conditions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.conditions = conditions.into_iter().map(Into::into).collect();
        self
    }

    pub fn conditions_any(
        mut self,
        conditions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.conditions_any = conditions.into_iter().map(Into::into).collect();
        self
    }

    pub fn behavior(mut self, module_id: impl Into<String>, behavior: StepBehavior) -> Self {
        self.module = Some(ModuleRef {
            id: module_id.into(),
            behavior: Some(behavior),
        });
        self
    }

    /// Whether the step has more than one prompt chained under one session.
    pub fn has_chained_prompts(&self) -> bool {
        self.prompt_path.is_chained()
    }

    /// The `"<agentId>:<stepIndex>"` identity used for UI and telemetry (spec §3).
    pub fn unique_agent_id(&self, step_index: usize) -> String {
        format!("{}:{}", self.agent_id, step_index)
    }
}

/// A non-executable separator. Carries no state and is never skipped or filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparatorStep {
    pub text: String,
}

/// A workflow step: either an executable module step or an inert separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Module(ModuleStep),
    Separator(SeparatorStep),
}

impl Step {
    pub fn as_module(&self) -> Option<&ModuleStep> {
        match self {
            Step::Module(m) => Some(m),
            Step::Separator(_) => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Step::Separator(_))
    }
}

impl From<ModuleStep> for Step {
    fn from(m: ModuleStep) -> Self {
        Step::Module(m)
    }
}

/// Build a module step referencing a registered agent id.
pub fn step(agent_id: impl Into<String>) -> ModuleStep {
    ModuleStep::new(agent_id)
}

/// Build a module step referencing a module (modules carry a `behavior`).
pub fn module(module_id: impl Into<String>, agent_id: impl Into<String>) -> ModuleStep {
    let module_id = module_id.into();
    ModuleStep::new(agent_id).behavior_ref(module_id)
}

impl ModuleStep {
    fn behavior_ref(mut self, module_id: String) -> Self {
        self.module = Some(ModuleRef {
            id: module_id,
            behavior: None,
        });
        self
    }
}

/// Build a non-executable separator.
pub fn separator(text: impl Into<String>) -> Step {
    Step::Separator(SeparatorStep { text: text.into() })
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
