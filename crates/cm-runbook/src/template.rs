// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `WorkflowTemplate` and its builder.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::step::Step;
use crate::validate::{validate_steps, RunbookError};

/// Workflow-level auto-mode policy (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomousMode {
    Never,
    Optional,
    Always,
}

impl Default for AutonomousMode {
    fn default() -> Self {
        AutonomousMode::Optional
    }
}

/// An ordered sequence of steps plus workflow-level flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub name: String,
    #[serde(default)]
    pub autonomous_mode: AutonomousMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub condition_groups: Vec<String>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub sub_agent_ids: Vec<String>,
}

impl WorkflowTemplate {
    pub fn builder(name: impl Into<String>) -> WorkflowTemplateBuilder {
        WorkflowTemplateBuilder::new(name)
    }

    /// All registered `agent_id`s across module steps. Not required to be unique.
    pub fn agent_ids(&self) -> HashSet<&str> {
        self.steps
            .iter()
            .filter_map(Step::as_module)
            .map(|m| m.agent_id.as_str())
            .collect()
    }

    pub fn filter_steps(
        &self,
        selected_track: Option<&str>,
        selected_conditions: &[String],
    ) -> Vec<(usize, &Step)> {
        crate::filter::filter_steps(&self.steps, selected_track, selected_conditions)
    }
}

/// Assembles a [`WorkflowTemplate`], validating trigger targets at `build()`.
pub struct WorkflowTemplateBuilder {
    name: String,
    autonomous_mode: AutonomousMode,
    controller: Option<String>,
    tracks: Vec<String>,
    condition_groups: Vec<String>,
    steps: Vec<Step>,
    sub_agent_ids: Vec<String>,
}

impl WorkflowTemplateBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            autonomous_mode: AutonomousMode::default(),
            controller: None,
            tracks: Vec::new(),
            condition_groups: Vec::new(),
            steps: Vec::new(),
            sub_agent_ids: Vec::new(),
        }
    }

    pub fn autonomous_mode(mut self, mode: AutonomousMode) -> Self {
        self.autonomous_mode = mode;
        self
    }

    pub fn controller(mut self, agent_id: impl Into<String>) -> Self {
        self.controller = Some(agent_id.into());
        self
    }

    pub fn tracks(mut self, tracks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tracks = tracks.into_iter().map(Into::into).collect();
        self
    }

    pub fn condition_groups(
        mut self,
        groups: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.condition_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = impl Into<Step>>) -> Self {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn step(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn sub_agent_ids(
        mut self,
        ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.sub_agent_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<WorkflowTemplate, RunbookError> {
        validate_steps(&self.steps)?;
        Ok(WorkflowTemplate {
            name: self.name,
            autonomous_mode: self.autonomous_mode,
            controller: self.controller,
            tracks: self.tracks,
            condition_groups: self.condition_groups,
            steps: self.steps,
            sub_agent_ids: self.sub_agent_ids,
        })
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
