// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The template tracking file: `<cmRoot>/template.json`. `StepIndexManager`
//! is the only type permitted to write it — single-writer discipline
//! enforced by construction, no public field access.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cm_core::{ResumeInfo, StepTrackingRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::atomic::write_json_atomically;
use crate::error::StorageError;

pub fn chrono_now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    pub agent_id: String,
    pub session_id: String,
    pub monitoring_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTrackingFile {
    #[serde(default)]
    pub active_template: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub completed_steps: BTreeMap<usize, StepTrackingRecord>,
    #[serde(default)]
    pub not_completed_steps: Vec<usize>,
    #[serde(default)]
    pub resume_from_last_step: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_conditions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_config: Option<ControllerConfig>,
}

impl Default for TemplateTrackingFile {
    fn default() -> Self {
        Self {
            active_template: String::new(),
            last_updated: String::new(),
            completed_steps: BTreeMap::new(),
            not_completed_steps: Vec::new(),
            resume_from_last_step: true,
            selected_track: None,
            selected_conditions: None,
            project_name: None,
            autonomous_mode: None,
            controller_config: None,
        }
    }
}

/// Owns `<cmRoot>/template.json`. Construct with [`StepIndexManager::load`];
/// every mutating method stages an in-memory change that [`Self::save`]
/// persists atomically, refreshing `last_updated`.
pub struct StepIndexManager {
    path: PathBuf,
    state: TemplateTrackingFile,
    now: Arc<dyn Fn() -> String + Send + Sync>,
}

impl StepIndexManager {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::load_with_clock(path, Arc::new(chrono_now_iso))
    }

    pub fn load_with_clock(
        path: impl Into<PathBuf>,
        now: Arc<dyn Fn() -> String + Send + Sync>,
    ) -> Result<Self, StorageError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => parse_tracking_file(&path, &contents, &now)?,
            Err(_) => TemplateTrackingFile::default(),
        };
        Ok(Self { path, state, now })
    }

    pub fn save(&mut self) -> Result<(), StorageError> {
        self.state.last_updated = (self.now)();
        write_json_atomically(&self.path, &self.state)
    }

    pub fn is_step_completed(&self, index: usize) -> bool {
        self.state
            .completed_steps
            .get(&index)
            .is_some_and(StepTrackingRecord::is_completed)
    }

    pub fn mark_step_started(&mut self, index: usize, session_id: impl Into<String>, monitoring_id: u64) {
        self.state
            .completed_steps
            .insert(index, StepTrackingRecord::started(session_id, monitoring_id));
        self.state.not_completed_steps.retain(|i| *i != index);
    }

    /// Persist the engine-assigned session id once the adapter returns it
    /// (spec §9 "the orchestrator must persist it verbatim"), so a later
    /// crash resumes the same engine session rather than starting fresh.
    /// Callers are responsible for calling [`Self::save`] afterward.
    pub fn record_session_id(&mut self, index: usize, session_id: impl Into<String>) {
        self.state
            .completed_steps
            .entry(index)
            .or_default()
            .set_session_id(session_id);
    }

    pub fn mark_chain_completed(&mut self, index: usize, chain_index: u32) {
        self.state
            .completed_steps
            .entry(index)
            .or_default()
            .mark_chain_completed(chain_index);
    }

    /// Drop a step's recorded chain progress without touching its session id
    /// or completion timestamp, for steps a loop rewind has skipped over.
    pub fn clear_chain_progress(&mut self, index: usize) {
        if let Some(record) = self.state.completed_steps.get_mut(&index) {
            record.completed_chains = None;
        }
    }

    pub fn mark_step_completed(&mut self, index: usize) {
        let at = (self.now)();
        self.state
            .completed_steps
            .entry(index)
            .or_default()
            .mark_completed(at);
    }

    pub fn selected_track(&self) -> Option<&str> {
        self.state.selected_track.as_deref()
    }

    pub fn state(&self) -> &TemplateTrackingFile {
        &self.state
    }

    /// Replace the in-memory state wholesale (e.g. to set `active_template`,
    /// `selected_track`, or `resume_from_last_step` before the first save).
    pub fn set_state(&mut self, f: impl FnOnce(&mut TemplateTrackingFile)) {
        f(&mut self.state);
    }

    /// The four-branch resume algorithm of spec.md §4.4.
    pub fn resume_info(&self) -> ResumeInfo {
        if !self.state.resume_from_last_step || self.state.completed_steps.is_empty() {
            return ResumeInfo::StartFresh;
        }

        for (index, record) in &self.state.completed_steps {
            if record.has_incomplete_chain_progress() {
                let chain_index = record
                    .completed_chains
                    .as_ref()
                    .and_then(|chains| chains.iter().max().copied())
                    .unwrap_or(0);
                return ResumeInfo::ResumeFromChain {
                    index: *index,
                    chain_index,
                };
            }
        }

        if let Some((&highest, record)) = self
            .state
            .completed_steps
            .iter()
            .filter(|(_, r)| r.has_started())
            .max_by_key(|(index, _)| **index)
        {
            if !record.is_completed() {
                return ResumeInfo::ResumeFromCrash { index: highest };
            }
        }

        let highest_completed = self
            .state
            .completed_steps
            .iter()
            .filter(|(_, r)| r.is_completed())
            .map(|(index, _)| *index)
            .max();

        match highest_completed {
            Some(index) => ResumeInfo::ContinueAfterCompleted { index: index + 1 },
            None => ResumeInfo::StartFresh,
        }
    }
}

/// Parse the tracking file, migrating the old `completedSteps: [int]` format
/// (a plain sequence of indices) into the current per-index record map.
fn parse_tracking_file(
    path: &Path,
    contents: &str,
    now: &Arc<dyn Fn() -> String + Send + Sync>,
) -> Result<TemplateTrackingFile, StorageError> {
    let mut value: Value = serde_json::from_str(contents).map_err(|e| StorageError::IndexCorruption {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if let Some(Value::Array(legacy)) = value.get("completedSteps").cloned() {
        let at = now();
        let mut migrated = serde_json::Map::new();
        for entry in legacy {
            if let Some(index) = entry.as_u64() {
                let record = StepTrackingRecord {
                    started: true,
                    session_id: String::new(),
                    monitoring_id: 0,
                    completed_chains: None,
                    completed_at: Some(at.clone()),
                };
                migrated.insert(
                    index.to_string(),
                    serde_json::to_value(record).map_err(|e| StorageError::IndexCorruption {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?,
                );
            }
        }
        value["completedSteps"] = Value::Object(migrated);
        tracing::info!(path = %path.display(), "migrated legacy completedSteps array to per-index records");
    }

    serde_json::from_value(value).map_err(|e| StorageError::IndexCorruption {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "step_index_tests.rs"]
mod tests;
