// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-step persisted progress, and the four resume outcomes derived from it.

use serde::{Deserialize, Serialize};

/// Persisted progress for a single step index.
///
/// Presence of `completed_at` marks the step fully done. `completed_at` is
/// authoritative: once set, `completed_chains` is ignored by every reader
/// (see DESIGN.md's Open Question decision — the source's handling of the
/// two together was inconsistent, so this implementation does not guess).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTrackingRecord {
    /// Whether this step has ever been started, independent of whether the
    /// engine has returned a session id yet — a step that crashes before its
    /// adapter call returns still has `started = true` with an empty
    /// `session_id`, and must still be detected as a crash to resume.
    #[serde(default)]
    pub started: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    #[serde(default)]
    pub monitoring_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_chains: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl StepTrackingRecord {
    pub fn started(session_id: impl Into<String>, monitoring_id: u64) -> Self {
        Self {
            started: true,
            session_id: session_id.into(),
            monitoring_id,
            completed_chains: None,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn mark_chain_completed(&mut self, chain_index: u32) {
        let chains = self.completed_chains.get_or_insert_with(Vec::new);
        if !chains.contains(&chain_index) {
            chains.push(chain_index);
        }
    }

    pub fn mark_completed(&mut self, at: impl Into<String>) {
        self.completed_at = Some(at.into());
    }

    /// Whether this record has chain progress but is not yet fully completed.
    ///
    /// Once `completed_at` is set, any leftover `completed_chains` is spec'd
    /// as stale bookkeeping and must not be read as "still resuming a chain".
    pub fn has_incomplete_chain_progress(&self) -> bool {
        self.completed_chains.is_some() && self.completed_at.is_none()
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Record the engine-assigned session id once the adapter returns it,
    /// without disturbing `started`/`monitoring_id`/completion state.
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = session_id.into();
    }
}

/// The four outcomes of `StepIndexManager::resume_info()` (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeInfo {
    /// No tracking file, or `resume_from_last_step` is false.
    StartFresh,
    /// A step has `completed_chains` set but no `completed_at`.
    ResumeFromChain { index: usize, chain_index: u32 },
    /// The highest-numbered started step lacks `completed_at`.
    ResumeFromCrash { index: usize },
    /// All started steps are complete; continue past the highest.
    ContinueAfterCompleted { index: usize },
}

impl ResumeInfo {
    /// The step index execution should (re)start at.
    pub fn start_index(&self) -> usize {
        match self {
            ResumeInfo::StartFresh => 0,
            ResumeInfo::ResumeFromChain { index, .. } => *index,
            ResumeInfo::ResumeFromCrash { index } => *index,
            ResumeInfo::ContinueAfterCompleted { index } => *index,
        }
    }
}

#[cfg(test)]
#[path = "tracking_tests.rs"]
mod tests;
