// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Autonomous/paused mode tracking and the provider it currently routes
//! input through (spec §4.7).

use std::sync::Arc;

use crate::input::{InputProvider, InputSource};
use crate::signals::{SignalBus, WorkflowSignal};

/// Which provider is currently authoritative for `awaitInput` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveProvider {
    User,
    Controller,
}

impl From<ActiveProvider> for InputSource {
    fn from(value: ActiveProvider) -> Self {
        match value {
            ActiveProvider::User => InputSource::User,
            ActiveProvider::Controller => InputSource::Controller,
        }
    }
}

/// Tracks whether the workflow is running autonomously and/or paused, and
/// keeps the user/controller providers activated/deactivated in step.
pub struct WorkflowMode {
    auto_mode: bool,
    paused: bool,
    user_provider: Arc<dyn InputProvider>,
    controller_provider: Arc<dyn InputProvider>,
    signals: SignalBus,
}

impl WorkflowMode {
    pub fn new(
        auto_mode: bool,
        user_provider: Arc<dyn InputProvider>,
        controller_provider: Arc<dyn InputProvider>,
        signals: SignalBus,
    ) -> Self {
        Self {
            auto_mode,
            paused: false,
            user_provider,
            controller_provider,
            signals,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.auto_mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The provider that should currently receive `awaitInput` calls.
    /// Pausing always routes back to the user, regardless of auto mode.
    pub fn active_provider_kind(&self) -> ActiveProvider {
        if self.paused || !self.auto_mode {
            ActiveProvider::User
        } else {
            ActiveProvider::Controller
        }
    }

    pub fn active_provider(&self) -> Arc<dyn InputProvider> {
        match self.active_provider_kind() {
            ActiveProvider::User => self.user_provider.clone(),
            ActiveProvider::Controller => self.controller_provider.clone(),
        }
    }

    /// Flip autonomous mode on or off. A no-op if already in that mode.
    pub async fn set_auto_mode(&mut self, auto_mode: bool) {
        if auto_mode == self.auto_mode {
            return;
        }
        let outgoing = self.active_provider();
        self.auto_mode = auto_mode;
        if !self.paused {
            outgoing.deactivate().await;
            self.active_provider().activate().await;
        }
        self.signals.publish(WorkflowSignal::ModeChange { autonomous_mode: auto_mode });
    }

    /// Pause the workflow, forcing the user provider active until resumed.
    pub async fn pause(&mut self) {
        if self.paused {
            return;
        }
        let outgoing = self.active_provider();
        self.paused = true;
        outgoing.deactivate().await;
        self.active_provider().activate().await;
        self.signals.publish(WorkflowSignal::Pause);
    }

    /// Resume the workflow, returning to whatever mode was active before pausing.
    pub async fn resume(&mut self) {
        if !self.paused {
            return;
        }
        let outgoing = self.active_provider();
        self.paused = false;
        outgoing.deactivate().await;
        self.active_provider().activate().await;
        self.signals.publish(WorkflowSignal::ModeChange { autonomous_mode: self.auto_mode });
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
