// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves the `(interactive, autoMode, hasChainedPrompts)` triple into one
//! of the eight canonical scenarios and the mode handler it selects (spec §4.8).

/// Which mode handler a resolved scenario dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Interactive,
    Autonomous,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub number: u8,
    pub should_wait: bool,
    pub autonomous_loop: bool,
    pub forced: bool,
}

impl Scenario {
    pub fn handler_kind(&self) -> HandlerKind {
        match self.number {
            5 => HandlerKind::Autonomous,
            6 => HandlerKind::Continuous,
            _ => HandlerKind::Interactive,
        }
    }
}

/// Resolve the eight-row scenario table verbatim. `interactive` being
/// `None` defaults to `has_chained_prompts` (interactive iff there are
/// prompts to iterate).
pub fn resolve_scenario(
    interactive: Option<bool>,
    auto_mode: bool,
    has_chained_prompts: bool,
) -> Scenario {
    let interactive = interactive.unwrap_or(has_chained_prompts);

    let (number, should_wait, autonomous_loop, forced) =
        match (interactive, auto_mode, has_chained_prompts) {
            (true, true, true) => (1, true, false, false),
            (true, true, false) => (2, true, false, false),
            (true, false, true) => (3, true, false, false),
            (true, false, false) => (4, true, false, false),
            (false, true, true) => (5, false, true, false),
            (false, true, false) => (6, false, false, false),
            (false, false, true) => (7, true, false, true),
            (false, false, false) => (8, true, false, true),
        };

    if forced {
        tracing::warn!(
            auto_mode,
            has_chained_prompts,
            scenario = number,
            "non-interactive step has no controller driver, forcing interactive mode"
        );
    }

    Scenario {
        number,
        should_wait,
        autonomous_loop,
        forced,
    }
}

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod tests;
