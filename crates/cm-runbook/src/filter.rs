// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Track / condition-gated step selection.

use crate::step::Step;

/// Select steps that participate given the active track and condition set.
///
/// - A step with a non-empty `tracks` list participates only when
///   `selected_track` is one of them.
/// - `conditions` is an AND-gate: all must be present in `selected_conditions`.
/// - `conditions_any` is an OR-gate: at least one must be present.
/// - Separators carry no state and are never filtered out.
pub fn filter_steps<'a>(
    steps: &'a [Step],
    selected_track: Option<&str>,
    selected_conditions: &[String],
) -> Vec<(usize, &'a Step)> {
    steps
        .iter()
        .enumerate()
        .filter(|(_, step)| match step.as_module() {
            None => true,
            Some(module) => {
                let track_ok = module.tracks.is_empty()
                    || selected_track
                        .map(|t| module.tracks.iter().any(|m| m == t))
                        .unwrap_or(false);
                let conditions_ok = module
                    .conditions
                    .iter()
                    .all(|c| selected_conditions.iter().any(|s| s == c));
                let conditions_any_ok = module.conditions_any.is_empty()
                    || module
                        .conditions_any
                        .iter()
                        .any(|c| selected_conditions.iter().any(|s| s == c));
                track_ok && conditions_ok && conditions_any_ok
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
