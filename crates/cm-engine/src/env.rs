// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accessors for the `CODEMACHINE_*` environment variables the core recognizes.

use std::env;
use std::path::PathBuf;

pub fn cwd() -> Option<PathBuf> {
    env::var_os("CODEMACHINE_CWD").map(PathBuf::from)
}

pub fn package_root() -> Option<PathBuf> {
    env::var_os("CODEMACHINE_PACKAGE_ROOT").map(PathBuf::from)
}

pub fn install_dir() -> Option<PathBuf> {
    env::var_os("CODEMACHINE_INSTALL_DIR").map(PathBuf::from)
}

pub fn skip_mistral() -> bool {
    is_truthy("CODEMACHINE_SKIP_MISTRAL")
}

pub fn debug_triggers() -> bool {
    is_truthy("CODEMACHINE_DEBUG_TRIGGERS")
}

/// Per-engine home directory override, e.g. `engine_home_dir("claude")`
/// reads `CODEMACHINE_CLAUDE_HOME`.
pub fn engine_home_dir(engine_id: &str) -> Option<PathBuf> {
    let key = format!("CODEMACHINE_{}_HOME", engine_id.to_uppercase());
    env::var_os(key).map(PathBuf::from)
}

fn is_truthy(key: &str) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "TRUE" | "yes"),
        Err(_) => false,
    }
}
