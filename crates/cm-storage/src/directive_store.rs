// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single-file directive store at `<cwd>/.codemachine/memory/directive.json`.

use std::path::{Path, PathBuf};

use cm_core::Directive;

use crate::atomic::write_json_atomically;
use crate::error::StorageError;

pub struct DirectiveStore {
    path: PathBuf,
}

impl DirectiveStore {
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            path: cwd.as_ref().join(".codemachine").join("memory").join("directive.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the most recent directive. A missing file reads as `continue`;
    /// a malformed file reads as `continue` with a logged parse failure —
    /// the orchestrator never surfaces a read failure to its caller.
    pub fn read(&self) -> Directive {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Directive::continue_(),
        };

        match serde_json::from_str(&contents) {
            Ok(directive) => directive,
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "malformed directive file, treating as continue");
                Directive::continue_()
            }
        }
    }

    /// Write an agent-issued directive. Exposed for agents and for tests that
    /// simulate one; the runner's own write path is [`Self::reset_to_continue`].
    pub fn write(&self, directive: &Directive) -> Result<(), StorageError> {
        write_json_atomically(&self.path, directive)
    }

    /// The runner's only write path: clear the store back to `continue` on
    /// the user's "advance" keypress.
    pub fn reset_to_continue(&self) -> Result<(), StorageError> {
        self.write(&Directive::continue_())
    }
}

#[cfg(test)]
#[path = "directive_store_tests.rs"]
mod tests;
