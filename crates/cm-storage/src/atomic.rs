// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-to-temp-then-rename persistence, shared by the directive store and
//! the step index manager. Small JSON blobs, synchronous, no compression —
//! simpler than a full state-snapshot checkpointer because these files are
//! a few kilobytes at most.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::StorageError;

pub fn write_json_atomically<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp_path = path.with_extension("tmp");
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::IndexCorruption {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    {
        let mut file = File::create(&tmp_path).map_err(|source| StorageError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        file.write_all(&bytes).map_err(|source| StorageError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        file.sync_all().map_err(|source| StorageError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    }

    std::fs::rename(&tmp_path, path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
