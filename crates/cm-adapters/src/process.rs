// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A generic, non-interactive subprocess-backed [`EngineAdapter`].
//!
//! This adapter knows nothing about any particular engine's argv shape; the
//! caller supplies a `command_builder` that resolves a prompt and run
//! options into the argv to execute.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::adapter::{EngineAdapter, EngineRunResult, OutputSink, RunOptions};
use crate::error::AdapterError;

/// Builds the argv to execute for a given prompt and run options.
pub type CommandBuilder = Arc<dyn Fn(&str, &RunOptions) -> Vec<String> + Send + Sync>;

pub struct ProcessEngineAdapter {
    engine_id: String,
    command_builder: CommandBuilder,
}

impl ProcessEngineAdapter {
    pub fn new(engine_id: impl Into<String>, command_builder: CommandBuilder) -> Self {
        Self {
            engine_id: engine_id.into(),
            command_builder,
        }
    }

    async fn stream_lines(
        mut reader: BufReader<impl tokio::io::AsyncRead + Unpin>,
        sink: OutputSink,
        tx: tokio::sync::mpsc::UnboundedSender<String>,
    ) {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = line.trim_end_matches('\n');
                    sink(trimmed);
                    let _ = tx.send(trimmed.to_string());
                }
                Err(_) => break,
            }
        }
    }
}

#[async_trait]
impl EngineAdapter for ProcessEngineAdapter {
    async fn run(&self, prompt: &str, options: RunOptions) -> Result<EngineRunResult, AdapterError> {
        let argv = (self.command_builder)(prompt, &options);
        let Some((program, args)) = argv.split_first() else {
            return Err(AdapterError::SpawnFailed(
                self.engine_id.clone(),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            ));
        };

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&options.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AdapterError::SpawnFailed(self.engine_id.clone(), e))?;

        let stdout = child.stdout.take().map(BufReader::new).ok_or_else(|| {
            AdapterError::SpawnFailed(
                self.engine_id.clone(),
                std::io::Error::other("child stdout pipe unavailable"),
            )
        })?;
        let stderr = child.stderr.take().map(BufReader::new).ok_or_else(|| {
            AdapterError::SpawnFailed(
                self.engine_id.clone(),
                std::io::Error::other("child stderr pipe unavailable"),
            )
        })?;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        let stdout_task = tokio::spawn(Self::stream_lines(
            stdout,
            options.on_stdout.clone(),
            tx.clone(),
        ));
        let stderr_task = tokio::spawn(Self::stream_lines(stderr, options.on_stderr.clone(), tx));

        let wait_result = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                None
            }
            result = tokio::time::timeout(options.timeout, child.wait()) => {
                match result {
                    Ok(status) => Some(status),
                    Err(_elapsed) => {
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        return Err(AdapterError::TimedOut(self.engine_id.clone(), options.timeout));
                    }
                }
            }
        };

        let _ = stdout_task.await;
        let _ = stderr_task.await;

        let Some(status) = wait_result else {
            return Err(AdapterError::Cancelled(self.engine_id.clone()));
        };
        let status = status.map_err(|e| AdapterError::SpawnFailed(self.engine_id.clone(), e))?;

        let mut last_line = None;
        while let Ok(line) = rx.try_recv() {
            last_line = Some(line);
        }

        let session_id = options
            .resume_session_id
            .clone()
            .or(last_line)
            .unwrap_or_default();

        Ok(EngineRunResult {
            exit_code: status.code(),
            session_id,
        })
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
