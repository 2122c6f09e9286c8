// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cm-adapters: the engine adapter contract, the auth cache, engine
//! selection, and a generic subprocess-backed adapter implementation.

mod adapter;
mod auth;
mod error;
mod process;
mod registry;

pub use adapter::{EngineAdapter, EngineAuthProbe, EngineRunResult, OutputSink, RunOptions};
pub use auth::AuthCache;
pub use error::AdapterError;
pub use process::ProcessEngineAdapter;
pub use registry::{select_engine, EngineRegistration, EngineRegistry};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{EngineCall, FakeEngineAdapter};
