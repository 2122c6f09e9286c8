// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ordered registry of installed engines and the engine-selection algorithm.

use crate::error::AdapterError;

/// One installed engine, in the order it should be tried.
#[derive(Debug, Clone)]
pub struct EngineRegistration {
    pub id: String,
    pub is_default: bool,
}

impl EngineRegistration {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_default: false,
        }
    }

    pub fn default_engine(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_default: true,
        }
    }
}

/// The ordered list of installed engines with a declared default.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    engines: Vec<EngineRegistration>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, engine: EngineRegistration) -> Self {
        self.engines.push(engine);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineRegistration> {
        self.engines.iter()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.engines.iter().any(|e| e.id == id)
    }

    fn default_id(&self) -> Option<&str> {
        self.engines
            .iter()
            .find(|e| e.is_default)
            .or_else(|| self.engines.first())
            .map(|e| e.id.as_str())
    }
}

/// Select which engine a step should run against.
///
/// 1. If `step_override` is set and authenticated, use it.
/// 2. Else iterate registered engines in declared order, pick the first authenticated.
/// 3. Else fall back to the registry's declared default even if unauthenticated.
/// 4. If the registry is empty, fail.
pub async fn select_engine<F, Fut>(
    step_override: Option<&str>,
    registry: &EngineRegistry,
    mut is_authenticated: F,
) -> Result<String, AdapterError>
where
    F: FnMut(&str) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    if registry.is_empty() {
        return Err(AdapterError::NoEnginesRegistered);
    }

    if let Some(preferred) = step_override {
        if registry.contains(preferred) && is_authenticated(preferred).await {
            return Ok(preferred.to_string());
        }
        tracing::warn!(engine = preferred, "step engine override unauthenticated or unregistered, falling back");
    }

    for engine in registry.iter() {
        if is_authenticated(&engine.id).await {
            return Ok(engine.id.clone());
        }
    }

    registry
        .default_id()
        .map(|id| id.to_string())
        .ok_or(AdapterError::NoEnginesRegistered)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
