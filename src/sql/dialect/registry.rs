//! Process-wide dialect registry.
//!
//! Populated lazily on first access, keyed by dialect name. The compiler
//! must not depend on module initialization order, so registration is a
//! single explicit routine rather than scattered side effects.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::error::{CompileError, CompileResult};

use super::{Dialect, SqlDialect};

static REGISTRY: Lazy<BTreeMap<&'static str, Dialect>> = Lazy::new(|| {
    let mut dialects = BTreeMap::new();
    for dialect in Dialect::ALL {
        dialects.insert(dialect.name(), dialect);
    }
    dialects
});

/// Look up a dialect by its registry key.
pub fn get(name: &str) -> CompileResult<Dialect> {
    REGISTRY
        .get(name)
        .copied()
        .ok_or_else(|| CompileError::UnsupportedDialect {
            name: name.to_string(),
            available: available().iter().map(|s| s.to_string()).collect(),
        })
}

/// Registered dialect names, sorted.
pub fn available() -> Vec<&'static str> {
    REGISTRY.keys().copied().collect()
}
