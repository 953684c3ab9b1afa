//! Toolchain variables handed to the build-system generator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value of a toolchain variable handed to the build-system generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolchainValue {
    /// Feature switch.
    Bool(bool),
    /// Literal string (tags, paths).
    Text(String),
}

impl ToolchainValue {
    /// Rendering for `-DKEY=VALUE` definitions and cache entries.
    pub fn as_definition(&self) -> String {
        match self {
            Self::Bool(true) => "ON".to_string(),
            Self::Bool(false) => "OFF".to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// CMake cache type for this value.
    pub fn cache_type(&self) -> &'static str {
        match self {
            Self::Bool(_) => "BOOL",
            Self::Text(_) => "STRING",
        }
    }
}

impl From<bool> for ToolchainValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for ToolchainValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Toolchain variables keyed by name, iterated in key order.
pub type ToolchainVariables = BTreeMap<String, ToolchainValue>;
