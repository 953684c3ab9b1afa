//! Error taxonomy for recipe evaluation.
//!
//! Every error aborts the current invocation. Resolution is a pure function
//! of the recipe inputs, so nothing here is retried.

use recipe_schema::SchemaError;
use thiserror::Error;

/// Errors raised by any hook or lifecycle stage.
#[derive(Error, Debug)]
pub enum RecipeError {
    /// The version variable is missing or malformed in its artifact.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Options or components are in an invalid or contradictory state.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A requirement collides with another or cannot be expressed.
    #[error("Dependency error: {0}")]
    Dependency(String),

    /// A hook or lifecycle stage was invoked out of order.
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// An external build step failed.
    #[error("{step} failed: {message}")]
    Build {
        /// Step that failed (`configure`, `build`, `install`).
        step: &'static str,
        /// Collaborator-provided detail.
        message: String,
    },

    /// An I/O error occurred while reading or writing recipe files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecipeError {
    /// Wrap a failed external step.
    pub fn build(step: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Build {
            step,
            message: msg.to_string(),
        }
    }
}

impl From<SchemaError> for RecipeError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::InvalidReference(_) => Self::Dependency(err.to_string()),
            _ => Self::Configuration(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for RecipeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for RecipeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = RecipeError> = std::result::Result<T, E>;
