//! Pinned requirements and the options that activate them.

use serde::{Deserialize, Serialize};

use crate::options::OptionSet;
use crate::types::{PackageName, Reference};

/// When a requirement is part of the resolved list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Always required.
    #[default]
    Always,
    /// Required only while the named option is truthy.
    WhenEnabled(String),
}

impl Activation {
    /// Evaluate the predicate against the current option values.
    pub fn is_active(&self, options: &OptionSet) -> bool {
        match self {
            Self::Always => true,
            Self::WhenEnabled(key) => options.is_enabled(key),
        }
    }
}

/// A declared dependency on another package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Pinned target.
    pub reference: Reference,
    /// Activation predicate.
    #[serde(default)]
    pub activation: Activation,
}

impl Requirement {
    /// An unconditional requirement.
    pub fn always(reference: Reference) -> Self {
        Self {
            reference,
            activation: Activation::Always,
        }
    }

    /// A requirement gated on an option.
    pub fn when_enabled(reference: Reference, option: &str) -> Self {
        Self {
            reference,
            activation: Activation::WhenEnabled(option.to_string()),
        }
    }

    /// Target package name.
    pub fn name(&self) -> &PackageName {
        &self.reference.name
    }

    /// The `pkg::pkg` alias components use to link this requirement.
    pub fn alias(&self) -> String {
        self.reference.name.alias()
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation() {
        let req = Requirement::when_enabled(Reference::new("gtest", "1.0"), "build_tests");
        assert!(!req.activation.is_active(&OptionSet::new()));
        assert!(
            req.activation
                .is_active(&OptionSet::from([("build_tests", true)]))
        );
        assert!(Activation::Always.is_active(&OptionSet::new()));
    }
}
