//! Concrete recipe declarations.
//!
//! A [`RecipeDefinition`] is read from `recipe.toml` in the recipe folder
//! when present; otherwise the built-in `cppql` definition is used.

use std::path::Path;

use recipe_schema::{OptionDomains, OptionSet, Reference};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::Result;

const BUILTIN_CPPQL: &str = include_str!("../templates/cppql.toml");

/// File name looked up in a recipe folder.
pub const DEFINITION_FILE: &str = "recipe.toml";

/// Schema generation of the published package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageLayout {
    /// A single component exporting one library.
    #[default]
    Flat,
    /// A `core` component plus a `typed` layer on top of it.
    Layered,
}

/// Package identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Package name.
    pub name: String,
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Project URL.
    #[serde(default)]
    pub url: String,
    /// Default user qualifier.
    pub user: String,
    /// Fixed channel; `v{version}` when unset.
    #[serde(default)]
    pub channel: Option<String>,
}

/// Where the version string is defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSource {
    /// Build-variable definition file, relative to the recipe folder.
    pub file: String,
    /// Variable assigned the version.
    pub variable: String,
}

/// One entry of the toolchain activation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainFlag {
    /// Option whose truthiness activates the variable.
    pub option: String,
    /// Variable suffix; the option's upper-snake-case key when unset.
    #[serde(default)]
    pub identifier: Option<String>,
}

impl ToolchainFlag {
    /// The identifier joined after the prefix.
    pub fn identifier(&self) -> String {
        self.identifier
            .clone()
            .unwrap_or_else(|| upper_snake_case(&self.option))
    }
}

/// `shutdownDefaultOff` and `shutdown_default_off` both become
/// `SHUTDOWN_DEFAULT_OFF`; a run of capitals stays one word.
fn upper_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev: Option<char> = None;
    for c in key.chars() {
        if c == '-' || c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        } else {
            if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.extend(c.to_uppercase());
        }
        prev = Some(c);
    }
    out
}

/// Toolchain variable naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainSpec {
    /// Prefix joined to every identifier with `_`.
    pub prefix: String,
    /// Activation set, in emission order.
    #[serde(default)]
    pub flags: Vec<ToolchainFlag>,
}

/// The recipe's pinned requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinnedRequirements {
    /// Runtime library (always required).
    pub runtime: Reference,
    /// Utility library (always required).
    pub utility: Reference,
    /// Test framework, required when `build_tests` is on.
    pub test: Reference,
    /// Documentation generator, required when `build_manual` is on.
    pub manual: Reference,
}

/// Manual settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualSpec {
    /// Repository holding the manual sources.
    pub repository: String,
}

/// Library names per layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Libraries {
    /// Library of the flat layout.
    pub flat: String,
    /// Core library of the layered layout.
    pub core: String,
    /// Typed-layer library of the layered layout.
    pub typed: String,
}

/// Everything a concrete recipe declares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDefinition {
    /// Identity.
    pub package: Identity,
    /// Version artifact.
    pub version: VersionSource,
    /// Recipe-declared option domains.
    #[serde(default)]
    pub options: OptionDomains,
    /// Recipe-declared defaults; these are never inherited from the template.
    #[serde(default)]
    pub default_options: OptionSet,
    /// Toolchain naming and activation set.
    pub toolchain: ToolchainSpec,
    /// Pinned requirements.
    pub requirements: PinnedRequirements,
    /// Manual settings.
    pub manual: ManualSpec,
    /// Published layout, fixed at construction.
    #[serde(default)]
    pub layout: PackageLayout,
    /// Library names.
    pub libraries: Libraries,
    /// Glob patterns copied by `export_sources`.
    #[serde(default)]
    pub exports: Vec<String>,
}

impl RecipeDefinition {
    /// The built-in `cppql` definition.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Configuration` if the embedded document is invalid.
    pub fn cppql() -> Result<Self> {
        Self::parse(BUILTIN_CPPQL)
    }

    /// Load `recipe.toml` from `recipe_folder`, falling back to the built-in
    /// definition when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Io` or `RecipeError::Configuration` if the file
    /// exists but cannot be read or parsed.
    pub fn discover(recipe_folder: &Path) -> Result<Self> {
        let path = recipe_folder.join(DEFINITION_FILE);
        if path.exists() {
            tracing::debug!("Loading recipe definition from {}", path.display());
            Self::parse(&std::fs::read_to_string(&path)?)
        } else {
            Self::cppql()
        }
    }

    /// Parse and validate a definition from TOML.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Configuration` on malformed TOML or defaults
    /// that are undeclared or outside their domain.
    pub fn parse(content: &str) -> Result<Self> {
        let definition: Self = toml::from_str(content)?;
        config::check_declared(&definition.options, &definition.default_options)?;
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_schema::OptionValue;

    #[test]
    fn test_builtin_cppql() {
        let def = RecipeDefinition::cppql().unwrap();
        assert_eq!(def.package.name, "cppql");
        assert_eq!(def.version.variable, "CPPQL_VERSION");
        assert_eq!(def.layout, PackageLayout::Flat);
        assert_eq!(
            def.default_options.get("zero_based_indices"),
            Some(&OptionValue::Bool(true))
        );
        assert_eq!(
            def.requirements.utility.to_string(),
            "common/1.0.0@timzoet/v1.0.0"
        );
        assert_eq!(def.exports.len(), 6);
    }

    #[test]
    fn test_flag_identifier_defaults_to_upper_snake() {
        let def = RecipeDefinition::cppql().unwrap();
        let ids: Vec<String> = def
            .toolchain
            .flags
            .iter()
            .map(ToolchainFlag::identifier)
            .collect();
        assert_eq!(ids, vec!["BIND_ZERO_BASED_INDICES", "SHUTDOWN_DEFAULT_OFF"]);
    }

    #[test]
    fn test_upper_snake_case() {
        assert_eq!(upper_snake_case("shutdown_default_off"), "SHUTDOWN_DEFAULT_OFF");
        assert_eq!(upper_snake_case("shutdownDefaultOff"), "SHUTDOWN_DEFAULT_OFF");
        assert_eq!(upper_snake_case("fPIC"), "F_PIC");
        assert_eq!(upper_snake_case("build-manual"), "BUILD_MANUAL");
    }

    #[test]
    fn test_discover_prefers_recipe_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = BUILTIN_CPPQL.replace("layout = \"flat\"", "layout = \"layered\"");
        std::fs::write(dir.path().join(DEFINITION_FILE), doc).unwrap();

        let def = RecipeDefinition::discover(dir.path()).unwrap();
        assert_eq!(def.layout, PackageLayout::Layered);

        let empty = tempfile::tempdir().unwrap();
        let def = RecipeDefinition::discover(empty.path()).unwrap();
        assert_eq!(def.layout, PackageLayout::Flat);
    }

    #[test]
    fn test_default_outside_domain_rejected() {
        let doc = BUILTIN_CPPQL.replace("shutdown_default_off = false", "shutdown_default_off = \"sometimes\"");
        assert!(RecipeDefinition::parse(&doc).is_err());
    }
}
