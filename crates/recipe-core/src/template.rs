//! Base templates: shared settings, options and generators a recipe extends.
//!
//! A template is held by reference and merged into the recipe; it never
//! acts as a superclass. Recipe-declared values win on key conflicts.

use std::path::Path;

use recipe_schema::{OptionDomains, OptionSet, PackageName, Reference, Requirement, Settings, Version};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{RecipeError, Result};

const BUILTIN_TEMPLATE: &str = include_str!("../templates/base.toml");

/// A shared configuration contributor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseTemplate {
    /// Template name.
    pub name: String,
    /// Template revision.
    pub version: Version,
    /// Setting names the host must provide.
    #[serde(default)]
    pub settings: Vec<String>,
    /// Generator identifiers run during `generate`.
    #[serde(default)]
    pub generators: Vec<String>,
    /// Native build-system generator (e.g. `Ninja`).
    #[serde(default)]
    pub cmake_generator: Option<String>,
    /// Package whose `pkg::pkg` alias every component may link.
    #[serde(default)]
    pub module_aggregate: Option<PackageName>,
    /// Requirements emitted ahead of the recipe's own.
    #[serde(default)]
    pub requirements: Vec<Reference>,
    /// Option domains contributed to every recipe.
    #[serde(default)]
    pub options: OptionDomains,
    /// Defaults for [`Self::options`].
    #[serde(default)]
    pub default_options: OptionSet,
    /// Setting values used when the host leaves them unset.
    #[serde(default)]
    pub settings_defaults: Settings,
}

impl BaseTemplate {
    /// The template shipped with this crate.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Configuration` if the embedded document is invalid.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_TEMPLATE)
    }

    /// Load a template from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Io` if the file cannot be read, or
    /// `RecipeError::Configuration` if it is not a valid template.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a template from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Configuration` on malformed TOML, defaults that
    /// are undeclared or outside their domain, or a module aggregate that is
    /// not among the template's requirements.
    pub fn parse(content: &str) -> Result<Self> {
        let template: Self = toml::from_str(content)?;
        template.validate()?;
        Ok(template)
    }

    fn validate(&self) -> Result<()> {
        config::check_declared(&self.options, &self.default_options)?;
        if let Some(aggregate) = &self.module_aggregate {
            if !self.requirements.iter().any(|r| &r.name == aggregate) {
                return Err(RecipeError::Configuration(format!(
                    "module aggregate '{aggregate}' is not a requirement of template '{}'",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Template requirements, all unconditional, in declaration order.
    pub fn base_requirements(&self) -> Vec<Requirement> {
        self.requirements
            .iter()
            .cloned()
            .map(Requirement::always)
            .collect()
    }

    /// Link alias of the module aggregate, if the template declares one.
    pub fn module_alias(&self) -> Option<String> {
        self.module_aggregate.as_ref().map(PackageName::alias)
    }

    /// Merge the template's options under the recipe's declarations.
    ///
    /// Returns the merged domains and merged defaults; the recipe wins on
    /// every key both declare.
    pub fn merge_into(
        &self,
        recipe_options: &OptionDomains,
        recipe_defaults: &OptionSet,
    ) -> (OptionDomains, OptionSet) {
        let mut domains = self.options.clone();
        domains.extend(
            recipe_options
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        let defaults = config::merge_options(&self.default_options, recipe_defaults);
        (domains, defaults)
    }

    /// Host settings completed with the template's defaults.
    pub fn settings_for(&self, host: &Settings) -> Settings {
        let mut settings = host.clone();
        for (key, value) in self.settings_defaults.iter() {
            settings.set_default(key, value);
        }
        settings
    }
}
