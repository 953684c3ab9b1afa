//! recipe - host driver for package recipes
#![allow(clippy::missing_errors_doc)]
//!
//! Evaluates a recipe folder the way a package-management host would: it
//! invokes the recipe's lifecycle hooks in order and either prints the
//! resolved state (`inspect`) or drives the CMake build (`create`).

pub mod cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use recipe_core::{BaseTemplate, PackageRecipe, RecipeDefinition};
use recipe_schema::{OptionSet, OptionValue, Os, Settings};

/// Command line.
#[derive(Debug, Parser)]
#[command(name = "recipe")]
#[command(author, version, about = "recipe - evaluate and build package recipes")]
pub struct Cli {
    /// Debug logging and build-tool output on the terminal
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve the recipe and print it as JSON
    Inspect {
        /// Recipe inputs.
        #[command(flatten)]
        recipe: RecipeArgs,
    },
    /// Export, configure, build and package the recipe with CMake
    Create {
        /// Recipe inputs.
        #[command(flatten)]
        recipe: RecipeArgs,
        /// Work folder for sources, build tree and package
        #[arg(long)]
        build_dir: Option<PathBuf>,
    },
}

/// Inputs shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct RecipeArgs {
    /// Recipe folder holding the version file and an optional recipe.toml
    #[arg(long, env = "RECIPE_DIR", default_value = ".")]
    pub recipe_dir: PathBuf,

    /// Base template TOML (built-in template when omitted)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Target operating system (defaults to the host)
    #[arg(long)]
    pub os: Option<String>,

    /// Host setting, e.g. -s build_type=Debug
    #[arg(short = 's', long = "setting", value_parser = parse_key_value)]
    pub settings: Vec<(String, String)>,

    /// Option override, e.g. -o build_tests=True
    #[arg(short = 'o', long = "option", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// User qualifier of the package reference
    #[arg(long)]
    pub user: Option<String>,

    /// Channel qualifier of the package reference
    #[arg(long)]
    pub channel: Option<String>,
}

impl RecipeArgs {
    /// Load the recipe and run `set_version` and `init`.
    pub fn prepare(&self) -> Result<PackageRecipe> {
        let definition = RecipeDefinition::discover(&self.recipe_dir).with_context(|| {
            format!("Failed to load recipe from {}", self.recipe_dir.display())
        })?;
        let template = match &self.template {
            Some(path) => BaseTemplate::from_file(path)
                .with_context(|| format!("Failed to load template {}", path.display()))?,
            None => BaseTemplate::builtin()?,
        };

        let mut recipe = PackageRecipe::new(definition, template);
        if let Some(user) = &self.user {
            recipe.set_user(user);
        }
        if let Some(channel) = &self.channel {
            recipe.set_channel(channel);
        }

        recipe.set_version(&self.recipe_dir)?;
        recipe.init(&self.host_settings()?)?;
        Ok(recipe)
    }

    /// Run `config_options`, `configure`, `requirements` and `package_info`.
    pub fn resolve(&self, recipe: &mut PackageRecipe) -> Result<()> {
        recipe.config_options()?;
        recipe.configure(&self.overrides())?;
        recipe.requirements()?;
        recipe.package_info()?;
        Ok(())
    }

    /// Settings given on the command line.
    pub fn host_settings(&self) -> Result<Settings> {
        let mut settings = Settings::new();
        for (key, value) in &self.settings {
            settings.set(key, value);
        }
        if let Some(os) = &self.os {
            let os: Os = os.parse()?;
            settings.set("os", os.as_str());
        }
        Ok(settings)
    }

    /// Option overrides given on the command line.
    pub fn overrides(&self) -> OptionSet {
        self.options
            .iter()
            .map(|(key, value)| {
                let value = value
                    .parse::<OptionValue>()
                    .unwrap_or_else(|never| match never {});
                (key.clone(), value)
            })
            .collect()
    }
}

/// Parse `key=value`.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("build_tests=True").unwrap(),
            ("build_tests".to_string(), "True".to_string())
        );
        assert_eq!(
            parse_key_value("manual_repository=git@host:a=b.git").unwrap().1,
            "git@host:a=b.git"
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::parse_from([
            "recipe",
            "inspect",
            "--recipe-dir",
            "/src/cppql",
            "--os",
            "Windows",
            "-o",
            "build_tests=True",
            "-o",
            "zero_based_indices=False",
            "-s",
            "build_type=Debug",
        ]);
        let Commands::Inspect { recipe } = cli.command else {
            panic!("expected inspect");
        };
        let overrides = recipe.overrides();
        assert_eq!(overrides.get("build_tests"), Some(&OptionValue::Bool(true)));
        assert_eq!(
            overrides.get("zero_based_indices"),
            Some(&OptionValue::Bool(false))
        );

        let settings = recipe.host_settings().unwrap();
        assert_eq!(settings.get("os"), Some("Windows"));
        assert_eq!(settings.build_type(), "Debug");
    }

    #[test]
    fn test_unknown_os_rejected() {
        let cli = Cli::parse_from(["recipe", "inspect", "--os", "Plan9"]);
        let Commands::Inspect { recipe } = cli.command else {
            panic!("expected inspect");
        };
        assert!(recipe.host_settings().is_err());
    }
}
