//! Maps resolved options to toolchain variables and writes the files the
//! native build-system generation step consumes.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use recipe_schema::{OptionSet, Requirement, ToolchainValue, ToolchainVariables};
use serde::Serialize;

use crate::definition::ToolchainSpec;
use crate::error::Result;

/// Name of the generated toolchain file.
pub const TOOLCHAIN_FILE: &str = "recipe_toolchain.cmake";
/// Name of the generated dependency description.
pub const DEPS_FILE: &str = "recipe_deps.json";

/// Produces toolchain variables from the activation set.
#[derive(Debug, Clone, Copy)]
pub struct ToolchainGenerator<'a> {
    spec: &'a ToolchainSpec,
}

impl<'a> ToolchainGenerator<'a> {
    /// Create a generator for the given naming and activation set.
    pub fn new(spec: &'a ToolchainSpec) -> Self {
        Self { spec }
    }

    /// One `PREFIX_IDENTIFIER = true` entry per truthy option of the
    /// activation set. Falsy or absent options produce no entry.
    pub fn generate_variables(&self, options: &OptionSet) -> ToolchainVariables {
        self.spec
            .flags
            .iter()
            .filter(|flag| options.is_enabled(&flag.option))
            .map(|flag| {
                (
                    format!("{}_{}", self.spec.prefix, flag.identifier()),
                    ToolchainValue::Bool(true),
                )
            })
            .collect()
    }
}

/// The generated toolchain: variables plus the generator they target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Toolchain {
    /// Native generator name (e.g. `Ninja`), if the template fixes one.
    pub generator: Option<String>,
    /// Variables, sorted by key.
    pub variables: ToolchainVariables,
}

impl Toolchain {
    /// Render the toolchain as CMake cache assignments.
    pub fn render(&self) -> String {
        let mut out = String::from("# Generated by recipe-core. Do not edit.\n");
        if let Some(generator) = &self.generator {
            let _ = writeln!(out, "# generator: {generator}");
        }
        for (key, value) in &self.variables {
            let _ = writeln!(
                out,
                "set({key} \"{}\" CACHE {} \"\" FORCE)",
                value.as_definition(),
                value.cache_type()
            );
        }
        out
    }

    /// Write [`TOOLCHAIN_FILE`] into `dir`, returning its path.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Io` if the directory or file cannot be written.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(TOOLCHAIN_FILE);
        std::fs::write(&path, self.render())?;
        Ok(path)
    }
}

#[derive(Serialize)]
struct DepsEntry<'a> {
    name: &'a str,
    reference: String,
    alias: String,
}

/// Write [`DEPS_FILE`] describing `requirements` into `dir`.
///
/// # Errors
///
/// Returns `RecipeError::Io` on write failures.
pub fn write_deps(requirements: &[Requirement], dir: &Path) -> Result<PathBuf> {
    let entries: Vec<DepsEntry<'_>> = requirements
        .iter()
        .map(|req| DepsEntry {
            name: req.name().as_str(),
            reference: req.reference.to_string(),
            alias: req.alias(),
        })
        .collect();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(DEPS_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(&entries)?)?;
    Ok(path)
}
