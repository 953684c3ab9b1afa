//! Build and package a recipe with CMake

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use recipe_core::{BuildDirs, CMakeBackend};

use crate::RecipeArgs;

/// Run the full hook sequence. Sources, build tree and package land under
/// `build_dir` (`<recipe_dir>/_build` by default).
pub fn create(args: &RecipeArgs, build_dir: Option<&Path>, verbose: bool) -> Result<()> {
    let root: PathBuf = build_dir.map_or_else(|| args.recipe_dir.join("_build"), Path::to_path_buf);
    let dirs = BuildDirs::under(&root);

    let mut recipe = args.prepare()?;
    let exported = recipe
        .export_sources(&args.recipe_dir, &dirs.source_dir)
        .context("Failed to export sources")?;
    tracing::debug!("Exported {} path(s)", exported.len());

    args.resolve(&mut recipe)?;
    let files = recipe.generate(&dirs)?;
    tracing::info!("Wrote {}", files.toolchain.display());

    let version = recipe
        .version()
        .map(ToString::to_string)
        .unwrap_or_default();
    let log_path = recipe_core::build_log_path(recipe.name(), &version);
    let backend = CMakeBackend::locate(verbose, log_path)?;

    recipe.build(&backend)?;
    recipe.package(&backend)?;

    let reference = recipe
        .reference()
        .map_or_else(|| recipe.name().to_string(), |r| r.to_string());
    println!("Packaged {reference} into {}", dirs.package_dir.display());
    Ok(())
}
