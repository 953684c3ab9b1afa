//! Copying recipe sources into the export folder.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{RecipeError, Result};

/// Copy every path matching `patterns` (relative to `recipe_folder`) into
/// `dest`, keeping relative locations. Returns the copied relative paths in
/// sorted order.
///
/// Patterns that match nothing are skipped. A relative `recipe_folder` is
/// resolved against the working directory.
///
/// # Errors
///
/// Returns `RecipeError::Configuration` for an invalid pattern or one that
/// escapes the recipe folder, and `RecipeError::Io` when the folder does
/// not exist or copying fails.
pub fn export_sources(recipe_folder: &Path, patterns: &[String], dest: &Path) -> Result<Vec<PathBuf>> {
    let root = std::fs::canonicalize(recipe_folder)?;
    let mut copied = BTreeSet::new();

    for pattern in patterns {
        let full = Path::new(&glob::Pattern::escape(&root.to_string_lossy())).join(pattern);
        let entries = glob::glob(&full.to_string_lossy()).map_err(|e| {
            RecipeError::Configuration(format!("invalid export pattern '{pattern}': {e}"))
        })?;

        let mut matched = false;
        for entry in entries {
            let path = entry.map_err(|e| RecipeError::Io(e.into()))?;
            let relative = path
                .strip_prefix(&root)
                .map_err(|_| {
                    RecipeError::Configuration(format!(
                        "export pattern '{pattern}' escapes the recipe folder"
                    ))
                })?
                .to_path_buf();
            copy_entry(&path, &dest.join(&relative))?;
            copied.insert(relative);
            matched = true;
        }
        if !matched {
            tracing::debug!("Export pattern '{pattern}' matched nothing");
        }
    }

    tracing::info!("Exported {} path(s) to {}", copied.len(), dest.display());
    Ok(copied.into_iter().collect())
}

fn copy_entry(src: &Path, dst: &Path) -> Result<()> {
    if src.is_dir() {
        std::fs::create_dir_all(dst)?;
        copy_dir_all(src, dst)
    } else {
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(src, dst)?;
        Ok(())
    }
}

/// Recursively copy the contents of `src` into `dst`, overwriting.
///
/// # Errors
///
/// Returns `RecipeError::Io` if any file or directory cannot be copied.
pub fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    fs_extra::dir::copy(
        src,
        dst,
        &fs_extra::dir::CopyOptions::new()
            .content_only(true)
            .overwrite(true),
    )
    .map_err(|e| RecipeError::Io(std::io::Error::other(format!("copy failed: {e}"))))?;
    Ok(())
}
