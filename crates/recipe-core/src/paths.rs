use dirs::home_dir;
use std::path::PathBuf;

/// Returns the per-user data directory, or None if the user's home cannot be resolved.
pub fn try_recipe_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("RECIPE_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".recipe"))
}

/// Logs directory: ~/.recipe/logs, falling back to the system temp dir.
pub fn log_dir() -> PathBuf {
    try_recipe_home()
        .unwrap_or_else(std::env::temp_dir)
        .join("logs")
}

/// Generate a build log path for a package
pub fn build_log_path(package: &str, version: &str) -> PathBuf {
    let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    log_dir().join(format!("build-{package}-{version}-{timestamp}.log"))
}
