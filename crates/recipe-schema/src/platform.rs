//! Host settings and the target platform derived from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::SchemaError;

/// Target operating system, as named by the `os` setting.
///
/// # Example
///
/// ```
/// use recipe_schema::Os;
///
/// let os: Os = "Windows".parse().unwrap();
/// assert!(os.is_windows());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Os {
    /// Linux distributions.
    #[default]
    Linux,
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    Macos,
    /// FreeBSD.
    FreeBsd,
}

impl Os {
    /// Get the operating system this binary runs on.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "freebsd") {
            Self::FreeBsd
        } else {
            Self::Linux
        }
    }

    /// Setting value as written in host profiles.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Windows => "Windows",
            Self::Macos => "Macos",
            Self::FreeBsd => "FreeBSD",
        }
    }

    /// Whether position-independent code is meaningless on this platform.
    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Os {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "windows" | "win32" | "win64" => Ok(Self::Windows),
            "macos" | "darwin" | "macosx" => Ok(Self::Macos),
            "freebsd" => Ok(Self::FreeBsd),
            _ => Err(SchemaError::UnknownOs(s.to_string())),
        }
    }
}

/// Mapping of setting name to value (`os`, `compiler`, `build_type`, `arch`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, String>);

impl Settings {
    /// An empty settings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a setting.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set a setting, replacing any previous value.
    pub fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    /// Set a setting only if it has no value yet.
    pub fn set_default(&mut self, key: &str, value: &str) {
        self.0
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }

    /// The `os` setting parsed as an [`Os`], if present.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownOs`] for unrecognized values.
    pub fn os(&self) -> Result<Option<Os>, SchemaError> {
        self.get("os").map(str::parse).transpose()
    }

    /// The `build_type` setting, defaulting to `Release`.
    pub fn build_type(&self) -> &str {
        self.get("build_type").unwrap_or("Release")
    }

    /// Iterate over settings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Settings {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_from_setting() {
        let settings = Settings::from([("os", "Windows"), ("build_type", "Debug")]);
        assert_eq!(settings.os().unwrap(), Some(Os::Windows));
        assert_eq!(settings.build_type(), "Debug");
    }

    #[test]
    fn test_unknown_os_is_rejected() {
        let settings = Settings::from([("os", "Plan9")]);
        assert!(settings.os().is_err());
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut settings = Settings::from([("os", "Linux")]);
        settings.set_default("os", "Windows");
        settings.set_default("arch", "x86_64");
        assert_eq!(settings.get("os"), Some("Linux"));
        assert_eq!(settings.get("arch"), Some("x86_64"));
    }
}
