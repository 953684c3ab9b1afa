//! Package names, versions and references.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Errors raised while parsing or validating recipe model values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A package reference did not follow `name/version[@user/channel]`.
    #[error("Invalid reference '{0}': expected name/version[@user/channel]")]
    InvalidReference(String),

    /// A component requirement did not follow `component` or `package::component`.
    #[error("Invalid component reference: {0}")]
    InvalidComponentRef(String),

    /// A required field is empty.
    #[error("Empty field: {0}")]
    EmptyField(String),

    /// An option value lies outside its declared domain.
    #[error("Option '{key}' does not accept value '{value}'")]
    OptionOutOfDomain {
        /// Option key.
        key: String,
        /// Rejected value, rendered as text.
        value: String,
    },

    /// An option key is not declared by the recipe or its template.
    #[error("Option '{0}' is not declared")]
    UndeclaredOption(String),

    /// The platform identifier is not recognized.
    #[error("Unknown operating system: {0}")]
    UnknownOs(String),
}

/// A normalized package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name, normalizing the input to lowercase.
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// Return the normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `pkg::pkg` alias downstream components use to link this package.
    pub fn alias(&self) -> String {
        format!("{0}::{0}", self.0)
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// A version string, ordered by semver when both sides parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(String);

impl Ord for Version {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (
            semver::Version::parse(&self.0),
            semver::Version::parse(&other.0),
        ) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the string is usable as a version: non-empty, no whitespace or quotes.
    pub fn is_well_formed(v: &str) -> bool {
        !v.is_empty() && !v.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'')
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A pinned package reference: `name/version[@user/channel]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    /// Target package.
    pub name: PackageName,
    /// Pinned version.
    pub version: Version,
    /// Optional `(user, channel)` qualification.
    pub channel: Option<(String, String)>,
}

impl Reference {
    /// Build an unqualified reference.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: PackageName::new(name),
            version: Version::new(version),
            channel: None,
        }
    }

    /// Qualify this reference with a user and channel.
    pub fn with_channel(mut self, user: &str, channel: &str) -> Self {
        self.channel = Some((user.to_string(), channel.to_string()));
        self
    }

    /// Parse a reference string.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidReference`] if any segment is missing,
    /// empty, or contains whitespace.
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let invalid = || SchemaError::InvalidReference(s.to_string());
        let segment_ok = |seg: &str| !seg.is_empty() && !seg.chars().any(char::is_whitespace);

        let (pkg, qualifier) = match s.split_once('@') {
            Some((pkg, qualifier)) => (pkg, Some(qualifier)),
            None => (s, None),
        };
        let (name, version) = pkg.split_once('/').ok_or_else(invalid)?;
        if !segment_ok(name) || !Version::is_well_formed(version) || version.contains('/') {
            return Err(invalid());
        }

        let channel = match qualifier {
            Some(q) => {
                let (user, channel) = q.split_once('/').ok_or_else(invalid)?;
                if !segment_ok(user) || !segment_ok(channel) || channel.contains('/') {
                    return Err(invalid());
                }
                Some((user.to_string(), channel.to_string()))
            }
            None => None,
        };

        Ok(Self {
            name: PackageName::new(name),
            version: Version::new(version),
            channel,
        })
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let Some((user, channel)) = &self.channel {
            write!(f, "@{user}/{channel}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Reference {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Reference {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Reference> for String {
    fn from(r: Reference) -> Self {
        r.to_string()
    }
}
