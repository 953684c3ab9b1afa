//! Published components and their link requirements.

use serde::{Deserialize, Serialize};

use crate::types::SchemaError;

/// A link requirement of a component.
///
/// Written as `component` for a sibling in the same package, or
/// `package::component` for a component exported by a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComponentRef {
    /// Another component of this package.
    Local(String),
    /// A component of a required package.
    External {
        /// Required package name.
        package: String,
        /// Component within that package.
        component: String,
    },
}

impl ComponentRef {
    /// Parse a component reference.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidComponentRef`] for empty segments.
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let invalid = || SchemaError::InvalidComponentRef(s.to_string());
        match s.split_once("::") {
            Some((package, component)) => {
                if package.is_empty() || component.is_empty() || component.contains("::") {
                    return Err(invalid());
                }
                Ok(Self::External {
                    package: package.to_lowercase(),
                    component: component.to_string(),
                })
            }
            None if s.is_empty() => Err(invalid()),
            None => Ok(Self::Local(s.to_string())),
        }
    }
}

impl std::fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(name) => write!(f, "{name}"),
            Self::External { package, component } => write!(f, "{package}::{component}"),
        }
    }
}

impl TryFrom<String> for ComponentRef {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ComponentRef> for String {
    fn from(r: ComponentRef) -> Self {
        r.to_string()
    }
}

/// A named subset of installed libraries published to downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Component name (`core`, `typed`, ...).
    pub name: String,
    /// Library names this component links.
    pub libs: Vec<String>,
    /// Link requirements, in declaration order.
    pub requires: Vec<ComponentRef>,
}

impl Component {
    /// A component exporting `libs` with no requirements yet.
    pub fn new(name: &str, libs: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            libs: libs.iter().map(ToString::to_string).collect(),
            requires: Vec::new(),
        }
    }

    /// Append a link requirement.
    pub fn require(mut self, reference: ComponentRef) -> Self {
        self.requires.push(reference);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_component_refs() {
        assert_eq!(
            ComponentRef::parse("core").unwrap(),
            ComponentRef::Local("core".into())
        );
        let ext = ComponentRef::parse("sqlite3::sqlite3").unwrap();
        assert_eq!(ext.to_string(), "sqlite3::sqlite3");
        assert!(ComponentRef::parse("").is_err());
        assert!(ComponentRef::parse("::x").is_err());
        assert!(ComponentRef::parse("a::b::c").is_err());
    }
}
