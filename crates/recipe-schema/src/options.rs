//! Recipe options: values, domains, and the ordered option set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::SchemaError;

/// Current value of an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// `true` / `false`.
    Bool(bool),
    /// Integral value.
    Int(i64),
    /// Free text (enumerated choices, repository locations, ...).
    Text(String),
}

impl OptionValue {
    /// Whether this value switches a feature on.
    ///
    /// Text values are truthy only for `true`, `on`, `yes` and `1`
    /// (case-insensitive); everything else, including `None`, is off.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Text(s) => matches!(s.to_lowercase().as_str(), "true" | "on" | "yes" | "1"),
        }
    }

    fn as_bool_literal(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Self::Text(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl std::str::FromStr for OptionValue {
    type Err = std::convert::Infallible;

    /// Parse a host-supplied `key=value` right-hand side.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<i64>() {
            return Ok(Self::Int(n));
        }
        Ok(match s {
            "true" | "True" => Self::Bool(true),
            "false" | "False" => Self::Bool(false),
            _ => Self::Text(s.to_string()),
        })
    }
}

/// Set of values an option accepts.
///
/// In TOML a domain is either an array of allowed values
/// (`[true, false]` is the boolean domain) or the string `"ANY"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDomain", into = "RawDomain")]
pub enum OptionDomain {
    /// `true` or `false`.
    Boolean,
    /// One of a fixed list of values.
    Enumerated(Vec<OptionValue>),
    /// Any value, including none.
    Any,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDomain {
    Keyword(String),
    Values(Vec<OptionValue>),
}

impl TryFrom<RawDomain> for OptionDomain {
    type Error = String;

    fn try_from(raw: RawDomain) -> Result<Self, Self::Error> {
        match raw {
            RawDomain::Keyword(k) if k == "ANY" => Ok(Self::Any),
            RawDomain::Keyword(k) => Err(format!("unknown option domain '{k}'")),
            RawDomain::Values(values) => {
                let bools: Option<Vec<bool>> =
                    values.iter().map(OptionValue::as_bool_literal).collect();
                match bools {
                    Some(b) if b.len() == 2 && b.contains(&true) && b.contains(&false) => {
                        Ok(Self::Boolean)
                    }
                    _ => Ok(Self::Enumerated(values)),
                }
            }
        }
    }
}

impl From<OptionDomain> for RawDomain {
    fn from(domain: OptionDomain) -> Self {
        match domain {
            OptionDomain::Boolean => RawDomain::Values(vec![true.into(), false.into()]),
            OptionDomain::Enumerated(values) => RawDomain::Values(values),
            OptionDomain::Any => RawDomain::Keyword("ANY".to_string()),
        }
    }
}

impl OptionDomain {
    /// Check `value` against this domain, returning its canonical form.
    ///
    /// Boolean domains accept the strings `True`/`False` and normalize them
    /// to [`OptionValue::Bool`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::OptionOutOfDomain`] if the value is not accepted.
    pub fn normalize(&self, key: &str, value: &OptionValue) -> Result<OptionValue, SchemaError> {
        let rejected = || SchemaError::OptionOutOfDomain {
            key: key.to_string(),
            value: value.to_string(),
        };
        match self {
            Self::Any => Ok(value.clone()),
            Self::Boolean => value
                .as_bool_literal()
                .map(OptionValue::Bool)
                .ok_or_else(rejected),
            Self::Enumerated(allowed) => allowed
                .iter()
                .find(|candidate| candidate.to_string() == value.to_string())
                .cloned()
                .ok_or_else(rejected),
        }
    }
}

/// Declared option domains, keyed by option name.
pub type OptionDomains = BTreeMap<String, OptionDomain>;

/// Mapping of option key to current value, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet(BTreeMap<String, OptionValue>);

impl OptionSet {
    /// An empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an option value.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    /// Whether `key` is present and truthy. Absent keys are off.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.get(key).is_some_and(OptionValue::is_truthy)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set `key`, returning the previous value.
    pub fn insert(&mut self, key: &str, value: impl Into<OptionValue>) -> Option<OptionValue> {
        self.0.insert(key.to_string(), value.into())
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.0.remove(key)
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Option keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Into<OptionValue>, const N: usize> From<[(&str, V); N]> for OptionSet {
    fn from(pairs: [(&str, V); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl FromIterator<(String, OptionValue)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (String, OptionValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_domain_from_array() {
        let domain: OptionDomain = serde_json::from_str("[true, false]").unwrap();
        assert_eq!(domain, OptionDomain::Boolean);

        let any: OptionDomain = serde_json::from_str("\"ANY\"").unwrap();
        assert_eq!(any, OptionDomain::Any);

        let levels: OptionDomain = serde_json::from_str("[\"low\", \"high\"]").unwrap();
        assert_eq!(
            levels,
            OptionDomain::Enumerated(vec!["low".into(), "high".into()])
        );
    }

    #[test]
    fn test_boolean_domain_normalizes_text() {
        let v = OptionDomain::Boolean
            .normalize("fPIC", &OptionValue::from("False"))
            .unwrap();
        assert_eq!(v, OptionValue::Bool(false));
        assert!(
            OptionDomain::Boolean
                .normalize("fPIC", &OptionValue::from("maybe"))
                .is_err()
        );
    }

    #[test]
    fn test_enumerated_domain() {
        let domain = OptionDomain::Enumerated(vec!["low".into(), "high".into()]);
        assert!(domain.normalize("level", &"high".into()).is_ok());
        let err = domain.normalize("level", &"mid".into()).unwrap_err();
        assert!(err.to_string().contains("level"));
    }

    #[test]
    fn test_truthiness() {
        assert!(OptionValue::from("True").is_truthy());
        assert!(!OptionValue::from("None").is_truthy());
        assert!(OptionValue::Int(1).is_truthy());
        let set = OptionSet::from([("a", true)]);
        assert!(set.is_enabled("a"));
        assert!(!set.is_enabled("missing"));
    }

    #[test]
    fn test_parse_host_value() {
        assert_eq!("True".parse::<OptionValue>().unwrap(), OptionValue::Bool(true));
        assert_eq!("3".parse::<OptionValue>().unwrap(), OptionValue::Int(3));
        assert_eq!(
            "git@host:repo.git".parse::<OptionValue>().unwrap(),
            OptionValue::Text("git@host:repo.git".to_string())
        );
    }
}
