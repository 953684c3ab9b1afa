//! Configuration resolution: version lookup, option merging and
//! platform-conditional option edits.

use std::collections::BTreeSet;
use std::path::Path;

use recipe_schema::{OptionDomains, OptionSet, Os, Version};
use regex::Regex;

use crate::error::{RecipeError, Result};

/// Position-independent-code option, meaningless on Windows.
pub const PIC_OPTION: &str = "fPIC";

/// Find the value assigned to `variable` in a build-variable definition.
///
/// Accepts `NAME = "value"` and the CMake form `set(NAME "value")`; the
/// first assignment wins.
///
/// # Errors
///
/// Returns `RecipeError::Parse` if no assignment exists or the assigned
/// value is empty or contains whitespace.
pub fn resolve_version(source: &str, variable: &str) -> Result<Version> {
    let name = regex::escape(variable);
    let pattern = format!(
        r#"(?m)^[ \t]*(?:set[ \t]*\([ \t]*{name}[ \t]+"([^"\n]*)"[ \t]*\)|{name}[ \t]*=[ \t]*"([^"\n]*)")"#
    );
    let re = Regex::new(&pattern).map_err(|e| RecipeError::Parse(e.to_string()))?;

    let caps = re
        .captures(source)
        .ok_or_else(|| RecipeError::Parse(format!("no assignment of {variable} found")))?;
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map_or("", |m| m.as_str());

    if !Version::is_well_formed(value) {
        return Err(RecipeError::Parse(format!(
            "{variable} has malformed value '{value}'"
        )));
    }
    Ok(Version::new(value))
}

/// Read `path` and resolve `variable` from it.
///
/// # Errors
///
/// Returns `RecipeError::Io` if the file cannot be read, otherwise as
/// [`resolve_version`].
pub fn resolve_version_file(path: &Path, variable: &str) -> Result<Version> {
    let source = std::fs::read_to_string(path)?;
    let version = resolve_version(&source, variable)?;
    tracing::debug!("Resolved {variable} = {version} from {}", path.display());
    Ok(version)
}

/// Key-wise union of two option sets; `overrides` wins on conflict.
///
/// Associative and idempotent: `merge(m, m) == m`.
pub fn merge_options(base: &OptionSet, overrides: &OptionSet) -> OptionSet {
    let mut merged = base.clone();
    for (key, value) in overrides.iter() {
        merged.insert(key, value.clone());
    }
    merged
}

/// Remove options that do not apply on `os`. Nothing else is touched.
pub fn apply_platform_adjustments(options: &mut OptionSet, os: Os) {
    if os.is_windows() && options.remove(PIC_OPTION).is_some() {
        tracing::debug!("Removed {PIC_OPTION} for {os}");
    }
}

/// Check that every value is declared and lies in its domain.
///
/// # Errors
///
/// Returns `RecipeError::Configuration` for the first offending key.
pub fn check_declared(domains: &OptionDomains, values: &OptionSet) -> Result<()> {
    for (key, value) in values.iter() {
        let domain = domains.get(key).ok_or_else(|| {
            RecipeError::Configuration(format!("option '{key}' is not declared"))
        })?;
        domain.normalize(key, value)?;
    }
    Ok(())
}

/// Check that every option key in `referenced` is declared.
///
/// # Errors
///
/// Returns `RecipeError::Configuration` naming the first unknown key.
pub fn check_referenced<'a>(
    domains: &OptionDomains,
    referenced: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    for key in referenced {
        if !domains.contains_key(key) {
            return Err(RecipeError::Configuration(format!(
                "option '{key}' is referenced but not declared by the recipe or its template"
            )));
        }
    }
    Ok(())
}

/// Apply host overrides over `current` and normalize every value.
///
/// Overrides for options in `removed` are dropped; overrides for keys no
/// declaration knows about are rejected.
///
/// # Errors
///
/// Returns `RecipeError::Configuration` for undeclared keys or values
/// outside their domain.
pub fn normalize_options(
    domains: &OptionDomains,
    current: &OptionSet,
    overrides: &OptionSet,
    removed: &BTreeSet<String>,
) -> Result<OptionSet> {
    let mut applicable = OptionSet::new();
    for (key, value) in overrides.iter() {
        if removed.contains(key) {
            tracing::debug!("Ignoring override for removed option {key}");
            continue;
        }
        applicable.insert(key, value.clone());
    }

    let merged = merge_options(current, &applicable);
    let mut normalized = OptionSet::new();
    for (key, value) in merged.iter() {
        let domain = domains.get(key).ok_or_else(|| {
            RecipeError::Configuration(format!("option '{key}' is not declared"))
        })?;
        normalized.insert(key, domain.normalize(key, value)?);
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_schema::{OptionDomain, OptionValue};

    #[test]
    fn test_resolve_version_assignment() {
        let v = resolve_version("CPPQL_VERSION = \"1.2.3\"\n", "CPPQL_VERSION").unwrap();
        assert_eq!(v, "1.2.3");
    }

    #[test]
    fn test_resolve_version_cmake_set() {
        let src = "# generated\nset(OTHER \"9.9.9\")\nset(CPPQL_VERSION \"0.1.0\")\n";
        assert_eq!(resolve_version(src, "CPPQL_VERSION").unwrap(), "0.1.0");
    }

    #[test]
    fn test_resolve_version_missing() {
        let err = resolve_version("OTHER = \"1.0.0\"", "CPPQL_VERSION").unwrap_err();
        assert!(matches!(err, RecipeError::Parse(_)));
    }

    #[test]
    fn test_resolve_version_prefix_is_not_a_match() {
        let err = resolve_version("CPPQL_VERSION_MAJOR = \"1\"", "CPPQL_VERSION").unwrap_err();
        assert!(matches!(err, RecipeError::Parse(_)));
    }

    #[test]
    fn test_resolve_version_malformed() {
        assert!(matches!(
            resolve_version("CPPQL_VERSION = \"\"", "CPPQL_VERSION"),
            Err(RecipeError::Parse(_))
        ));
        assert!(matches!(
            resolve_version("CPPQL_VERSION = \"1 2\"", "CPPQL_VERSION"),
            Err(RecipeError::Parse(_))
        ));
    }

    #[test]
    fn test_merge_options_override_wins() {
        let base = OptionSet::from([("a", 1), ("b", 2)]);
        let over = OptionSet::from([("b", 3), ("c", 4)]);
        let merged = merge_options(&base, &over);
        assert_eq!(merged, OptionSet::from([("a", 1), ("b", 3), ("c", 4)]));
    }

    #[test]
    fn test_merge_options_idempotent_and_associative() {
        let a = OptionSet::from([("x", 1), ("y", 2)]);
        let b = OptionSet::from([("y", 5)]);
        let c = OptionSet::from([("z", 7), ("x", 0)]);

        let m = merge_options(&a, &b);
        assert_eq!(merge_options(&m, &m), m);
        assert_eq!(
            merge_options(&merge_options(&a, &b), &c),
            merge_options(&a, &merge_options(&b, &c))
        );
    }

    #[test]
    fn test_windows_removes_only_pic() {
        let mut options = OptionSet::from([
            ("fPIC", true),
            ("build_tests", false),
            ("zero_based_indices", true),
        ]);
        apply_platform_adjustments(&mut options, Os::Windows);
        assert!(!options.contains("fPIC"));
        assert_eq!(options.len(), 2);
        assert!(options.contains("build_tests"));
        assert!(options.contains("zero_based_indices"));
    }

    #[test]
    fn test_linux_keeps_pic() {
        let mut options = OptionSet::from([("fPIC", true)]);
        apply_platform_adjustments(&mut options, Os::Linux);
        assert!(options.contains("fPIC"));
    }

    #[test]
    fn test_check_referenced() {
        let domains = OptionDomains::from([("build_tests".to_string(), OptionDomain::Boolean)]);
        assert!(check_referenced(&domains, ["build_tests"]).is_ok());
        let err = check_referenced(&domains, ["build_tests", "build_tset"]).unwrap_err();
        assert!(err.to_string().contains("build_tset"));
    }

    #[test]
    fn test_normalize_options() {
        let domains = OptionDomains::from([
            ("fPIC".to_string(), OptionDomain::Boolean),
            ("build_tests".to_string(), OptionDomain::Boolean),
        ]);
        let current = OptionSet::from([("build_tests", false)]);
        let overrides = OptionSet::from([("build_tests", "True"), ("fPIC", "False")]);
        let removed = BTreeSet::from(["fPIC".to_string()]);

        let normalized = normalize_options(&domains, &current, &overrides, &removed).unwrap();
        assert_eq!(normalized, OptionSet::from([("build_tests", OptionValue::Bool(true))]));

        let bad = OptionSet::from([("ghost", true)]);
        assert!(matches!(
            normalize_options(&domains, &current, &bad, &removed),
            Err(RecipeError::Configuration(_))
        ));
    }
}
