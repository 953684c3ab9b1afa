//! Ordered, deduplicated requirement list for a configured recipe.

use std::collections::HashSet;

use recipe_schema::{OptionSet, PackageName, Requirement};
use serde::Serialize;

use crate::definition::{ManualSpec, PinnedRequirements};
use crate::error::{RecipeError, Result};

/// Option gating the test-framework requirement.
pub const BUILD_TESTS: &str = "build_tests";
/// Option gating the documentation-generation requirement.
pub const BUILD_MANUAL: &str = "build_manual";
/// Option receiving the manual repository location.
pub const MANUAL_REPOSITORY: &str = "manual_repository";

/// Output of [`DependencyGraphBuilder::build_requirements`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementPlan {
    /// Resolved requirements in emission order.
    pub requirements: Vec<Requirement>,
    /// Manual repository to record on the recipe, when the manual is built.
    pub manual_repository: Option<String>,
}

/// Computes the requirement list from template requirements and options.
#[derive(Debug, Clone, Copy)]
pub struct DependencyGraphBuilder<'a> {
    pinned: &'a PinnedRequirements,
    manual: &'a ManualSpec,
}

impl<'a> DependencyGraphBuilder<'a> {
    /// Create a builder for the recipe's pinned requirements.
    pub fn new(pinned: &'a PinnedRequirements, manual: &'a ManualSpec) -> Self {
        Self { pinned, manual }
    }

    /// Emit, in order: template requirements, the runtime library, the
    /// utility library, the test framework (if `build_tests`), and the
    /// documentation generator (if `build_manual`).
    ///
    /// Identical inputs always yield the identical ordered list.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Dependency` if a target package is emitted twice.
    pub fn build_requirements(
        &self,
        base: &[Requirement],
        options: &OptionSet,
    ) -> Result<RequirementPlan> {
        let mut emitted = Emitter::default();

        for req in base.iter().filter(|r| r.activation.is_active(options)) {
            emitted.push(req.clone())?;
        }
        emitted.push(Requirement::always(self.pinned.runtime.clone()))?;
        emitted.push(Requirement::always(self.pinned.utility.clone()))?;

        if options.is_enabled(BUILD_TESTS) {
            emitted.push(Requirement::when_enabled(
                self.pinned.test.clone(),
                BUILD_TESTS,
            ))?;
        }

        let manual_repository = if options.is_enabled(BUILD_MANUAL) {
            emitted.push(Requirement::when_enabled(
                self.pinned.manual.clone(),
                BUILD_MANUAL,
            ))?;
            Some(self.manual.repository.clone())
        } else {
            None
        };

        tracing::debug!("Resolved {} requirements", emitted.list.len());
        Ok(RequirementPlan {
            requirements: emitted.list,
            manual_repository,
        })
    }
}

#[derive(Default)]
struct Emitter {
    list: Vec<Requirement>,
    seen: HashSet<PackageName>,
}

impl Emitter {
    fn push(&mut self, req: Requirement) -> Result<()> {
        if !self.seen.insert(req.name().clone()) {
            return Err(RecipeError::Dependency(format!(
                "duplicate requirement target '{}' ({req})",
                req.name()
            )));
        }
        tracing::trace!("requires {req}");
        self.list.push(req);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::RecipeDefinition;
    use recipe_schema::Reference;

    fn base() -> Vec<Requirement> {
        vec![Requirement::always(
            Reference::parse("cmake-modules/1.0.0@timzoet/v1.0.0").unwrap(),
        )]
    }

    fn names(plan: &RequirementPlan) -> Vec<String> {
        plan.requirements
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    #[test]
    fn test_fixed_order_without_optional() {
        let def = RecipeDefinition::cppql().unwrap();
        let builder = DependencyGraphBuilder::new(&def.requirements, &def.manual);
        let plan = builder
            .build_requirements(&base(), &OptionSet::from([(BUILD_TESTS, false), (BUILD_MANUAL, false)]))
            .unwrap();
        assert_eq!(names(&plan), vec!["cmake-modules", "sqlite3", "common"]);
        assert!(plan.manual_repository.is_none());
    }

    #[test]
    fn test_build_tests_adds_exactly_one_test_framework() {
        let def = RecipeDefinition::cppql().unwrap();
        let builder = DependencyGraphBuilder::new(&def.requirements, &def.manual);

        let on = builder
            .build_requirements(&base(), &OptionSet::from([(BUILD_TESTS, true)]))
            .unwrap();
        let count = |plan: &RequirementPlan| {
            plan.requirements
                .iter()
                .filter(|r| r.name() == "bettertest")
                .count()
        };
        assert_eq!(count(&on), 1);
        assert_eq!(names(&on).last().map(String::as_str), Some("bettertest"));

        let off = builder
            .build_requirements(&base(), &OptionSet::from([(BUILD_TESTS, false)]))
            .unwrap();
        assert_eq!(count(&off), 0);
    }

    #[test]
    fn test_build_manual_sets_repository() {
        let def = RecipeDefinition::cppql().unwrap();
        let builder = DependencyGraphBuilder::new(&def.requirements, &def.manual);
        let plan = builder
            .build_requirements(
                &base(),
                &OptionSet::from([(BUILD_TESTS, true), (BUILD_MANUAL, true)]),
            )
            .unwrap();
        assert_eq!(
            names(&plan),
            vec!["cmake-modules", "sqlite3", "common", "bettertest", "doxygen"]
        );
        assert_eq!(
            plan.manual_repository.as_deref(),
            Some("git@github.com:TimZoet/cppql-manual.git")
        );
    }

    #[test]
    fn test_deterministic_across_calls() {
        let def = RecipeDefinition::cppql().unwrap();
        let builder = DependencyGraphBuilder::new(&def.requirements, &def.manual);
        let options = OptionSet::from([(BUILD_TESTS, true), (BUILD_MANUAL, true)]);
        let first = builder.build_requirements(&base(), &options).unwrap();
        let second = builder.build_requirements(&base(), &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let def = RecipeDefinition::cppql().unwrap();
        let builder = DependencyGraphBuilder::new(&def.requirements, &def.manual);
        let clashing = vec![Requirement::always(Reference::new("sqlite3", "3.39.0"))];
        let err = builder
            .build_requirements(&clashing, &OptionSet::new())
            .unwrap_err();
        assert!(matches!(err, RecipeError::Dependency(_)));
        assert!(err.to_string().contains("sqlite3"));
    }
}
