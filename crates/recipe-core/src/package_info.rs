//! Components a successful build exposes to downstream consumers.

use std::collections::{HashMap, HashSet};

use recipe_schema::{Component, ComponentRef, Requirement};

use crate::definition::{Libraries, PackageLayout};
use crate::error::{RecipeError, Result};

/// Name of the component carrying the core library.
pub const CORE_COMPONENT: &str = "core";
/// Name of the typed-layer component.
pub const TYPED_COMPONENT: &str = "typed";

/// Declares components for the configured layout.
#[derive(Debug, Clone, Copy)]
pub struct PackageInfoPublisher<'a> {
    libraries: &'a Libraries,
    module_alias: Option<&'a str>,
}

impl<'a> PackageInfoPublisher<'a> {
    /// `module_alias` is the template's module aggregate, if any.
    pub fn new(libraries: &'a Libraries, module_alias: Option<&'a str>) -> Self {
        Self {
            libraries,
            module_alias,
        }
    }

    /// Build and validate the component list for `layout`.
    ///
    /// `utility` and `runtime` are the recipe's pinned requirements; their
    /// aliases are linked by the component holding the core library.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Configuration` if a component references a name
    /// that is neither a component nor an alias of `requirements`.
    pub fn publish(
        &self,
        layout: PackageLayout,
        utility: &Requirement,
        runtime: &Requirement,
        requirements: &[Requirement],
    ) -> Result<Vec<Component>> {
        let core_lib = match layout {
            PackageLayout::Flat => &self.libraries.flat,
            PackageLayout::Layered => &self.libraries.core,
        };

        let mut core = Component::new(CORE_COMPONENT, &[core_lib.as_str()]);
        if let Some(alias) = self.module_alias {
            core = core.require(ComponentRef::parse(alias)?);
        }
        core = core
            .require(ComponentRef::parse(&utility.alias())?)
            .require(ComponentRef::parse(&runtime.alias())?);

        let components = match layout {
            PackageLayout::Flat => vec![core],
            PackageLayout::Layered => {
                let typed = Component::new(TYPED_COMPONENT, &[self.libraries.typed.as_str()])
                    .require(ComponentRef::Local(CORE_COMPONENT.to_string()));
                vec![core, typed]
            }
        };

        validate_components(&components, requirements)?;
        tracing::debug!("Published {} component(s) for {layout:?} layout", components.len());
        Ok(components)
    }
}

/// Check that every component reference resolves and that local
/// components form no cycle.
///
/// # Errors
///
/// Returns `RecipeError::Configuration` naming the first unresolved
/// reference or a component on a cycle.
pub fn validate_components(components: &[Component], requirements: &[Requirement]) -> Result<()> {
    let mut locals: HashMap<&str, &Component> = HashMap::new();
    for component in components {
        if locals.insert(component.name.as_str(), component).is_some() {
            return Err(RecipeError::Configuration(format!(
                "component '{}' declared twice",
                component.name
            )));
        }
    }
    let aliases: HashSet<String> = requirements.iter().map(Requirement::alias).collect();

    for component in components {
        for reference in &component.requires {
            let resolved = match reference {
                ComponentRef::Local(name) => locals.contains_key(name.as_str()),
                ComponentRef::External { .. } => aliases.contains(&reference.to_string()),
            };
            if !resolved {
                return Err(RecipeError::Configuration(format!(
                    "component '{}' requires undeclared '{reference}'",
                    component.name
                )));
            }
        }
    }

    let mut visited = HashSet::new();
    let mut visiting = HashSet::new();
    for component in components {
        visit(component, &locals, &mut visited, &mut visiting)?;
    }
    Ok(())
}

fn visit<'a>(
    component: &'a Component,
    locals: &HashMap<&str, &'a Component>,
    visited: &mut HashSet<&'a str>,
    visiting: &mut HashSet<&'a str>,
) -> Result<()> {
    let name = component.name.as_str();
    if visited.contains(name) {
        return Ok(());
    }
    if !visiting.insert(name) {
        return Err(RecipeError::Configuration(format!(
            "circular component requirement involving '{name}'"
        )));
    }

    for reference in &component.requires {
        if let ComponentRef::Local(dep) = reference {
            if let Some(&next) = locals.get(dep.as_str()) {
                visit(next, locals, visited, visiting)?;
            }
        }
    }

    visiting.remove(name);
    visited.insert(name);
    Ok(())
}
