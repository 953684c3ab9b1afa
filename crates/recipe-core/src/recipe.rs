//! The recipe instance and its lifecycle hooks.
//!
//! A host creates one [`PackageRecipe`] per build invocation and calls the
//! hooks in order:
//!
//! `set_version` → `init` → `export_sources` → `config_options` →
//! `configure` → `requirements` → `package_info` → `generate` → `build` →
//! `package`
//!
//! Each hook reads or mutates recipe state through one resolver component.
//! Hooks that depend on an earlier one fail with `RecipeError::Lifecycle`
//! when called too early.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use recipe_schema::{
    Component, OptionDomains, OptionSet, Os, Reference, Requirement, Settings, ToolchainValue,
    Version,
};
use serde::Serialize;

use crate::config;
use crate::definition::{PackageLayout, RecipeDefinition};
use crate::error::{RecipeError, Result};
use crate::exports;
use crate::lifecycle::{BuildBackend, BuildConfig, BuildLifecycleController, Stage};
use crate::package_info::PackageInfoPublisher;
use crate::requirements::{BUILD_MANUAL, BUILD_TESTS, DependencyGraphBuilder, MANUAL_REPOSITORY};
use crate::template::BaseTemplate;
use crate::toolchain::{self, Toolchain, ToolchainGenerator};

/// Toolchain variable carrying the version when the manual is built.
pub const MANUAL_TAG: &str = "MANUAL_TAG";

/// Folders used by `generate`, `build` and `package`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDirs {
    /// Exported sources.
    pub source_dir: PathBuf,
    /// Build tree; generated files are written here.
    pub build_dir: PathBuf,
    /// Install prefix.
    pub package_dir: PathBuf,
}

impl BuildDirs {
    /// `source`, `build` and `package` under `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            source_dir: root.join("source"),
            build_dir: root.join("build"),
            package_dir: root.join("package"),
        }
    }
}

/// Files written by [`PackageRecipe::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFiles {
    /// CMake toolchain fragment.
    pub toolchain: PathBuf,
    /// Dependency description.
    pub deps: PathBuf,
}

/// Serializable view of a recipe's resolved state.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    /// Package name.
    pub name: String,
    /// Resolved version.
    pub version: Option<Version>,
    /// Full reference, once the version is known.
    pub reference: Option<String>,
    /// Description.
    pub description: String,
    /// Project URL.
    pub url: String,
    /// Template the recipe extends.
    pub template: String,
    /// Published layout.
    pub layout: PackageLayout,
    /// Effective settings.
    pub settings: Settings,
    /// Effective options.
    pub options: OptionSet,
    /// Resolved requirements.
    pub requirements: Vec<String>,
    /// Published components.
    pub components: Vec<Component>,
    /// Generator identifiers requested by the template.
    pub generators: Vec<String>,
    /// Toolchain, once resolved.
    pub toolchain: Option<Toolchain>,
    /// Build lifecycle stage.
    pub stage: Stage,
}

/// One recipe evaluation.
#[derive(Debug)]
pub struct PackageRecipe {
    definition: RecipeDefinition,
    template: BaseTemplate,
    layout: PackageLayout,
    version: Option<Version>,
    user: String,
    channel: Option<String>,
    settings: Settings,
    domains: OptionDomains,
    options: OptionSet,
    removed: BTreeSet<String>,
    initialized: bool,
    requirements: Option<Vec<Requirement>>,
    components: Option<Vec<Component>>,
    toolchain: Option<Toolchain>,
    controller: Option<BuildLifecycleController>,
}

impl PackageRecipe {
    /// Create a recipe extending `template`. The layout is fixed here.
    pub fn new(definition: RecipeDefinition, template: BaseTemplate) -> Self {
        let layout = definition.layout;
        let user = definition.package.user.clone();
        let channel = definition.package.channel.clone();
        Self {
            definition,
            template,
            layout,
            version: None,
            user,
            channel,
            settings: Settings::new(),
            domains: OptionDomains::new(),
            options: OptionSet::new(),
            removed: BTreeSet::new(),
            initialized: false,
            requirements: None,
            components: None,
            toolchain: None,
            controller: None,
        }
    }

    /// Recipe from `recipe_folder` (or the built-in definition) extending the
    /// built-in template.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Configuration` or `RecipeError::Io` if either
    /// document cannot be loaded.
    pub fn discover(recipe_folder: &Path) -> Result<Self> {
        Ok(Self::new(
            RecipeDefinition::discover(recipe_folder)?,
            BaseTemplate::builtin()?,
        ))
    }

    /// Package name.
    pub fn name(&self) -> &str {
        &self.definition.package.name
    }

    /// Resolved version.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Published layout.
    pub fn layout(&self) -> PackageLayout {
        self.layout
    }

    /// Effective settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Effective options.
    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Resolved requirements, after `requirements`.
    pub fn resolved_requirements(&self) -> Option<&[Requirement]> {
        self.requirements.as_deref()
    }

    /// Published components, after `package_info`.
    pub fn components(&self) -> Option<&[Component]> {
        self.components.as_deref()
    }

    /// Resolved toolchain.
    pub fn toolchain(&self) -> Option<&Toolchain> {
        self.toolchain.as_ref()
    }

    /// Build lifecycle stage.
    pub fn stage(&self) -> Stage {
        self.controller
            .as_ref()
            .map_or(Stage::Uninitialized, BuildLifecycleController::stage)
    }

    /// Override the user qualifier.
    pub fn set_user(&mut self, user: &str) {
        self.user = user.to_string();
    }

    /// Override the channel qualifier.
    pub fn set_channel(&mut self, channel: &str) {
        self.channel = Some(channel.to_string());
    }

    /// `name/version@user/channel`, once the version is known. The channel
    /// defaults to `v{version}`.
    pub fn reference(&self) -> Option<Reference> {
        self.version.as_ref().map(|version| {
            let channel = self
                .channel
                .clone()
                .unwrap_or_else(|| format!("v{version}"));
            Reference::new(self.name(), version.as_str()).with_channel(&self.user, &channel)
        })
    }

    /// Parse the version from the definition's version file. Runs once.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` if the version is already set,
    /// `RecipeError::Io` if the file is missing, and `RecipeError::Parse` if
    /// it holds no well-formed assignment.
    pub fn set_version(&mut self, recipe_folder: &Path) -> Result<&Version> {
        if self.version.is_some() {
            return Err(RecipeError::Lifecycle(
                "version is already resolved for this invocation".to_string(),
            ));
        }
        let source = &self.definition.version;
        let version =
            config::resolve_version_file(&recipe_folder.join(&source.file), &source.variable)?;
        tracing::info!("{} version {version}", self.name());
        Ok(&*self.version.insert(version))
    }

    /// Merge the template into the recipe and complete the host settings.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` when called twice, and
    /// `RecipeError::Configuration` if the `os` setting is not recognized or
    /// a toolchain flag or requirement switch names an undeclared option.
    pub fn init(&mut self, host_settings: &Settings) -> Result<()> {
        if self.initialized {
            return Err(RecipeError::Lifecycle("init already ran".to_string()));
        }

        let (domains, defaults) = self
            .template
            .merge_into(&self.definition.options, &self.definition.default_options);
        config::check_declared(&domains, &defaults)?;
        config::check_referenced(
            &domains,
            self.definition
                .toolchain
                .flags
                .iter()
                .map(|flag| flag.option.as_str())
                .chain([BUILD_TESTS, BUILD_MANUAL]),
        )?;

        let mut settings = self.template.settings_for(host_settings);
        if settings.os()?.is_none() {
            settings.set("os", Os::current().as_str());
        }
        for name in &self.template.settings {
            if settings.get(name).is_none() {
                tracing::debug!("Setting '{name}' not provided by host");
            }
        }

        tracing::debug!(
            "Initialized {} from template {} {} ({} options)",
            self.definition.package.name,
            self.template.name,
            self.template.version,
            domains.len()
        );
        self.domains = domains;
        self.options = defaults;
        self.settings = settings;
        self.initialized = true;
        Ok(())
    }

    /// Copy the definition's export patterns from `recipe_folder` into
    /// `export_folder`.
    ///
    /// # Errors
    ///
    /// See [`exports::export_sources`].
    pub fn export_sources(&self, recipe_folder: &Path, export_folder: &Path) -> Result<Vec<PathBuf>> {
        exports::export_sources(recipe_folder, &self.definition.exports, export_folder)
    }

    /// Drop options that do not apply to the target platform.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` before `init`.
    pub fn config_options(&mut self) -> Result<()> {
        self.require_init("config_options")?;
        let os = self.settings.os()?.unwrap_or_else(Os::current);
        let before: BTreeSet<String> = self.options.keys().map(str::to_string).collect();
        config::apply_platform_adjustments(&mut self.options, os);
        self.removed.extend(
            before
                .into_iter()
                .filter(|key| !self.options.contains(key)),
        );
        Ok(())
    }

    /// Apply host option overrides and validate every option value.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` before `init`, and
    /// `RecipeError::Configuration` for undeclared keys or values outside
    /// their domain.
    pub fn configure(&mut self, overrides: &OptionSet) -> Result<()> {
        self.require_init("configure")?;
        self.options =
            config::normalize_options(&self.domains, &self.options, overrides, &self.removed)?;
        for (key, value) in self.options.iter() {
            tracing::debug!("option {key} = {value}");
        }
        Ok(())
    }

    /// Resolve the ordered requirement list.
    ///
    /// Records the manual repository as the `manual_repository` option when
    /// `build_manual` is on.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` before `init`, and
    /// `RecipeError::Dependency` on a duplicate target.
    pub fn requirements(&mut self) -> Result<&[Requirement]> {
        self.require_init("requirements")?;
        let plan = DependencyGraphBuilder::new(&self.definition.requirements, &self.definition.manual)
            .build_requirements(&self.template.base_requirements(), &self.options)?;

        if let Some(repository) = plan.manual_repository {
            self.options.insert(MANUAL_REPOSITORY, repository.as_str());
        }
        tracing::info!("{} requirement(s)", plan.requirements.len());
        Ok(self.requirements.insert(plan.requirements).as_slice())
    }

    /// Declare the components this package publishes.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` before `requirements`, and
    /// `RecipeError::Configuration` if a component reference does not
    /// resolve.
    pub fn package_info(&mut self) -> Result<&[Component]> {
        let requirements = self.requirements.as_deref().ok_or_else(|| {
            RecipeError::Lifecycle("package_info requires resolved requirements".to_string())
        })?;
        let pinned = &self.definition.requirements;
        let module_alias = self.template.module_alias();

        let components = PackageInfoPublisher::new(&self.definition.libraries, module_alias.as_deref())
            .publish(
                self.layout,
                &Requirement::always(pinned.utility.clone()),
                &Requirement::always(pinned.runtime.clone()),
                requirements,
            )?;
        Ok(self.components.insert(components).as_slice())
    }

    /// Compute the toolchain from the current options.
    ///
    /// Adds [`MANUAL_TAG`] when `build_manual` is on.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` if the manual is built but the
    /// version is not resolved yet.
    pub fn resolve_toolchain(&mut self) -> Result<&Toolchain> {
        let mut variables =
            ToolchainGenerator::new(&self.definition.toolchain).generate_variables(&self.options);

        if self.options.is_enabled(BUILD_MANUAL) {
            let version = self.version.as_ref().ok_or_else(|| {
                RecipeError::Lifecycle(format!("{MANUAL_TAG} requires a resolved version"))
            })?;
            variables.insert(
                MANUAL_TAG.to_string(),
                ToolchainValue::Text(version.to_string()),
            );
        }

        Ok(&*self.toolchain.insert(Toolchain {
            generator: self.template.cmake_generator.clone(),
            variables,
        }))
    }

    /// Write the toolchain and dependency files into `dirs.build_dir` and
    /// prepare the build lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` before `requirements` or once a
    /// build has started, and `RecipeError::Io` on write failures.
    pub fn generate(&mut self, dirs: &BuildDirs) -> Result<GeneratedFiles> {
        if self.stage() > Stage::Uninitialized {
            return Err(RecipeError::Lifecycle(
                "generate cannot run after the build started".to_string(),
            ));
        }
        let toolchain = self.resolve_toolchain()?.clone();
        let requirements = self.requirements.as_deref().ok_or_else(|| {
            RecipeError::Lifecycle("generate requires resolved requirements".to_string())
        })?;

        for generator in &self.template.generators {
            tracing::debug!("Running generator {generator}");
        }
        let files = GeneratedFiles {
            toolchain: toolchain.write(&dirs.build_dir)?,
            deps: toolchain::write_deps(requirements, &dirs.build_dir)?,
        };

        self.controller = Some(BuildLifecycleController::new(BuildConfig {
            source_dir: dirs.source_dir.clone(),
            build_dir: dirs.build_dir.clone(),
            package_dir: dirs.package_dir.clone(),
            generator: toolchain.generator,
            build_type: self.settings.build_type().to_string(),
            definitions: toolchain.variables,
        }));
        Ok(files)
    }

    /// Configure and compile.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` before `generate` or on re-entry,
    /// and the backend's error if a step fails.
    pub fn build<B: BuildBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        self.controller_mut("build")?.build(backend)
    }

    /// Install into the package folder.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` before `generate` or on re-entry,
    /// and the backend's error if installation fails.
    pub fn package<B: BuildBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        self.controller_mut("package")?.package(backend)
    }

    /// Snapshot of the resolved state.
    pub fn summary(&self) -> RecipeSummary {
        RecipeSummary {
            name: self.definition.package.name.clone(),
            version: self.version.clone(),
            reference: self.reference().map(|r| r.to_string()),
            description: self.definition.package.description.clone(),
            url: self.definition.package.url.clone(),
            template: format!("{}/{}", self.template.name, self.template.version),
            layout: self.layout,
            settings: self.settings.clone(),
            options: self.options.clone(),
            requirements: self
                .requirements
                .iter()
                .flatten()
                .map(ToString::to_string)
                .collect(),
            components: self.components.clone().unwrap_or_default(),
            generators: self.template.generators.clone(),
            toolchain: self.toolchain.clone(),
            stage: self.stage(),
        }
    }

    fn require_init(&self, hook: &str) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(RecipeError::Lifecycle(format!("{hook} requires init")))
        }
    }

    fn controller_mut(&mut self, hook: &str) -> Result<&mut BuildLifecycleController> {
        self.controller
            .as_mut()
            .ok_or_else(|| RecipeError::Lifecycle(format!("{hook} requires generate")))
    }
}
