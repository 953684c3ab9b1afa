//! Configure → build → package sequencing.
//!
//! The configured build object is created once per invocation and cached;
//! `build` and `package` reuse it. Stages only move forward:
//!
//! | From | `configure` | `build` | `package` |
//! |---|---|---|---|
//! | `Uninitialized` | → `Configured` | → `Built` | → `Packaged` |
//! | `Configured` | cached | → `Built` | → `Packaged` |
//! | `Built` | cached | error | → `Packaged` |
//! | `Packaged` | cached | error | error |

use std::collections::BTreeMap;
use std::path::PathBuf;

use recipe_schema::ToolchainVariables;
use serde::Serialize;

use crate::error::{RecipeError, Result};

/// Lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    /// No build object yet.
    Uninitialized,
    /// Build object created and definitions applied.
    Configured,
    /// External compilation finished.
    Built,
    /// External install finished.
    Packaged,
}

/// Inputs for creating the build object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfig {
    /// Exported sources.
    pub source_dir: PathBuf,
    /// Native build tree.
    pub build_dir: PathBuf,
    /// Install prefix for `package`.
    pub package_dir: PathBuf,
    /// Native generator (e.g. `Ninja`); the build system's default when unset.
    pub generator: Option<String>,
    /// `Release`, `Debug`, ...
    pub build_type: String,
    /// Option-derived definitions.
    pub definitions: ToolchainVariables,
}

/// The configured build object handed to every external step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildObject {
    /// Exported sources.
    pub source_dir: PathBuf,
    /// Native build tree.
    pub build_dir: PathBuf,
    /// Install prefix.
    pub package_dir: PathBuf,
    /// Native generator.
    pub generator: Option<String>,
    /// Build type.
    pub build_type: String,
    definitions: BTreeMap<String, String>,
    applications: usize,
}

impl BuildObject {
    fn new(config: &BuildConfig) -> Self {
        Self {
            source_dir: config.source_dir.clone(),
            build_dir: config.build_dir.clone(),
            package_dir: config.package_dir.clone(),
            generator: config.generator.clone(),
            build_type: config.build_type.clone(),
            definitions: BTreeMap::new(),
            applications: 0,
        }
    }

    /// Apply definitions to this object.
    pub fn apply_definitions(&mut self, definitions: &ToolchainVariables) {
        for (key, value) in definitions {
            self.definitions.insert(key.clone(), value.as_definition());
        }
        self.applications += 1;
    }

    /// Definitions as `KEY -> VALUE` strings, sorted by key.
    pub fn definitions(&self) -> &BTreeMap<String, String> {
        &self.definitions
    }

    /// How many times definitions were applied.
    pub fn definition_applications(&self) -> usize {
        self.applications
    }
}

/// External build-system collaborator.
pub trait BuildBackend {
    /// Generate the native build tree for `build`.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Build` if the generation step fails.
    fn configure(&self, build: &BuildObject) -> Result<()>;

    /// Compile the configured tree.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Build` if compilation fails.
    fn build(&self, build: &BuildObject) -> Result<()>;

    /// Install build outputs into `build.package_dir`.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Build` if installation fails.
    fn install(&self, build: &BuildObject) -> Result<()>;
}

impl<T: BuildBackend + ?Sized> BuildBackend for &T {
    fn configure(&self, build: &BuildObject) -> Result<()> {
        (**self).configure(build)
    }
    fn build(&self, build: &BuildObject) -> Result<()> {
        (**self).build(build)
    }
    fn install(&self, build: &BuildObject) -> Result<()> {
        (**self).install(build)
    }
}

impl<T: BuildBackend + ?Sized> BuildBackend for Box<T> {
    fn configure(&self, build: &BuildObject) -> Result<()> {
        (**self).configure(build)
    }
    fn build(&self, build: &BuildObject) -> Result<()> {
        (**self).build(build)
    }
    fn install(&self, build: &BuildObject) -> Result<()> {
        (**self).install(build)
    }
}

/// Owns the configured build object and the current stage.
#[derive(Debug)]
pub struct BuildLifecycleController {
    config: BuildConfig,
    stage: Stage,
    cached: Option<BuildObject>,
}

impl BuildLifecycleController {
    /// A controller in `Uninitialized`.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            stage: Stage::Uninitialized,
            cached: None,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The cached build object, once configured.
    pub fn build_object(&self) -> Option<&BuildObject> {
        self.cached.as_ref()
    }

    /// Create the build object and apply definitions, or return the cached
    /// object. Definitions are applied exactly once per controller.
    pub fn configure(&mut self) -> &BuildObject {
        let config = &self.config;
        let stage = &mut self.stage;
        self.cached.get_or_insert_with(|| {
            let mut object = BuildObject::new(config);
            object.apply_definitions(&config.definitions);
            *stage = Stage::Configured;
            tracing::info!(
                "Configured build in {} ({} definitions)",
                object.build_dir.display(),
                object.definitions.len()
            );
            object
        })
    }

    /// Configure if needed, then generate and compile.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` if already built or packaged, or the
    /// backend's error if a step fails.
    pub fn build<B: BuildBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        if self.stage >= Stage::Built {
            return Err(RecipeError::Lifecycle(format!(
                "cannot build from stage {:?}",
                self.stage
            )));
        }
        let object = self.configure();
        backend.configure(object)?;
        backend.build(object)?;
        self.stage = Stage::Built;
        tracing::info!("Build finished");
        Ok(())
    }

    /// Configure if needed, then install.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Lifecycle` if already packaged, or the
    /// backend's error if installation fails.
    pub fn package<B: BuildBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        if self.stage == Stage::Packaged {
            return Err(RecipeError::Lifecycle(
                "package already ran for this invocation".to_string(),
            ));
        }
        let object = self.configure();
        backend.install(object)?;
        self.stage = Stage::Packaged;
        tracing::info!("Packaged into {}", self.config.package_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_schema::ToolchainValue;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<&'static str>>,
        fail_on: Option<&'static str>,
    }

    impl Recorder {
        fn record(&self, step: &'static str) -> Result<()> {
            self.calls.borrow_mut().push(step);
            if self.fail_on == Some(step) {
                return Err(RecipeError::build(step, "exit status 2"));
            }
            Ok(())
        }
    }

    impl BuildBackend for Recorder {
        fn configure(&self, _: &BuildObject) -> Result<()> {
            self.record("configure")
        }
        fn build(&self, _: &BuildObject) -> Result<()> {
            self.record("build")
        }
        fn install(&self, _: &BuildObject) -> Result<()> {
            self.record("install")
        }
    }

    fn config() -> BuildConfig {
        BuildConfig {
            source_dir: PathBuf::from("/src"),
            build_dir: PathBuf::from("/build"),
            package_dir: PathBuf::from("/pkg"),
            generator: Some("Ninja".to_string()),
            build_type: "Release".to_string(),
            definitions: ToolchainVariables::from([(
                "CPPQL_BIND_ZERO_BASED_INDICES".to_string(),
                ToolchainValue::Bool(true),
            )]),
        }
    }

    #[test]
    fn test_definitions_applied_once() {
        let backend = Recorder::default();
        let mut controller = BuildLifecycleController::new(config());

        controller.configure();
        controller.configure();
        controller.build(&backend).unwrap();
        controller.package(&backend).unwrap();

        let object = controller.build_object().unwrap();
        assert_eq!(object.definition_applications(), 1);
        assert_eq!(
            object.definitions().get("CPPQL_BIND_ZERO_BASED_INDICES"),
            Some(&"ON".to_string())
        );
        assert_eq!(controller.stage(), Stage::Packaged);
        assert_eq!(*backend.calls.borrow(), vec!["configure", "build", "install"]);
    }

    #[test]
    fn test_build_configures_implicitly() {
        let backend = Recorder::default();
        let mut controller = BuildLifecycleController::new(config());
        assert_eq!(controller.stage(), Stage::Uninitialized);
        controller.build(&backend).unwrap();
        assert_eq!(controller.stage(), Stage::Built);
        assert_eq!(controller.build_object().unwrap().definition_applications(), 1);
    }

    #[test]
    fn test_package_without_build() {
        let backend = Recorder::default();
        let mut controller = BuildLifecycleController::new(config());
        controller.package(&backend).unwrap();
        assert_eq!(*backend.calls.borrow(), vec!["install"]);
        assert_eq!(controller.stage(), Stage::Packaged);
    }

    #[test]
    fn test_no_stage_reentry() {
        let backend = Recorder::default();
        let mut controller = BuildLifecycleController::new(config());
        controller.build(&backend).unwrap();
        assert!(matches!(
            controller.build(&backend),
            Err(RecipeError::Lifecycle(_))
        ));
        controller.package(&backend).unwrap();
        assert!(matches!(
            controller.package(&backend),
            Err(RecipeError::Lifecycle(_))
        ));
        assert!(controller.build(&backend).is_err());
        assert_eq!(controller.configure().definition_applications(), 1);
    }

    #[test]
    fn test_failed_step_aborts_without_advancing() {
        let backend = Recorder {
            fail_on: Some("build"),
            ..Recorder::default()
        };
        let mut controller = BuildLifecycleController::new(config());
        let err = controller.build(&backend).unwrap_err();
        assert!(matches!(err, RecipeError::Build { step: "build", .. }));
        assert_eq!(controller.stage(), Stage::Configured);
    }
}
