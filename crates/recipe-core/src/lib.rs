pub mod backend;
pub mod config;
pub mod definition;
pub mod error;
pub mod exports;
pub mod lifecycle;
pub mod package_info;
pub mod paths;
pub mod recipe;
pub mod requirements;
pub mod template;
pub mod toolchain;

pub use backend::CMakeBackend;
pub use definition::{PackageLayout, RecipeDefinition};
pub use error::{RecipeError, Result};
pub use lifecycle::{BuildBackend, BuildConfig, BuildLifecycleController, BuildObject, Stage};
pub use package_info::PackageInfoPublisher;
pub use paths::*;
pub use recipe::{BuildDirs, GeneratedFiles, PackageRecipe, RecipeSummary};
pub use requirements::{DependencyGraphBuilder, RequirementPlan};
pub use template::BaseTemplate;
pub use toolchain::{Toolchain, ToolchainGenerator};
