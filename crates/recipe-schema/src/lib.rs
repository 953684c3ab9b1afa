//! Shared data model for package recipes.
//!
//! These types are consumed by `recipe-core` and serialized by the host
//! driver when it reports a resolved recipe.

pub mod component;
pub mod options;
pub mod platform;
pub mod requirement;
pub mod toolchain;
pub mod types;

// Re-exports
pub use component::{Component, ComponentRef};
pub use options::{OptionDomain, OptionDomains, OptionSet, OptionValue};
pub use platform::{Os, Settings};
pub use requirement::{Activation, Requirement};
pub use toolchain::{ToolchainValue, ToolchainVariables};
pub use types::{PackageName, Reference, SchemaError, Version};
