//! Layered YAML configuration: loading, normalization, merging and the task
//! field schema.

pub mod loader;
pub mod merge;
pub mod package_path;
pub mod schema;
pub mod task;

pub use loader::{load_yaml, parse_yaml};
pub use merge::{DEFAULT_SENTINEL, overlay, overlay_all};
pub use package_path::{PackageLocator, SearchPathLocator};
pub use task::{TaskArgs, TaskDefinition};

/// Key of the default-config entry merged under every task.
pub const DEFAULTS_KEY: &str = "_defaults";

/// Prefix of default-config keys that are never tasks.
pub const RESERVED_PREFIX: char = '_';
