//! Tool configuration: `project-patcher.toml` merged across layers.

pub mod loader;
pub mod schema;

pub use loader::{
    default_layers, load_from_path, load_from_str, load_layers, ConfigError, ConfigLayer,
    CONFIG_ENV_VAR, CONFIG_FILE_NAME,
};
pub use schema::{LogSettings, PatcherConfig, ProjectSettings};
