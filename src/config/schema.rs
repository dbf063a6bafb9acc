use crate::metadata::DEFAULT_METADATA_FILE;
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Decoded `project-patcher.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatcherConfig {
    pub project: ProjectSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSettings {
    /// Warn that third-party files are about to be downloaded.
    pub display_warning_message: bool,
    /// Metadata document, relative to the project root.
    pub metadata: PathBuf,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            display_warning_message: true,
            metadata: PathBuf::from(DEFAULT_METADATA_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PatcherConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.project.metadata.as_os_str().is_empty() {
            return Err("project.metadata must not be empty".to_string());
        }
        EnvFilter::try_new(&self.log.level)
            .map(|_| ())
            .map_err(|err| format!("log.level {:?} is not a valid filter: {err}", self.log.level))
    }
}
