use crate::config::schema::PatcherConfig;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, TableLike};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "project-patcher.toml";
pub const CONFIG_ENV_VAR: &str = "PROJECT_PATCHER_CONFIG_FILE";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::TomlError,
    },
    Decode {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        message: String,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = Some(path.to_path_buf());
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml { path, source },
            ConfigError::Decode { path: None, source } => ConfigError::Decode { path, source },
            ConfigError::Validation {
                path: None,
                message,
            } => ConfigError::Validation { path, message },
            other => other,
        }
    }
}

fn write_location(f: &mut fmt::Formatter<'_>, path: &Option<PathBuf>) -> fmt::Result {
    match path {
        Some(path) => write!(f, " ({})", path.display()),
        None => Ok(()),
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => {
                write!(f, "failed to parse config TOML")?;
                write_location(f, path)?;
                write!(f, ": {}", source)
            }
            ConfigError::Decode { path, source } => {
                write!(f, "invalid config")?;
                write_location(f, path)?;
                write!(f, ": {}", source)
            }
            ConfigError::Validation { path, message } => {
                write!(f, "invalid config")?;
                write_location(f, path)?;
                write!(f, ": {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Decode { source, .. } => Some(source),
            ConfigError::Validation { .. } => None,
        }
    }
}

/// One candidate configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub path: PathBuf,
    /// A required layer that does not exist is an error; others are skipped.
    pub required: bool,
}

impl ConfigLayer {
    pub fn required(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }

    pub fn optional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }
}

/// Layers in priority order: explicit path, `$PROJECT_PATCHER_CONFIG_FILE`,
/// the working directory, then the user's config directory.
pub fn default_layers(explicit: Option<&Path>, cwd: &Path) -> Vec<ConfigLayer> {
    let mut layers = Vec::new();
    if let Some(path) = explicit {
        layers.push(ConfigLayer::required(path));
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        layers.push(ConfigLayer::required(path));
    }
    layers.push(ConfigLayer::optional(cwd.join(CONFIG_FILE_NAME)));
    if let Some(home) = home::home_dir() {
        layers.push(ConfigLayer::optional(
            home.join(".config").join("project-patcher").join(CONFIG_FILE_NAME),
        ));
    }
    layers
}

pub fn load_from_str(input: &str) -> Result<PatcherConfig, ConfigError> {
    let config: PatcherConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Decode { path: None, source })?;
    config
        .validate()
        .map_err(|message| ConfigError::Validation { path: None, message })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatcherConfig, ConfigError> {
    let path = path.as_ref();
    let contents = read(path)?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Merge every existing layer key by key; the first layer to set a key wins.
///
/// Each layer is decoded on its own first so errors name the offending file.
pub fn load_layers(layers: &[ConfigLayer]) -> Result<PatcherConfig, ConfigError> {
    let mut merged = DocumentMut::new();
    for layer in layers {
        if !layer.path.is_file() && !layer.required {
            debug!(path = %layer.path.display(), "config layer not present");
            continue;
        }
        let contents = read(&layer.path)?;
        load_from_str(&contents).map_err(|error| error.with_path(&layer.path))?;
        let document: DocumentMut = contents.parse().map_err(|source| ConfigError::Toml {
            path: Some(layer.path.clone()),
            source,
        })?;
        merge_missing(merged.as_table_mut(), document.as_table());
        debug!(path = %layer.path.display(), "loaded config layer");
    }
    load_from_str(&merged.to_string())
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_missing(target: &mut dyn TableLike, source: &dyn TableLike) {
    for (key, item) in source.iter() {
        match target.get_mut(key) {
            Some(existing) => {
                if let (Some(existing), Some(incoming)) =
                    (existing.as_table_like_mut(), item.as_table_like())
                {
                    merge_missing(existing, incoming);
                }
            }
            None => {
                target.insert(key, item.clone());
            }
        }
    }
}
