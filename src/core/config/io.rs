use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tempfile::NamedTempFile;

use crate::core::config::data::{path_display, Config};

const CONFIG_FILE: &str = "config.toml";

/// Failures while locating, reading or saving `config.toml`.
#[derive(Debug)]
pub enum ConfigError {
    /// The platform reported no config directory for this user.
    NoConfigDir,
    Read { path: PathBuf, source: io::Error },
    /// The file exists but is not a valid recipecast config.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Encode(toml::ser::Error),
    Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoConfigDir => f.write_str("No config directory is available for this user"),
            ConfigError::Read { path, source } => {
                write!(f, "Could not read {}: {source}", path_display(path))
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Invalid config in {}: {source}", path_display(path))
            }
            ConfigError::Encode(source) => write!(f, "Could not encode config: {source}"),
            ConfigError::Write { path, source } => {
                write!(f, "Could not save {}: {source}", path_display(path))
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::NoConfigDir => None,
            ConfigError::Read { source, .. } | ConfigError::Write { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Encode(source) => Some(source),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        Self::load_from_path(&Self::get_config_path()?)
    }

    /// A missing file means every key is at its default.
    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        let contents = match fs::read_to_string(config_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: config_path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    /// Write through a sibling temp file so a crash never leaves a
    /// half-written config behind.
    pub(crate) fn save_to_path(&self, config_path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Encode)?;
        let write_err = |source: io::Error| ConfigError::Write {
            path: config_path.to_path_buf(),
            source,
        };

        let dir = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut staged = NamedTempFile::new_in(dir).map_err(write_err)?;
        staged.write_all(contents.as_bytes()).map_err(write_err)?;
        staged.as_file_mut().sync_all().map_err(write_err)?;
        staged
            .persist(config_path)
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }

    /// Load, apply `mutator`, and persist only if it succeeds.
    pub fn mutate_at<F, T>(config_path: &Path, mutator: F) -> Result<T, Box<dyn StdError>>
    where
        F: FnOnce(&mut Config) -> Result<T, Box<dyn StdError>>,
    {
        let mut working = Self::load_from_path(config_path)?;
        let result = mutator(&mut working)?;
        working.save_to_path(config_path)?;
        Ok(result)
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("org", "recipecast", "recipecast")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }
}
