use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{BaseConfig, Secrets};
use crate::error::Signal;
use crate::log::LogMessages;

/// Errors from reading config files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A file or directory that must exist does not.
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    /// Reading a file failed.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A file is not valid TOML or does not match the expected shape.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
}

/// The `custom_widgets.toml` manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomManifest {
    /// Declared custom widgets.
    #[serde(default, rename = "widget")]
    pub widgets: Vec<CustomWidgetSpec>,
}

/// One externally supplied widget: a command whose stdout is the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomWidgetSpec {
    /// Plugin name; widget configs select it by this name.
    pub name: String,
    /// Program followed by its arguments.
    pub command: Vec<String>,
}

/// Reads the files of one config directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    dir: PathBuf,
    secrets: Arc<Secrets>,
}

impl ConfigLoader {
    /// Loader rooted at `dir`. Nothing is read until asked.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            secrets: Arc::new(Secrets::default()),
        }
    }

    /// The platform config directory for dashgrid, if the platform has one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dashgrid"))
    }

    /// Root of the config directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory holding one file per widget.
    pub fn widgets_dir(&self) -> PathBuf {
        self.dir.join("widgets")
    }

    /// Path of `base.toml`.
    pub fn base_path(&self) -> PathBuf {
        self.dir.join("base.toml")
    }

    /// Path of `secrets.toml`.
    pub fn secrets_path(&self) -> PathBuf {
        self.dir.join("secrets.toml")
    }

    /// Path of `custom_widgets.toml`.
    pub fn custom_manifest_path(&self) -> PathBuf {
        self.dir.join("custom_widgets.toml")
    }

    /// Fail with [`Signal::ConfigFileNotFound`] unless the directory and its
    /// `widgets/` subdirectory exist.
    pub fn ensure_exists(&self) -> Result<(), Signal> {
        for path in [self.dir.clone(), self.widgets_dir()] {
            if !path.is_dir() {
                return Err(Signal::ConfigFileNotFound { path });
            }
        }
        Ok(())
    }

    /// Re-read `secrets.toml`. A missing file means no file-based secrets; a
    /// broken one is reported as a warning and ignored.
    pub fn reload_secrets(&mut self, log: &mut LogMessages) {
        let path = self.secrets_path();
        let secrets = match Secrets::load(&path) {
            Ok(secrets) => secrets,
            Err(ConfigError::NotFound(_)) => Secrets::default(),
            Err(e) => {
                log.warning(format!("{e}; ignoring file-based secrets"));
                Secrets::default()
            }
        };
        self.secrets = Arc::new(secrets);
    }

    /// Secrets loaded by the last [`reload_secrets`](ConfigLoader::reload_secrets).
    pub fn secrets(&self) -> Arc<Secrets> {
        self.secrets.clone()
    }

    /// Load `base.toml`, falling back to defaults (with a warning) when the
    /// file is absent. A file that cannot be parsed is a config error.
    pub fn load_base_config(&self, log: &mut LogMessages) -> Result<BaseConfig, Signal> {
        let path = self.base_path();
        match read_toml::<BaseConfig>(&path) {
            Ok(base) => Ok(base),
            Err(ConfigError::NotFound(_)) => {
                log.warning(format!(
                    "{} not found; using default settings",
                    path.display()
                ));
                Ok(BaseConfig::default())
            }
            Err(e) => {
                let mut problems = LogMessages::new();
                problems.error(e.to_string());
                Err(Signal::ConfigSpecific(problems))
            }
        }
    }

    /// Every `*.toml` file under `widgets/`, sorted by file name.
    pub fn widget_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let dir = self.widgets_dir();
        let entries = fs::read_dir(&dir).map_err(|source| io_error(&dir, source))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|source| io_error(&dir, source))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read and validate `custom_widgets.toml`. A missing manifest means no
    /// custom plugins.
    pub fn load_custom_manifest(&self) -> Result<Vec<CustomWidgetSpec>, LogMessages> {
        let path = self.custom_manifest_path();
        let manifest = match read_toml::<CustomManifest>(&path) {
            Ok(manifest) => manifest,
            Err(ConfigError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => {
                let mut problems = LogMessages::new();
                problems.error(e.to_string());
                return Err(problems);
            }
        };

        let mut problems = LogMessages::new();
        let mut seen = HashSet::new();
        for (index, spec) in manifest.widgets.iter().enumerate() {
            if spec.name.trim().is_empty() {
                problems.error(format!(
                    "{}: widget #{} has an empty name",
                    path.display(),
                    index + 1
                ));
            } else if !seen.insert(spec.name.as_str()) {
                problems.error(format!(
                    "{}: custom widget \"{}\" is declared more than once",
                    path.display(),
                    spec.name
                ));
            }
            if spec.command.first().is_none_or(|program| program.trim().is_empty()) {
                problems.error(format!(
                    "{}: custom widget \"{}\" has no command",
                    path.display(),
                    spec.name
                ));
            }
        }

        if problems.is_empty() {
            Ok(manifest.widgets)
        } else {
            Err(problems)
        }
    }
}

pub(crate) fn read_to_string(path: &Path) -> Result<String, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(io_error(path, source)),
    }
}

pub(crate) fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = read_to_string(path)?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn io_error(path: &Path, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.to_path_buf(),
        source,
    }
}
