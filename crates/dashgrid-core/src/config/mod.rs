//! Declarative configuration consumed by the runtime.
//!
//! A config directory holds:
//!
//! | Path | Contents |
//! |------|----------|
//! | `base.toml` | [`BaseConfig`]: frame pacing, key bindings, layout mode |
//! | `widgets/*.toml` | one [`Config`] per widget |
//! | `secrets.toml` | optional [`Secrets`] table |
//! | `custom_widgets.toml` | optional [`CustomManifest`] of external plugins |
//!
//! [`ConfigLoader`] reads these files and [`ConfigScanner`] validates the
//! widget files as a whole before any session starts.

mod loader;
mod scanner;
mod secrets;

pub use loader::{ConfigError, ConfigLoader, CustomManifest, CustomWidgetSpec};
pub use scanner::ConfigScanner;
pub use secrets::Secrets;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dimensions::{BaseDimensions, LayoutMode};

/// Validated, immutable configuration of one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Unique key; also selects the plugin.
    pub name: String,
    /// Text shown in the widget's top border.
    pub title: String,
    /// Disabled widgets are never scheduled, drawn or focused.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between refreshes. `None` means refresh once.
    #[serde(default)]
    pub interval: Option<f64>,
    /// Declared geometry.
    pub dimensions: BaseDimensions,
    /// Plugin-specific keys, passed through untouched.
    #[serde(flatten)]
    pub options: toml::Table,
    /// File the config was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Minimal config, handy for tests and programmatic setups.
    pub fn new(name: impl Into<String>, title: impl Into<String>, dimensions: BaseDimensions) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            enabled: true,
            interval: None,
            dimensions,
            options: toml::Table::new(),
            source: None,
        }
    }

    /// Builder-style setter for [`interval`](Config::interval).
    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.interval = Some(seconds);
        self
    }

    /// Builder-style setter for [`enabled`](Config::enabled).
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder-style setter for a plugin-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Refresh interval as a [`Duration`].
    pub fn interval(&self) -> Option<Duration> {
        self.interval
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64)
    }

    /// A plugin-specific string option.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(toml::Value::as_str)
    }
}

/// Key bindings for the global commands, as written in `base.toml`.
///
/// Values are key names: a single character (`"q"`), or one of `Esc`,
/// `Enter`, `Tab`, `Backspace`, `F1`..`F12`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Quit the dashboard.
    pub quit: String,
    /// Reload config and rebuild every widget.
    pub reload: String,
    /// Toggle help mode on the focused widget.
    pub help: String,
    /// Clear focus.
    pub unfocus: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: "q".into(),
            reload: "R".into(),
            help: "h".into(),
            unfocus: "Esc".into(),
        }
    }
}

/// Runtime-wide settings from `base.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// Milliseconds between frames.
    pub frame_ms: u64,
    /// Milliseconds between scheduler ticks.
    pub tick_ms: u64,
    /// Capture mouse events.
    pub mouse: bool,
    /// How long shutdown waits for the scheduler thread.
    pub shutdown_grace_ms: u64,
    /// Pause before retrying startup after the terminal was too small.
    pub resize_retry_ms: u64,
    /// Global key bindings.
    pub keys: KeyBindings,
    /// How declared geometry maps onto the terminal.
    pub layout: LayoutMode,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            frame_ms: 50,
            tick_ms: 50,
            mouse: true,
            shutdown_grace_ms: 1000,
            resize_retry_ms: 500,
            keys: KeyBindings::default(),
            layout: LayoutMode::default(),
        }
    }
}

impl BaseConfig {
    /// Frame period.
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }

    /// Scheduler tick period.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Shutdown grace period for the scheduler thread.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Delay before retrying startup after a too-small terminal.
    pub fn resize_retry(&self) -> Duration {
        Duration::from_millis(self.resize_retry_ms)
    }
}

fn default_true() -> bool {
    true
}
