//! Builtin widget plugins for **dashgrid**.
//!
//! Every plugin here is a plain [`Plugin`] value: a set of callbacks the
//! runtime binds to each widget config that names it.
//!
//! # Plugins
//!
//! | Name | Module | Refresh | Description |
//! |------|--------|---------|-------------|
//! | `clock` | [`clock`] | every frame | Weekday, date and time |
//! | `calendar` | [`calendar`] | every frame | Month grid, today highlighted |
//! | `greetings` | [`greetings`] | every frame | Greets the `who` option |
//! | `mode` | [`mode`] | every frame | Name of the focused widget |
//! | `resources` | [`resources`] | `interval` | CPU, memory, swap, disk, network, load and uptime |
//! | `game` | [`game`] | on input | 2048, with a help screen |
//!
//! Entries of `custom_widgets.toml` become [`command`] plugins, which run an
//! external program and show its output. [`BuiltinPlugins`] merges both sets
//! and is what the `dashgrid` binary hands to the driver.

pub mod ansi;
pub mod calendar;
pub mod clock;
pub mod command;
pub mod game;
pub mod greetings;
pub mod mode;
pub mod resources;

use dashgrid_core::{ConfigLoader, LogMessages, Plugin, PluginRegistry, PluginSource};

/// Names and constructors of every builtin plugin.
pub const BUILTINS: [(&str, fn() -> Plugin); 6] = [
    ("calendar", calendar::plugin),
    ("clock", clock::plugin),
    ("game", game::plugin),
    ("greetings", greetings::plugin),
    ("mode", mode::plugin),
    ("resources", resources::plugin),
];

/// Every builtin plugin.
pub fn builtin_registry() -> PluginRegistry {
    BUILTINS
        .iter()
        .fold(PluginRegistry::new(), |registry, (name, build)| {
            registry.with(*name, build())
        })
}

/// Builtin plugins plus the command plugins declared in the config
/// directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPlugins;

impl PluginSource for BuiltinPlugins {
    fn builtin(&self) -> PluginRegistry {
        builtin_registry()
    }

    fn custom(&self, loader: &ConfigLoader) -> Result<PluginRegistry, LogMessages> {
        let specs = loader.load_custom_manifest()?;
        Ok(specs.iter().fold(PluginRegistry::new(), |registry, spec| {
            registry.with(spec.name.clone(), command::plugin(spec))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn every_builtin_is_registered() {
        let registry = builtin_registry();
        assert_eq!(
            registry.names(),
            vec!["calendar", "clock", "game", "greetings", "mode", "resources"]
        );
        assert!(registry.get("resources").unwrap().has_update());
        assert!(registry.get("game").unwrap().has_help());
        assert!(!registry.get("clock").unwrap().has_update());
    }

    #[test]
    fn custom_manifest_overrides_builtins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("custom_widgets.toml"),
            r#"
            [[widget]]
            name = "clock"
            command = ["date"]

            [[widget]]
            name = "weather"
            command = ["curl", "-s", "wttr.in?format=3"]
            "#,
        )
        .unwrap();
        let loader = ConfigLoader::new(dir.path());
        let registry = BuiltinPlugins.registry(&loader).unwrap();
        assert_eq!(registry.len(), 7);
        assert!(registry.get("clock").unwrap().has_update());
        assert!(registry.contains("weather"));
    }

    #[test]
    fn missing_manifest_means_builtins_only() {
        let dir = tempfile::tempdir().unwrap();
        let registry = BuiltinPlugins.registry(&ConfigLoader::new(dir.path())).unwrap();
        assert_eq!(registry.len(), BUILTINS.len());
    }

    #[test]
    fn broken_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("custom_widgets.toml"),
            "[[widget]]\nname = \"x\"\ncommand = []\n",
        )
        .unwrap();
        let problems = BuiltinPlugins
            .registry(&ConfigLoader::new(dir.path()))
            .unwrap_err();
        assert!(problems.has_errors());
    }
}
