//! The default config directory written by `dashgrid init`.
//!
//! The builtin widgets are laid out to fit a 100x30 terminal.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// One file of the default config directory.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    /// Path relative to the config directory.
    pub path: &'static str,
    /// File contents.
    pub contents: &'static str,
}

/// Every file `init` writes.
pub const TEMPLATES: &[Template] = &[
    Template {
        path: "base.toml",
        contents: r#"# Milliseconds between frames and between scheduler ticks.
frame_ms = 50
tick_ms = 50

# Click a widget to focus it.
mouse = true

# How long shutdown waits for a running widget update.
shutdown_grace_ms = 1000

# Pause before retrying when the terminal is too small.
resize_retry_ms = 500

[keys]
quit = "q"
reload = "R"
help = "h"
unfocus = "Esc"

[layout]
mode = "fixed"
"#,
    },
    Template {
        path: "secrets.toml",
        contents: "# API keys for widgets, e.g.\n# weather_api_key = \"...\"\n",
    },
    Template {
        path: "custom_widgets.toml",
        contents: r#"# Widgets backed by an external program. Stdout becomes the content.
#
# [[widget]]
# name = "weather"
# command = ["curl", "-s", "wttr.in?format=3"]
"#,
    },
    Template {
        path: "widgets/clock.toml",
        contents: r#"name = "clock"
title = "Clock"

[dimensions]
x = 0
y = 0
width = 30
height = 5
"#,
    },
    Template {
        path: "widgets/greetings.toml",
        contents: r#"name = "greetings"
title = "Welcome"
who = "there"

[dimensions]
x = 30
y = 0
width = 40
height = 5
"#,
    },
    Template {
        path: "widgets/mode.toml",
        contents: r#"name = "mode"
title = "Mode"

[dimensions]
x = 70
y = 0
width = 30
height = 5
"#,
    },
    Template {
        path: "widgets/calendar.toml",
        contents: r#"name = "calendar"
title = "Calendar"

[dimensions]
x = 0
y = 5
width = 30
height = 10
"#,
    },
    Template {
        path: "widgets/resources.toml",
        contents: r#"name = "resources"
title = "Resources"
interval = 2.0

[dimensions]
x = 30
y = 5
width = 40
height = 10
"#,
    },
    Template {
        path: "widgets/game.toml",
        contents: r#"name = "game"
title = "2048"

[dimensions]
x = 70
y = 5
width = 30
height = 8
"#,
    },
];

/// Write every template below `dir`.
///
/// Without `force`, nothing is written if any of the files already exists.
pub fn write_default_config(dir: &Path, force: bool) -> Result<Vec<PathBuf>> {
    let targets: Vec<(PathBuf, &Template)> =
        TEMPLATES.iter().map(|t| (dir.join(t.path), t)).collect();

    if !force {
        let existing: Vec<String> = targets
            .iter()
            .filter(|(path, _)| path.exists())
            .map(|(path, _)| path.display().to_string())
            .collect();
        if !existing.is_empty() {
            bail!(
                "refusing to overwrite {} (pass --force to replace them)",
                existing.join(", ")
            );
        }
    }

    let mut written = Vec::with_capacity(targets.len());
    for (path, template) in targets {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&path, template.contents)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote config template");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashgrid_core::{prepare, ConfigLoader, LogMessages};
    use dashgrid_widgets::BuiltinPlugins;
    use ratatui::layout::Size;

    #[test]
    fn default_config_prepares_and_fits() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_default_config(dir.path(), false).unwrap();
        assert_eq!(written.len(), TEMPLATES.len());

        let mut loader = ConfigLoader::new(dir.path());
        let mut log = LogMessages::new();
        let mut prepared = prepare(&mut loader, &BuiltinPlugins, &mut log).unwrap();
        assert!(!log.has_errors(), "{log}");
        assert_eq!(prepared.container.widgets().len(), 6);

        let terminal = Size::new(100, 30);
        prepared.container.recompute_bounds(terminal);
        assert!(prepared.container.validate_terminal_size(terminal).is_ok());
    }

    #[test]
    fn existing_files_are_kept_without_force() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("base.toml"), "frame_ms = 10\n").unwrap();

        let err = write_default_config(dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("base.toml"));
        assert!(!dir.path().join("widgets").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("base.toml")).unwrap(),
            "frame_ms = 10\n"
        );

        write_default_config(dir.path(), true).unwrap();
        assert!(fs::read_to_string(dir.path().join("base.toml"))
            .unwrap()
            .contains("frame_ms = 50"));
    }
}
