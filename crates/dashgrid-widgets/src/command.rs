//! Widgets backed by an external program.
//!
//! Each entry of `custom_widgets.toml` becomes one plugin. Its `update` runs
//! the program on the scheduler thread and publishes stdout, one line per
//! row. A spawn failure or a non-zero exit is a [`WidgetError`] carrying the
//! first line of stderr.

use std::process::Command;

use dashgrid_core::config::CustomWidgetSpec;
use dashgrid_core::{Content, Plugin, WidgetError};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use crate::ansi;

/// Build the plugin for one manifest entry.
pub fn plugin(spec: &CustomWidgetSpec) -> Plugin {
    let command = spec.command.clone();
    Plugin::new(|ctx, content| {
        if let Some(lines) = content.and_then(Content::as_lines) {
            let lines: Vec<Line<'static>> = lines.iter().map(|l| ansi::styled(l)).collect();
            ctx.canvas.render(Paragraph::new(lines));
        }
        Ok(())
    })
    .with_update(move |ctx| {
        let area = ctx.widget.area();
        let env = [
            ("DASHGRID_WIDGET", ctx.widget.name().to_string()),
            ("DASHGRID_WIDTH", area.width.saturating_sub(2).to_string()),
            ("DASHGRID_HEIGHT", area.height.saturating_sub(2).to_string()),
        ];
        run(&command, env).map(Content::lines)
    })
}

/// Run `command` to completion and return its stdout lines.
pub fn run<I, K, V>(command: &[String], env: I) -> Result<Vec<String>, WidgetError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<std::ffi::OsStr>,
    V: AsRef<std::ffi::OsStr>,
{
    let Some((program, args)) = command.split_first() else {
        return Err(WidgetError::failed("empty command"));
    };
    tracing::debug!(%program, "running widget command");
    let output = Command::new(program)
        .args(args)
        .envs(env)
        .output()
        .map_err(|e| WidgetError::failed(format!("cannot run `{program}`: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.lines().map(str::trim).find(|l| !l.is_empty());
        return Err(WidgetError::failed(match reason {
            Some(reason) => format!("`{program}` {}: {}", output.status, ansi::plain(reason)),
            None => format!("`{program}` {}", output.status),
        }));
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use dashgrid_core::testing::TestDashboard;
    use dashgrid_core::{BaseDimensions, Config, PluginRegistry};
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    fn no_env() -> [(&'static str, &'static str); 0] {
        []
    }

    #[test]
    fn stdout_lines_are_the_content() {
        let lines = run(&sh("printf 'one\\ntwo\\n'"), no_env()).unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn non_zero_exit_reports_stderr() {
        let err = run(&sh("echo '  ' >&2; echo 'api down' >&2; exit 3"), no_env()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("api down"), "{message}");
        assert!(message.contains('3'), "{message}");
    }

    #[test]
    fn missing_program_and_empty_command_fail() {
        let err = run(&["dashgrid-no-such-program".to_string()], no_env()).unwrap_err();
        assert!(err.to_string().starts_with("cannot run"));
        assert_eq!(run(&[], no_env()), Err(WidgetError::failed("empty command")));
    }

    #[test]
    fn widget_sees_its_geometry_and_draws_colored_output() {
        let spec = CustomWidgetSpec {
            name: "sizes".into(),
            command: sh("printf '\\033[32m%s %sx%s\\033[0m\\n' \"$DASHGRID_WIDGET\" \"$DASHGRID_WIDTH\" \"$DASHGRID_HEIGHT\""),
        };
        let registry = PluginRegistry::new().with("sizes", plugin(&spec));
        let config = Config::new("sizes", "Sizes", BaseDimensions::new(0, 0, 20, 4)).with_interval(5.0);
        let mut dash = TestDashboard::new(&registry, vec![config], 20, 4).unwrap();
        dash.tick(Instant::now());
        dash.frame().unwrap();
        let screen = dash.render_string();
        assert!(screen.contains("sizes 18x2"), "{screen}");
        assert!(!screen.contains('\u{1b}'));
    }
}
