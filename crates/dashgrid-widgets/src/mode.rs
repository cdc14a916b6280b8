//! Shows which widget currently has focus.

use dashgrid_core::Plugin;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

/// The `mode` plugin.
pub fn plugin() -> Plugin {
    Plugin::new(|ctx, _| {
        ctx.canvas.render(Paragraph::new(status_line(ctx.focused)));
        Ok(())
    })
}

/// `Focus: <name>`, or a hint when nothing is focused.
pub fn status_line(focused: Option<&str>) -> Line<'static> {
    match focused {
        Some(name) => Line::from(vec![
            Span::raw("Focus: "),
            Span::styled(name.to_string(), Style::default().fg(Color::Cyan)),
        ]),
        None => Line::from(Span::styled(
            "Click a widget to focus it",
            Style::default().fg(Color::DarkGray),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashgrid_core::testing::TestDashboard;
    use dashgrid_core::{BaseDimensions, Config, PluginRegistry};

    #[test]
    fn follows_focus() {
        let registry = PluginRegistry::new()
            .with("mode", plugin())
            .with("other", Plugin::new(|_, _| Ok(())));
        let configs = vec![
            Config::new("mode", "Mode", BaseDimensions::new(0, 0, 30, 3)),
            Config::new("other", "Other", BaseDimensions::new(0, 3, 30, 3)),
        ];
        let mut dash = TestDashboard::new(&registry, configs, 30, 6).unwrap();
        dash.frame().unwrap();
        assert!(dash.render_string().contains("Click a widget"));

        dash.click(5, 4);
        dash.frame().unwrap();
        assert!(dash.render_string().contains("Focus: other"));
    }
}
