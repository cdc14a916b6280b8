//! A friendly static greeting.

use dashgrid_core::Plugin;
use ratatui::layout::Alignment;
use ratatui::widgets::{Paragraph, Wrap};

/// The `greetings` plugin. Options: `who` (default `"there"`).
pub fn plugin() -> Plugin {
    Plugin::new(|ctx, _| {
        let text = greeting(ctx.widget.config().option_str("who"));
        ctx.canvas.render(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
        );
        Ok(())
    })
}

/// `"Hello, <name>!"`, defaulting to `"there"` for a missing or blank name.
pub fn greeting(name: Option<&str>) -> String {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("there");
    format!("Hello, {name}!")
}
