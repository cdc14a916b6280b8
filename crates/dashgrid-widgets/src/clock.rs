//! Wall clock: weekday, date and time, drawn fresh every frame.

use chrono::{DateTime, Local, TimeZone};
use dashgrid_core::Plugin;
use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

/// The `clock` plugin. Options: `format` (strftime pattern for the time
/// line, default `%H:%M:%S`).
pub fn plugin() -> Plugin {
    Plugin::new(|ctx, _| {
        let format = ctx.widget.config().option_str("format").unwrap_or("%H:%M:%S");
        let lines = clock_lines(&Local::now(), format);
        ctx.canvas
            .render(Paragraph::new(lines).alignment(Alignment::Center));
        Ok(())
    })
}

/// Weekday, date, then time in `format`.
pub fn clock_lines<Tz: TimeZone>(now: &DateTime<Tz>, format: &str) -> Vec<Line<'static>>
where
    Tz::Offset: std::fmt::Display,
{
    vec![
        Line::from(now.format("%A").to_string()),
        Line::from(now.format("%Y-%m-%d").to_string()),
        Line::from(Span::styled(
            now.format(format).to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap();
        FixedOffset::east_opt(0)
            .unwrap()
            .from_local_datetime(&naive)
            .unwrap()
    }

    #[test]
    fn lines_show_weekday_date_and_time() {
        let lines = clock_lines(&at(9, 5, 7), "%H:%M:%S");
        let text: Vec<String> = lines.iter().map(ToString::to_string).collect();
        assert_eq!(text, vec!["Friday", "2024-03-01", "09:05:07"]);
    }

    #[test]
    fn time_format_is_configurable() {
        let lines = clock_lines(&at(21, 30, 0), "%I:%M %p");
        assert_eq!(lines[2].to_string(), "09:30 PM");
    }
}
