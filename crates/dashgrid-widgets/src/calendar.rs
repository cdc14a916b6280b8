//! Month calendar with today highlighted.

use chrono::{Datelike, Local, NaiveDate};
use dashgrid_core::Plugin;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

const WEEKDAYS: &str = "Mo Tu We Th Fr Sa Su";

/// The `calendar` plugin.
pub fn plugin() -> Plugin {
    Plugin::new(|ctx, _| {
        ctx.canvas.render(Paragraph::new(month_lines(Local::now().date_naive())));
        Ok(())
    })
}

/// Day numbers of `date`'s month laid out in Monday-first weeks.
pub fn month_grid(date: NaiveDate) -> Vec<[Option<u32>; 7]> {
    let Some(first) = date.with_day(1) else {
        return Vec::new();
    };
    let offset = first.weekday().num_days_from_monday() as usize;
    let mut weeks = Vec::new();
    let mut week = [None; 7];
    let mut slot = offset;
    for day in 1..=days_in_month(first) {
        week[slot] = Some(day);
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [None; 7];
            slot = 0;
        }
    }
    if slot > 0 {
        weeks.push(week);
    }
    weeks
}

fn days_in_month(first: NaiveDate) -> u32 {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .map_or(31, |last| last.day())
}

/// Title, weekday header and one line per week, with `today` reversed.
pub fn month_lines(today: NaiveDate) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            today.format("%B %Y").to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(WEEKDAYS, Style::default().add_modifier(Modifier::DIM))),
    ];
    for week in month_grid(today) {
        let mut spans = Vec::with_capacity(14);
        for (index, day) in week.iter().enumerate() {
            if index > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(match day {
                Some(day) if *day == today.day() => Span::styled(
                    format!("{day:>2}"),
                    Style::default().add_modifier(Modifier::REVERSED),
                ),
                Some(day) => Span::raw(format!("{day:>2}")),
                None => Span::raw("  "),
            });
        }
        lines.push(Line::from(spans));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn grid_starts_on_the_right_weekday() {
        // 1 March 2024 was a Friday.
        let grid = month_grid(date(2024, 3, 15));
        assert_eq!(grid[0], [None, None, None, None, Some(1), Some(2), Some(3)]);
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[4][6], Some(31));
    }

    #[test]
    fn leap_february_and_december_lengths() {
        let last = |d| {
            month_grid(d)
                .iter()
                .flatten()
                .filter_map(|day| *day)
                .max()
        };
        assert_eq!(last(date(2024, 2, 1)), Some(29));
        assert_eq!(last(date(2023, 2, 1)), Some(28));
        assert_eq!(last(date(2023, 12, 1)), Some(31));
    }

    #[test]
    fn today_is_highlighted() {
        let lines = month_lines(date(2024, 3, 15));
        assert_eq!(lines[0].to_string(), "March 2024");
        assert_eq!(lines[1].to_string(), WEEKDAYS);
        let highlighted: Vec<String> = lines
            .iter()
            .flat_map(|line| line.spans.iter())
            .filter(|span| span.style.add_modifier.contains(Modifier::REVERSED))
            .map(|span| span.content.to_string())
            .collect();
        assert_eq!(highlighted, vec!["15"]);
    }
}
