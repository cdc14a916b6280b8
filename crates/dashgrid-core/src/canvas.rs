//! Drawing surface handed to plugin callbacks, plus the chrome the container
//! draws around every widget.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget as _, Wrap};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// A clipped view of the frame buffer covering one widget's interior.
///
/// Coordinates passed to [`put`](Canvas::put) are relative to the interior's
/// top-left corner; anything outside the interior is silently dropped.
pub struct Canvas<'a> {
    buf: &'a mut Buffer,
    area: Rect,
}

impl<'a> Canvas<'a> {
    /// Wrap `area` of `buf`. The area is clipped to the buffer.
    pub fn new(buf: &'a mut Buffer, area: Rect) -> Self {
        let area = area.intersection(buf.area);
        Self { buf, area }
    }

    /// The absolute area this canvas covers.
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Interior width in cells.
    pub fn width(&self) -> u16 {
        self.area.width
    }

    /// Interior height in cells.
    pub fn height(&self) -> u16 {
        self.area.height
    }

    /// Write `text` with `style` at (`row`, `col`), clipped to the interior.
    ///
    /// Returns the number of columns written.
    pub fn put(&mut self, row: u16, col: u16, text: &str, style: Style) -> u16 {
        if row >= self.area.height || col >= self.area.width {
            return 0;
        }
        let x = self.area.x + col;
        let y = self.area.y + row;
        let room = usize::from(self.area.width - col);
        let (end, _) = self.buf.set_stringn(x, y, text, room, style);
        end.saturating_sub(x)
    }

    /// Write one line per row starting at the top, in the default style.
    pub fn lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (row, line) in lines.into_iter().enumerate() {
            let Ok(row) = u16::try_from(row) else { break };
            if row >= self.area.height {
                break;
            }
            self.put(row, 0, line.as_ref(), Style::default());
        }
    }

    /// Render any ratatui widget over the whole interior.
    pub fn render<W: ratatui::widgets::Widget>(&mut self, widget: W) {
        widget.render(self.area, self.buf);
    }

    /// Render any ratatui widget into a sub-rectangle given relative to the
    /// interior. The rectangle is clipped.
    pub fn render_in<W: ratatui::widgets::Widget>(&mut self, area: Rect, widget: W) {
        let absolute = Rect::new(
            self.area.x.saturating_add(area.x),
            self.area.y.saturating_add(area.y),
            area.width,
            area.height,
        )
        .intersection(self.area);
        if !absolute.is_empty() {
            widget.render(absolute, self.buf);
        }
    }
}

/// Border color of a focused widget.
pub const FOCUS_COLOR: Color = Color::Cyan;
/// Border color of an unfocused widget.
pub const IDLE_COLOR: Color = Color::DarkGray;
/// Border and text color of a failed widget.
pub const ERROR_COLOR: Color = Color::Red;
/// Text color of a widget still waiting for its first content.
pub const LOADING_COLOR: Color = Color::Yellow;

/// Create a bordered block with focus-dependent border color.
pub fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let color = if focused { FOCUS_COLOR } else { IDLE_COLOR };
    Block::new()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(color))
}

/// Draw the widget border and title into `area`; returns the interior.
pub fn draw_chrome(buf: &mut Buffer, area: Rect, title: &str, focused: bool) -> Rect {
    let title = truncate(title, usize::from(area.width.saturating_sub(2)));
    let block = focus_block(&title, focused);
    let inner = block.inner(area);
    block.render(area, buf);
    inner
}

/// Replace the widget at `area` with an error panel listing `lines`.
pub fn draw_error(buf: &mut Buffer, area: Rect, title: &str, lines: &[String]) {
    let title = truncate(title, usize::from(area.width.saturating_sub(2)));
    let block = Block::new()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(ERROR_COLOR));
    let text: Vec<Line<'_>> = lines.iter().map(|l| Line::raw(l.as_str())).collect();
    Clear.render(area, buf);
    Paragraph::new(text)
        .style(Style::default().fg(ERROR_COLOR))
        .wrap(Wrap { trim: true })
        .block(block)
        .render(area, buf);
}

/// Write the "Loading..." placeholder into a widget interior.
pub fn draw_loading(buf: &mut Buffer, inner: Rect) {
    Canvas::new(buf, inner).put(
        0,
        0,
        "Loading...",
        Style::default()
            .fg(LOADING_COLOR)
            .add_modifier(Modifier::ITALIC),
    );
}

/// Truncate `text` to `max_width` display columns, ending with `…` when cut.
pub fn truncate(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in text.chars() {
        let cw = c.width().unwrap_or(0);
        if width + cw > max_width - 1 {
            break;
        }
        out.push(c);
        width += cw;
    }
    out.push('\u{2026}');
    out
}

/// Copy the cells of `area` out of `buf`.
pub fn snapshot(buf: &Buffer, area: Rect) -> Buffer {
    let area = area.intersection(buf.area);
    let mut copy = Buffer::empty(area);
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            copy[(x, y)] = buf[(x, y)].clone();
        }
    }
    copy
}

/// Paste a [`snapshot`] back into `buf`, clipped to the buffer.
pub fn restore(buf: &mut Buffer, snapshot: &Buffer) {
    let area = snapshot.area.intersection(buf.area);
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            buf[(x, y)] = snapshot[(x, y)].clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (buf.area.left()..buf.area.right())
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn put_clips_to_interior() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 3));
        let mut canvas = Canvas::new(&mut buf, Rect::new(2, 1, 4, 1));
        let written = canvas.put(0, 1, "abcdef", Style::default());
        assert_eq!(written, 3);
        assert_eq!(canvas.put(1, 0, "hidden", Style::default()), 0);
        assert_eq!(row(&buf, 1), "   abc    ");
        assert_eq!(row(&buf, 2), "          ");
    }

    #[test]
    fn lines_stop_at_bottom() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 5, 2));
        Canvas::new(&mut buf, Rect::new(0, 0, 5, 2)).lines(["one", "two", "three"]);
        assert_eq!(row(&buf, 0), "one  ");
        assert_eq!(row(&buf, 1), "two  ");
    }

    #[test]
    fn chrome_draws_border_and_title() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 12, 3));
        let inner = draw_chrome(&mut buf, Rect::new(0, 0, 12, 3), "Clock", false);
        assert_eq!(inner, Rect::new(1, 1, 10, 1));
        assert!(row(&buf, 0).contains("Clock"));
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("Calendar", 10), "Calendar");
        assert_eq!(truncate("Calendar", 5), "Cale\u{2026}");
        assert_eq!(truncate("Calendar", 0), "");
    }

    #[test]
    fn snapshot_round_trips_a_region() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 6, 2));
        Canvas::new(&mut buf, Rect::new(0, 0, 6, 2)).lines(["hello", "world"]);
        let saved = snapshot(&buf, Rect::new(0, 0, 6, 1));
        let mut fresh = Buffer::empty(Rect::new(0, 0, 6, 2));
        restore(&mut fresh, &saved);
        assert_eq!(row(&fresh, 0), "hello ");
        assert_eq!(row(&fresh, 1), "      ");
    }
}
