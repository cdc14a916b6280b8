//! Turning raw command output into styled lines.
//!
//! Programs run by the [`command`](crate::command) plugin often color their
//! output. SGR sequences (`ESC [ ... m`) become ratatui styles; every other
//! escape sequence and control character is dropped so it cannot move the
//! terminal cursor out of the widget.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const BASIC: [Color; 8] = [
    Color::Black,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::White,
];

const BRIGHT: [Color; 8] = [
    Color::DarkGray,
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
    Color::White,
];

/// Remove every control character and escape sequence, keeping tabs as a
/// single space.
pub fn plain(line: &str) -> String {
    styled(line)
        .spans
        .into_iter()
        .map(|span| span.content.into_owned())
        .collect()
}

/// Parse one line of output into styled spans.
pub fn styled(line: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut style = Style::default();
    let mut text = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                if chars.peek() != Some(&'[') {
                    continue;
                }
                chars.next();
                let mut params = String::new();
                while let Some(&p) = chars.peek() {
                    if !(p.is_ascii_digit() || p == ';') {
                        break;
                    }
                    params.push(p);
                    chars.next();
                }
                if chars.next() != Some('m') {
                    continue;
                }
                if !text.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut text), style));
                }
                let codes: Vec<u16> = params
                    .split(';')
                    .map(|code| code.parse().unwrap_or(0))
                    .collect();
                apply_sgr(&codes, &mut style);
            }
            '\t' => text.push(' '),
            c if c.is_control() => {}
            c => text.push(c),
        }
    }
    if !text.is_empty() {
        spans.push(Span::styled(text, style));
    }
    Line::from(spans)
}

fn apply_sgr(codes: &[u16], style: &mut Style) {
    let mut rest = codes;
    while let Some((&code, tail)) = rest.split_first() {
        rest = tail;
        *style = match code {
            0 => Style::default(),
            1 => style.add_modifier(Modifier::BOLD),
            2 => style.add_modifier(Modifier::DIM),
            3 => style.add_modifier(Modifier::ITALIC),
            4 => style.add_modifier(Modifier::UNDERLINED),
            7 => style.add_modifier(Modifier::REVERSED),
            22 => style.remove_modifier(Modifier::BOLD | Modifier::DIM),
            39 => style.fg(Color::Reset),
            49 => style.bg(Color::Reset),
            30..=37 => style.fg(BASIC[usize::from(code - 30)]),
            40..=47 => style.bg(BASIC[usize::from(code - 40)]),
            90..=97 => style.fg(BRIGHT[usize::from(code - 90)]),
            100..=107 => style.bg(BRIGHT[usize::from(code - 100)]),
            38 | 48 => match rest {
                [5, n, tail @ ..] => {
                    rest = tail;
                    let color = Color::Indexed(u8::try_from(*n).unwrap_or(u8::MAX));
                    if code == 38 {
                        style.fg(color)
                    } else {
                        style.bg(color)
                    }
                }
                _ => *style,
            },
            _ => *style,
        };
    }
}
