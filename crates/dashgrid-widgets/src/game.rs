//! 2048 on a 4x4 board.
//!
//! The board lives in the widget's internal data: `init` deals it, the
//! keyboard callback plays it and `draw` only reads it. While the widget is
//! in help mode, moves are ignored.

use crossterm::event::KeyCode;
use dashgrid_core::{Plugin, WidgetError};
use rand::Rng;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

/// Board edge length.
pub const SIZE: usize = 4;

const CELL_WIDTH: usize = 6;

/// Which way the tiles slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Arrow keys and `wasd`.
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Left | KeyCode::Char('a') => Some(Direction::Left),
            KeyCode::Right | KeyCode::Char('d') => Some(Direction::Right),
            KeyCode::Up | KeyCode::Char('w') => Some(Direction::Up),
            KeyCode::Down | KeyCode::Char('s') => Some(Direction::Down),
            _ => None,
        }
    }

    /// Cells of line `index`, starting at the edge the tiles slide toward.
    fn line(self, index: usize) -> [(usize, usize); SIZE] {
        std::array::from_fn(|step| match self {
            Direction::Left => (index, step),
            Direction::Right => (index, SIZE - 1 - step),
            Direction::Up => (step, index),
            Direction::Down => (SIZE - 1 - step, index),
        })
    }
}

/// Tiles and score. Zero is an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    cells: [[u32; SIZE]; SIZE],
    score: u32,
}

impl Board {
    /// A fresh board with two random tiles.
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut board = Self::default();
        board.spawn(rng);
        board.spawn(rng);
        board
    }

    /// A board with the given rows and no score.
    pub fn from_rows(cells: [[u32; SIZE]; SIZE]) -> Self {
        Self { cells, score: 0 }
    }

    /// Rows, top first.
    pub fn cells(&self) -> &[[u32; SIZE]; SIZE] {
        &self.cells
    }

    /// Sum of every merge so far.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Slide and merge without spawning. Returns whether anything moved.
    pub fn slide(&mut self, direction: Direction) -> bool {
        let mut moved = false;
        for index in 0..SIZE {
            let coords = direction.line(index);
            let line = coords.map(|(r, c)| self.cells[r][c]);
            let (slid, gained) = slide_line(line);
            if slid != line {
                moved = true;
                for ((r, c), value) in coords.into_iter().zip(slid) {
                    self.cells[r][c] = value;
                }
            }
            self.score += gained;
        }
        moved
    }

    /// Place a 2 (or, one time in ten, a 4) on a random empty cell.
    pub fn spawn(&mut self, rng: &mut impl Rng) -> bool {
        let empty: Vec<(usize, usize)> = (0..SIZE)
            .flat_map(|r| (0..SIZE).map(move |c| (r, c)))
            .filter(|&(r, c)| self.cells[r][c] == 0)
            .collect();
        if empty.is_empty() {
            return false;
        }
        let (r, c) = empty[rng.random_range(0..empty.len())];
        self.cells[r][c] = if rng.random_bool(0.1) { 4 } else { 2 };
        true
    }

    /// One turn: slide, then spawn if the slide moved anything.
    pub fn play(&mut self, direction: Direction, rng: &mut impl Rng) -> bool {
        let moved = self.slide(direction);
        if moved {
            self.spawn(rng);
        }
        moved
    }

    /// Whether any move is still possible.
    pub fn can_move(&self) -> bool {
        (0..SIZE).any(|r| {
            (0..SIZE).any(|c| {
                let value = self.cells[r][c];
                value == 0
                    || (c + 1 < SIZE && self.cells[r][c + 1] == value)
                    || (r + 1 < SIZE && self.cells[r + 1][c] == value)
            })
        })
    }
}

fn slide_line(line: [u32; SIZE]) -> ([u32; SIZE], u32) {
    let mut out = [0; SIZE];
    let mut len = 0;
    let mut gained = 0;
    let mut merged = false;
    for value in line.into_iter().filter(|v| *v != 0) {
        if len > 0 && !merged && out[len - 1] == value {
            out[len - 1] *= 2;
            gained += out[len - 1];
            merged = true;
        } else {
            out[len] = value;
            len += 1;
            merged = false;
        }
    }
    (out, gained)
}

fn tile_style(value: u32) -> Style {
    let color = match value {
        0 => return Style::default().fg(Color::DarkGray),
        2 | 4 => Color::White,
        8 | 16 => Color::Yellow,
        32 | 64 => Color::LightRed,
        128 | 256 | 512 => Color::LightMagenta,
        _ => Color::LightCyan,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn board_lines(board: &Board) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = board
        .cells()
        .iter()
        .map(|row| {
            Line::from(
                row.iter()
                    .map(|&value| {
                        let text = if value == 0 {
                            format!("{:>w$}", ".", w = CELL_WIDTH - 1)
                        } else {
                            format!("{value:>w$}", w = CELL_WIDTH - 1)
                        };
                        Span::styled(text + " ", tile_style(value))
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    lines.push(Line::from(format!("Score: {}", board.score())));
    if !board.can_move() {
        lines.push(Line::from(Span::styled(
            "Game over, press r",
            Style::default().fg(Color::Red),
        )));
    }
    lines
}

/// The `game` plugin.
pub fn plugin() -> Plugin {
    Plugin::new(|ctx, _| {
        let board = ctx
            .data
            .get::<Board>()
            .ok_or_else(|| WidgetError::failed("board was never dealt"))?;
        ctx.canvas.render(Paragraph::new(board_lines(board)));
        Ok(())
    })
    .with_init(|ctx| {
        ctx.data.insert(Board::new(&mut rand::rng()));
        Ok(())
    })
    .with_keyboard(|ctx, key| {
        if ctx.widget.help_mode() {
            return Ok(());
        }
        let mut rng = rand::rng();
        let board = ctx.data.get_or_insert_with(|| Board::new(&mut rand::rng()));
        if key.code == KeyCode::Char('r') {
            *board = Board::new(&mut rng);
        } else if let Some(direction) = Direction::from_key(key.code) {
            board.play(direction, &mut rng);
        }
        Ok(())
    })
    .with_help(|ctx| {
        ctx.canvas.lines([
            "Arrows or wasd  slide tiles",
            "r               new game",
            "",
            "Equal tiles merge when they touch.",
            "Toggle help again to play.",
        ]);
        Ok(())
    })
}
