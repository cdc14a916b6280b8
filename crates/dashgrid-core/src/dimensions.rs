//! Per-widget geometry.
//!
//! Every widget declares a base rectangle in its config. The runtime derives
//! the current rectangle from the base one and the live terminal size; nothing
//! else writes the current values.

use ratatui::layout::{Rect, Size};
use serde::{Deserialize, Serialize};

/// The rectangle a widget declares in its config, in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseDimensions {
    /// Column of the left border.
    pub x: u16,
    /// Row of the top border.
    pub y: u16,
    /// Width including borders.
    pub width: u16,
    /// Height including borders.
    pub height: u16,
}

impl BaseDimensions {
    /// Rectangle at (`x`, `y`) of `width` by `height` cells.
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// How declared geometry maps onto the live terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LayoutMode {
    /// Widgets keep their declared geometry.
    #[default]
    Fixed,
    /// Declared geometry targets a reference terminal size. When the live
    /// terminal is larger on an axis, geometry on that axis grows
    /// proportionally; it never shrinks below the declared values.
    Stretch {
        /// Terminal width the layout was designed for.
        reference_width: u16,
        /// Terminal height the layout was designed for.
        reference_height: u16,
    },
}

/// Declared and derived geometry of one widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    base: BaseDimensions,
    current: Rect,
}

impl Dimensions {
    /// Start with the current geometry equal to the declared one.
    pub fn new(base: BaseDimensions) -> Self {
        Self {
            base,
            current: Rect::new(base.x, base.y, base.width, base.height),
        }
    }

    /// Declared geometry.
    pub fn base(&self) -> BaseDimensions {
        self.base
    }

    /// Derived geometry for the last terminal size seen.
    pub fn current(&self) -> Rect {
        self.current
    }

    /// Bottom edge (exclusive) of the current rectangle.
    pub fn bottom(&self) -> u32 {
        u32::from(self.current.y) + u32::from(self.current.height)
    }

    /// Right edge (exclusive) of the current rectangle.
    pub fn right(&self) -> u32 {
        u32::from(self.current.x) + u32::from(self.current.width)
    }

    /// Recompute the current rectangle from the base one and `terminal`.
    pub fn rescale(&mut self, terminal: Size, mode: LayoutMode) {
        self.current = match mode {
            LayoutMode::Fixed => Rect::new(
                self.base.x,
                self.base.y,
                self.base.width,
                self.base.height,
            ),
            LayoutMode::Stretch {
                reference_width,
                reference_height,
            } => {
                let (x, width) = stretch_axis(
                    self.base.x,
                    self.base.width,
                    terminal.width,
                    reference_width,
                );
                let (y, height) = stretch_axis(
                    self.base.y,
                    self.base.height,
                    terminal.height,
                    reference_height,
                );
                Rect::new(x, y, width, height)
            }
        };
    }

    /// Whether the cell at (`column`, `row`) lies inside the current
    /// rectangle, borders included.
    pub fn contains(&self, column: u16, row: u16) -> bool {
        let (column, row) = (u32::from(column), u32::from(row));
        column >= u32::from(self.current.x)
            && column < self.right()
            && row >= u32::from(self.current.y)
            && row < self.bottom()
    }
}

fn stretch_axis(offset: u16, length: u16, actual: u16, reference: u16) -> (u16, u16) {
    if reference == 0 || actual <= reference {
        return (offset, length);
    }
    let scale = |v: u16| -> u16 {
        let scaled = u32::from(v) * u32::from(actual) / u32::from(reference);
        u16::try_from(scaled).unwrap_or(u16::MAX)
    };
    let start = scale(offset);
    let end = scale(offset.saturating_add(length));
    (start, end.saturating_sub(start).max(length))
}
