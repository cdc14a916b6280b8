//! Scoped ownership of the full-screen terminal.

use std::io::{self, Stdout};
use std::sync::Once;

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, execute};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;

use crate::error::{is_containing, Signal};

/// Anything the frame loop can draw to.
pub trait Surface {
    /// Backend of the wrapped terminal.
    type Backend: Backend;

    /// The terminal to draw into.
    fn terminal(&mut self) -> &mut Terminal<Self::Backend>;
}

/// A bare terminal, e.g. one on a `TestBackend`.
impl<B: Backend> Surface for Terminal<B> {
    type Backend = B;

    fn terminal(&mut self) -> &mut Terminal<B> {
        self
    }
}

/// The real terminal in raw mode on the alternate screen.
///
/// Acquiring puts the terminal into dashboard mode; dropping puts it back.
/// A panic hook installed on first use does the same for panics that are not
/// contained by the runtime; contained panics only go to the log.
pub struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    mouse: bool,
}

impl Screen {
    /// Take over stdout. Mouse capture is enabled when `mouse` is set.
    pub fn acquire(mouse: bool) -> Result<Self, Signal> {
        install_panic_hook();
        match init_terminal(mouse) {
            Ok(terminal) => {
                tracing::debug!(mouse, "screen acquired");
                Ok(Self { terminal, mouse })
            }
            Err(e) => {
                let _ = restore_terminal(mouse);
                Err(Signal::unknown(format!("failed to set up the terminal: {e}")))
            }
        }
    }
}

impl Surface for Screen {
    type Backend = CrosstermBackend<Stdout>;

    fn terminal(&mut self) -> &mut Terminal<Self::Backend> {
        &mut self.terminal
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        if let Err(e) = restore_terminal(self.mouse) {
            tracing::warn!(error = %e, "failed to restore the terminal");
        }
        tracing::debug!("screen released");
    }
}

fn install_panic_hook() {
    static HOOK_INSTALLED: Once = Once::new();
    HOOK_INSTALLED.call_once(|| {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if is_containing() {
                tracing::error!(panic = %info, "plugin callback panicked");
                return;
            }
            let _ = restore_terminal(true);
            original_hook(info);
        }));
    });
}

fn init_terminal(mouse: bool) -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
    if mouse {
        execute!(stdout, EnableMouseCapture)?;
    }
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(mouse: bool) -> io::Result<()> {
    // Best effort: keep going so as much state as possible is restored.
    let raw = disable_raw_mode();
    let mut stdout = io::stdout();
    if mouse {
        execute!(stdout, DisableMouseCapture).ok();
    }
    execute!(stdout, cursor::Show, LeaveAlternateScreen).ok();
    raw
}
