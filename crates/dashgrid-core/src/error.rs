//! Error taxonomy for the widget runtime.
//!
//! * [`WidgetError`] -- a failure local to one widget. It travels through the
//!   widget's pending buffer or comes back from a draw callback and is shown
//!   inside that widget's pane. It never ends the session.
//! * [`Signal`] -- a session-level outcome. Every way a session can end is a
//!   variant; the driver in [`control`](crate::control) decides what happens
//!   next.
//! * [`LayoutError`] -- problems registering widgets with the container.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use ratatui::layout::Size;

use crate::log::{LogMessage, LogMessages};

/// A structured failure produced by (or on behalf of) a single widget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    /// The plugin reported a failure.
    #[error("{0}")]
    Failed(String),
    /// The plugin found problems with its own configuration or secrets.
    #[error("{0}")]
    Config(LogMessages),
    /// A plugin callback panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl WidgetError {
    /// Convenience constructor for [`WidgetError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        WidgetError::Failed(message.into())
    }

    /// Lines to show inside the widget's error panel.
    pub fn lines(&self) -> Vec<String> {
        match self {
            WidgetError::Config(messages) => messages.iter().map(ToString::to_string).collect(),
            other => vec![other.to_string()],
        }
    }

    /// Messages to fold into the process-wide log, tagged with `widget`.
    pub fn log_messages(&self, widget: &str) -> LogMessages {
        match self {
            WidgetError::Config(messages) => messages.clone(),
            other => {
                let mut log = LogMessages::new();
                log.add(LogMessage::error(format!("{other} (widget \"{widget}\")")));
                log
            }
        }
    }
}

/// Errors raised while registering widgets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Two widgets share a name.
    #[error("duplicate widget name \"{0}\"")]
    DuplicateName(String),
}

/// Every way a dashboard session can end.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Signal {
    /// The user asked for a full reload.
    #[error("restart requested")]
    Restart,
    /// The user asked to quit.
    #[error("stop requested")]
    Stop,
    /// The terminal is smaller than the layout needs.
    #[error("{}", too_small_message(.required, .actual))]
    TerminalTooSmall {
        /// Minimum size the enabled widgets need.
        required: Size,
        /// Size reported by the terminal.
        actual: Size,
    },
    /// The config scan found problems before the session started.
    #[error("config scan found problems: {0}")]
    ConfigScanFound(LogMessages),
    /// The config directory (or a mandatory part of it) is missing.
    #[error("config not found at {}", .path.display())]
    ConfigFileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// Config problems found while the runtime was starting or running.
    #[error("config problems: {0}")]
    ConfigSpecific(LogMessages),
    /// A custom plugin source is broken.
    #[error("widget source problems: {0}")]
    WidgetSource(LogMessages),
    /// Anything else.
    #[error("{0}")]
    Unknown(String),
}

impl Signal {
    /// Wrap any displayable failure as [`Signal::Unknown`].
    pub fn unknown(error: impl std::fmt::Display) -> Self {
        Signal::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for Signal {
    fn from(error: std::io::Error) -> Self {
        Signal::unknown(error)
    }
}

fn too_small_message(required: &Size, actual: &Size) -> String {
    format!(
        "Terminal too small: need at least {} rows x {} columns, have {} x {} \
         (short by {} rows, {} columns)",
        required.height,
        required.width,
        actual.height,
        actual.width,
        required.height.saturating_sub(actual.height),
        required.width.saturating_sub(actual.width)
    )
}

thread_local! {
    static CONTAINING: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside [`contain`].
///
/// The panic hook installed by [`Screen`](crate::screen::Screen) uses this to
/// leave the terminal alone for panics that will be turned into a
/// [`WidgetError`].
pub fn is_containing() -> bool {
    CONTAINING.with(Cell::get)
}

/// Run a plugin callback, converting a panic into [`WidgetError::Panicked`].
pub fn contain<T>(f: impl FnOnce() -> Result<T, WidgetError>) -> Result<T, WidgetError> {
    let previous = CONTAINING.with(|c| c.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CONTAINING.with(|c| c.set(previous));
    match result {
        Ok(inner) => inner,
        Err(payload) => Err(WidgetError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
