//! Core runtime for the **dashgrid** terminal dashboard.
//!
//! `dashgrid-core` hosts a grid of independent widgets in a full-screen
//! terminal. Each widget is one plugin instance: the runtime lays it out,
//! refreshes it in the background, draws it every frame, routes input to it,
//! and contains its failures so one broken pane never takes the screen down.
//!
//! # Key types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Plugin`] | Callback bundle (`draw`, `update`, `init`, `keyboard`, `mouse`, `help`) |
//! | [`PluginRegistry`] | Name to plugin mapping; custom entries override builtins |
//! | [`Widget`] | One pane: config, geometry, scratch state, pending buffer |
//! | [`WidgetContainer`] | Ordered widgets, layout bounds, per-frame draw cycle |
//! | [`Scheduler`] | Background refresh of widgets with an `update` callback |
//! | [`InputDispatcher`] | Global keys, focus by mouse, key and mouse forwarding |
//! | [`Signal`] | Every way a session can end |
//! | [`Driver`] | Runs sessions and turns each [`Signal`] into a retry or an exit |
//! | [`TestDashboard`](testing::TestDashboard) | Headless harness on a `TestBackend` |
//!
//! # Architecture
//!
//! Two execution contexts share a session:
//!
//! 1. **render** -- the frame loop checks the terminal size, dispatches at
//!    most one input event, then draws every enabled widget in one batched
//!    terminal refresh.
//! 2. **scheduler** -- one background thread runs each due `update` and
//!    publishes the result into that widget's pending buffer.
//!
//! The pending buffer is the only state both contexts touch, and each holds
//! its lock only to assign or clone. Session-level problems travel up as a
//! [`Signal`]; widget-level problems become a [`WidgetError`] drawn inside
//! the widget.
//!
//! # Quick example
//!
//! ```rust,ignore
//! use dashgrid_core::{Content, Plugin, PluginRegistry};
//!
//! let registry = PluginRegistry::new().with(
//!     "uptime",
//!     Plugin::new(|ctx, content| {
//!         if let Some(lines) = content.and_then(Content::as_lines) {
//!             ctx.canvas.lines(lines);
//!         }
//!         Ok(())
//!     })
//!     .with_update(|_| Ok(Content::lines(vec![read_uptime()?]))),
//! );
//! ```

pub mod canvas;
pub mod config;
pub mod container;
pub mod control;
pub mod dimensions;
pub mod error;
pub mod event;
pub mod input;
pub mod log;
pub mod plugin;
pub mod scheduler;
pub mod screen;
pub mod session;
pub mod testing;
pub mod ui_state;
pub mod widget;

pub use canvas::Canvas;
pub use config::{BaseConfig, Config, ConfigLoader, ConfigScanner, Secrets};
pub use container::{FrameReport, WidgetContainer};
pub use control::{ControlState, Driver, Exit};
pub use dimensions::{BaseDimensions, Dimensions, LayoutMode};
pub use error::{LayoutError, Signal, WidgetError};
pub use event::{CrosstermEvents, EventSource, ScriptedEvents, TerminalEvent};
pub use input::{GlobalKeys, InputDispatcher, KeySpec};
pub use log::{LogLevel, LogMessage, LogMessages};
pub use plugin::{
    Content, DrawContext, InternalData, MouseInput, Plugin, PluginRegistry, PluginSource,
    WidgetContext,
};
pub use scheduler::{Detached, Scheduler, SchedulerHandle};
pub use screen::{Screen, Surface};
pub use session::{prepare, Session, SessionOutcome};
pub use ui_state::UiState;
pub use widget::Widget;
