//! **dashgrid** -- a terminal dashboard of independently refreshed widgets.
//!
//! This is the umbrella crate: it re-exports the runtime from
//! [`dashgrid_core`] at the root and the builtin plugins from
//! [`dashgrid_widgets`] under [`widgets`]. The `dashgrid` binary lives here
//! too.
//!
//! # Re-exports
//!
//! * Everything public in [`dashgrid_core`] ([`Plugin`], [`PluginRegistry`],
//!   [`Widget`], [`Driver`], [`Signal`], ...).
//! * [`widgets`] holds the builtin plugins and [`BuiltinPlugins`](widgets::BuiltinPlugins).
//! * [`ratatui`], [`crossterm`] and [`tokio`] so plugin crates can draw and
//!   run without depending on them directly.
//!
//! # Embedding
//!
//! ```ignore
//! use dashgrid::widgets::BuiltinPlugins;
//! use dashgrid::{ConfigLoader, CrosstermEvents, Driver, Screen};
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let loader = ConfigLoader::new("/etc/dashgrid");
//!     let mut driver = Driver::new(&BuiltinPlugins, loader).handle_signals(true);
//!     driver
//!         .run(|base| Screen::acquire(base.mouse), || CrosstermEvents, &mut std::io::stdout())
//!         .await
//!         .into()
//! }
//! ```

pub mod init;

pub use dashgrid_core::*;
pub mod widgets {
    pub use dashgrid_widgets::*;
}

pub use crossterm;
pub use ratatui;
pub use tokio;
