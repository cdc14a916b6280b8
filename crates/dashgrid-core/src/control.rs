//! What happens after a session ends.
//!
//! | Signal | Next state | Driver does |
//! |--------|------------|-------------|
//! | `Restart` | `Restarting` | start again from scratch |
//! | `TerminalTooSmall` | `Restarting` | print the size problem, wait, start again |
//! | `Stop` | `Stopping` | print runtime messages, exit cleanly |
//! | `ConfigSpecific` | `Stopping` | print runtime messages, exit with failure |
//! | `WidgetSource` | `Stopping` | print the source problems, exit with failure, no retry |
//! | `ConfigScanFound` | `Fatal` | print the scan report, exit with failure |
//! | `ConfigFileNotFound` | `Fatal` | print how to create a config, exit with failure |
//! | `Unknown` | `Fatal` | print everything collected, exit with failure |
//!
//! A widget-local failure never reaches this table. It only moves a frame
//! into `ErrorDisplay`, which the next clean frame leaves again.

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use crate::config::{BaseConfig, ConfigLoader};
use crate::error::Signal;
use crate::event::EventSource;
use crate::log::LogMessages;
use crate::plugin::PluginSource;
use crate::screen::Surface;
use crate::session::{prepare, Session, SessionOutcome};

/// Heading for problems found before the session started.
pub const SCAN_HEADING: &str = "Config errors & warnings (found by config scan):";
/// Heading for problems found while the session ran.
pub const RUNTIME_HEADING: &str = "Config errors & warnings (found at runtime):";
/// Heading for problems with custom plugins.
pub const WIDGET_SOURCE_HEADING: &str = "Widget source errors & warnings:";
/// Heading for anything unexpected.
pub const UNKNOWN_HEADING: &str = "Unknown error:";

/// Where the dashboard is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Frames are being drawn normally.
    Running,
    /// The last frame showed at least one widget error.
    ErrorDisplay,
    /// Tearing down to start again.
    Restarting,
    /// Tearing down to exit.
    Stopping,
    /// Tearing down to exit after an unrecoverable problem.
    Fatal,
}

impl Signal {
    /// The state a session ending with this signal moves to.
    pub fn next_state(&self) -> ControlState {
        match self {
            Signal::Restart | Signal::TerminalTooSmall { .. } => ControlState::Restarting,
            Signal::Stop | Signal::ConfigSpecific(_) | Signal::WidgetSource(_) => {
                ControlState::Stopping
            }
            Signal::ConfigScanFound(_) | Signal::ConfigFileNotFound { .. } | Signal::Unknown(_) => {
                ControlState::Fatal
            }
        }
    }
}

/// How the process should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The user stopped the dashboard.
    Clean,
    /// The dashboard could not run.
    Failed,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Clean => ExitCode::SUCCESS,
            Exit::Failed => ExitCode::FAILURE,
        }
    }
}

/// What the driver does after reporting an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Start a new session after the delay.
    Retry(Duration),
    /// Leave the driver loop.
    Exit(Exit),
}

/// Print what `outcome` calls for to `out` and decide what comes next.
pub fn report(outcome: &SessionOutcome, out: &mut impl Write) -> io::Result<Next> {
    let SessionOutcome {
        signal,
        log,
        retry_after,
    } = outcome;
    let next = match signal {
        Signal::Restart => Next::Retry(Duration::ZERO),
        Signal::TerminalTooSmall { .. } => {
            writeln!(out, "{signal}")?;
            writeln!(out, "Resize the terminal; retrying...")?;
            Next::Retry(*retry_after)
        }
        Signal::Stop => {
            write_messages(out, RUNTIME_HEADING, log)?;
            Next::Exit(Exit::Clean)
        }
        Signal::ConfigSpecific(problems) => {
            write_messages(out, RUNTIME_HEADING, &merged(log, problems))?;
            Next::Exit(Exit::Failed)
        }
        Signal::WidgetSource(problems) => {
            write_messages(out, WIDGET_SOURCE_HEADING, problems)?;
            Next::Exit(Exit::Failed)
        }
        Signal::ConfigScanFound(problems) => {
            write_messages(out, SCAN_HEADING, problems)?;
            Next::Exit(Exit::Failed)
        }
        Signal::ConfigFileNotFound { path } => {
            writeln!(out, "Config not found at {}.", path.display())?;
            writeln!(out, "Run `dashgrid init` to create a default configuration.")?;
            Next::Exit(Exit::Failed)
        }
        Signal::Unknown(message) => {
            write_messages(out, RUNTIME_HEADING, log)?;
            writeln!(out, "{UNKNOWN_HEADING}\n  {message}")?;
            Next::Exit(Exit::Failed)
        }
    };
    Ok(next)
}

fn merged(first: &LogMessages, second: &LogMessages) -> LogMessages {
    let mut all = first.clone();
    all.extend(second.iter().cloned());
    all
}

fn write_messages(out: &mut impl Write, heading: &str, messages: &LogMessages) -> io::Result<()> {
    if !messages.is_empty() {
        out.write_all(messages.report(heading).as_bytes())?;
    }
    Ok(())
}

/// The top-level loop: run sessions until one ends in a way that exits.
pub struct Driver<'a, S: PluginSource + ?Sized> {
    source: &'a S,
    loader: ConfigLoader,
    handle_signals: bool,
}

impl<'a, S: PluginSource + ?Sized> Driver<'a, S> {
    /// Driver for the config directory behind `loader`.
    pub fn new(source: &'a S, loader: ConfigLoader) -> Self {
        Self {
            source,
            loader,
            handle_signals: true,
        }
    }

    /// Whether process interrupts end the session. On by default.
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Run sessions until one exits.
    ///
    /// `open` acquires a surface for a session; `events` makes its input
    /// source. Reports go to `out`.
    pub async fn run<Sf, E, O, V>(&mut self, mut open: O, mut events: V, out: &mut impl Write) -> Exit
    where
        Sf: Surface,
        E: EventSource,
        O: FnMut(&BaseConfig) -> Result<Sf, Signal>,
        V: FnMut() -> E,
    {
        loop {
            let outcome = self.session(&mut open, &mut events).await;
            tracing::info!(signal = %outcome.signal, state = ?outcome.signal.next_state(), "session outcome");
            let next = match report(&outcome, &mut *out) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(error = %e, "failed to write the session report");
                    Next::Exit(Exit::Failed)
                }
            };
            match next {
                Next::Retry(delay) => {
                    if self.wait(delay).await {
                        return Exit::Clean;
                    }
                }
                Next::Exit(exit) => return exit,
            }
        }
    }

    /// Sleep before a retry. Returns `true` if interrupted.
    async fn wait(&self, delay: Duration) -> bool {
        if !self.handle_signals {
            tokio::time::sleep(delay).await;
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = tokio::signal::ctrl_c() => true,
        }
    }

    async fn session<Sf, E, O, V>(&mut self, open: &mut O, events: &mut V) -> SessionOutcome
    where
        Sf: Surface,
        E: EventSource,
        O: FnMut(&BaseConfig) -> Result<Sf, Signal>,
        V: FnMut() -> E,
    {
        let mut log = LogMessages::new();
        let prepared = match prepare(&mut self.loader, self.source, &mut log) {
            Ok(prepared) => prepared,
            Err(signal) => {
                return SessionOutcome {
                    signal,
                    log,
                    retry_after: BaseConfig::default().resize_retry(),
                }
            }
        };
        let surface = match open(&prepared.base) {
            Ok(surface) => surface,
            Err(signal) => {
                return SessionOutcome {
                    signal,
                    log,
                    retry_after: prepared.base.resize_retry(),
                }
            }
        };

        let mut session = Session::new(prepared, surface, events(), log);
        if let Err(signal) = session.begin().and_then(|()| session.spawn_scheduler()) {
            return session.finish(signal);
        }
        session.run(self.handle_signals).await
    }
}
