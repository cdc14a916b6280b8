//! One dashboard session: startup, the frame loop, and cleanup.
//!
//! Startup runs in a fixed order:
//!
//! 1. check the config directory exists
//! 2. reload secrets
//! 3. merge builtin and custom plugins
//! 4. scan the widget configs
//! 5. load `base.toml`
//! 6. build the widgets and register them
//! 7. acquire the screen and check its size
//! 8. run every `init` callback
//! 9. start the scheduler and enter the frame loop
//!
//! Steps 1 to 6 are [`prepare`]; they never touch the terminal. Whatever ends
//! the session, cleanup stops the scheduler before the screen is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::config::{BaseConfig, Config, ConfigLoader, ConfigScanner};
use crate::container::{FrameReport, WidgetContainer};
use crate::control::ControlState;
use crate::dimensions::LayoutMode;
use crate::error::Signal;
use crate::event::EventSource;
use crate::input::{Dispatched, GlobalKeys, InputDispatcher};
use crate::log::LogMessages;
use crate::plugin::{PluginRegistry, PluginSource};
use crate::scheduler::{Scheduler, SchedulerHandle};
use crate::screen::Surface;
use crate::ui_state::UiState;

/// Everything built from the config directory, ready for a terminal.
#[derive(Debug)]
pub struct Prepared {
    /// Settings from `base.toml`.
    pub base: BaseConfig,
    /// Parsed global key bindings.
    pub keys: GlobalKeys,
    /// Every configured widget, in file-name order.
    pub container: WidgetContainer,
}

/// Run startup steps 1 to 6.
pub fn prepare<S: PluginSource + ?Sized>(
    loader: &mut ConfigLoader,
    source: &S,
    log: &mut LogMessages,
) -> Result<Prepared, Signal> {
    loader.ensure_exists()?;
    loader.reload_secrets(log);
    let registry = source.registry(loader).map_err(Signal::WidgetSource)?;
    let configs = ConfigScanner::new(loader)
        .scan(&registry.names(), log)
        .map_err(Signal::ConfigScanFound)?;
    let base = loader.load_base_config(log)?;
    let keys = GlobalKeys::from_bindings(&base.keys).map_err(Signal::ConfigSpecific)?;
    let container = build_container(&registry, configs, loader, base.layout)?;
    tracing::info!(
        widgets = container.widgets().len(),
        plugins = registry.len(),
        "session prepared"
    );
    Ok(Prepared {
        base,
        keys,
        container,
    })
}

fn build_container(
    registry: &PluginRegistry,
    configs: Vec<Config>,
    loader: &ConfigLoader,
    layout: LayoutMode,
) -> Result<WidgetContainer, Signal> {
    let secrets = loader.secrets();
    let mut problems = LogMessages::new();
    let mut widgets = Vec::with_capacity(configs.len());
    for config in configs {
        match registry.get(&config.name) {
            Some(plugin) => widgets.push(plugin.build(config, secrets.clone())),
            None => {
                problems.error(format!("no plugin named \"{}\"", config.name));
            }
        }
    }
    if !problems.is_empty() {
        return Err(Signal::ConfigSpecific(problems));
    }
    let mut container = WidgetContainer::new(layout);
    container.add_widgets(widgets).map_err(|e| {
        let mut problems = LogMessages::new();
        problems.error(e.to_string());
        Signal::ConfigSpecific(problems)
    })?;
    Ok(container)
}

/// How a session ended.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Why it ended.
    pub signal: Signal,
    /// Messages collected while it ran.
    pub log: LogMessages,
    /// How long to wait before trying again after [`Signal::TerminalTooSmall`].
    pub retry_after: Duration,
}

/// A running dashboard on surface `Sf`, reading input from `E`.
pub struct Session<Sf: Surface, E: EventSource> {
    base: BaseConfig,
    container: WidgetContainer,
    ui: UiState,
    dispatcher: InputDispatcher,
    events: E,
    surface: Sf,
    stop: Arc<AtomicBool>,
    scheduler: Option<SchedulerHandle>,
    log: LogMessages,
    state: ControlState,
    repaint: bool,
}

impl<Sf: Surface, E: EventSource> Session<Sf, E> {
    /// Bind prepared widgets to a surface and an input source.
    pub fn new(prepared: Prepared, surface: Sf, events: E, log: LogMessages) -> Self {
        let dispatcher = InputDispatcher::new(prepared.keys, prepared.base.mouse);
        Self {
            base: prepared.base,
            container: prepared.container,
            ui: UiState::new(),
            dispatcher,
            events,
            surface,
            stop: Arc::new(AtomicBool::new(false)),
            scheduler: None,
            log,
            state: ControlState::Running,
            repaint: true,
        }
    }

    /// Check the terminal size, then run every enabled widget's `init` once.
    pub fn begin(&mut self) -> Result<(), Signal> {
        self.check_size()?;
        for widget in self.container.enabled_widgets() {
            widget.run_init();
        }
        Ok(())
    }

    /// Start the background scheduler.
    pub fn spawn_scheduler(&mut self) -> Result<(), Signal> {
        let scheduler = Scheduler::new(self.container.widgets(), self.stop.clone());
        self.scheduler = Some(scheduler.spawn(self.base.tick_period())?);
        Ok(())
    }

    /// The flag that ends both the frame loop and the scheduler.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// The widgets of this session.
    pub fn container(&self) -> &WidgetContainer {
        &self.container
    }

    /// Focus state.
    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Messages collected so far.
    pub fn log(&self) -> &LogMessages {
        &self.log
    }

    /// State after the last frame.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// The drawing surface.
    pub fn surface_mut(&mut self) -> &mut Sf {
        &mut self.surface
    }

    pub(crate) fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    fn check_size(&mut self) -> Result<(), Signal> {
        let size = self.surface.terminal().size().map_err(Signal::unknown)?;
        self.container.recompute_bounds(size);
        self.container.validate_terminal_size(size)
    }

    /// One iteration of the frame loop: size check, one input event, one
    /// batched draw.
    pub fn frame(&mut self) -> Result<ControlState, Signal> {
        if self.stop.load(Ordering::Relaxed) {
            return Err(Signal::Stop);
        }
        self.check_size()?;

        if let Some(event) = self.events.poll()? {
            let dispatched =
                self.dispatcher
                    .dispatch(event, &self.container, &mut self.ui, &mut self.log)?;
            if dispatched == Dispatched::Repaint {
                self.repaint = true;
            }
        }
        self.container.replay_input(&mut self.log);

        let terminal = self.surface.terminal();
        if std::mem::take(&mut self.repaint) {
            terminal.clear().map_err(Signal::unknown)?;
            self.container.invalidate_snapshots();
        }
        let (container, ui, log) = (&mut self.container, &self.ui, &mut self.log);
        let mut report = FrameReport::default();
        terminal
            .draw(|frame| report = container.render_frame(frame.buffer_mut(), ui, log))
            .map_err(Signal::unknown)?;

        self.state = if report.errors > 0 {
            ControlState::ErrorDisplay
        } else {
            ControlState::Running
        };
        Ok(self.state)
    }

    /// Drive frames until something ends the session, then clean up.
    ///
    /// With `handle_signals`, an interrupt delivered to the process ends the
    /// session like the quit key does.
    pub async fn run(mut self, handle_signals: bool) -> SessionOutcome {
        let mut ticker = tokio::time::interval(self.base.frame_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!("session running");
        let signal = loop {
            if handle_signals {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tokio::signal::ctrl_c() => break Signal::Stop,
                }
            } else {
                ticker.tick().await;
            }
            if let Err(signal) = self.frame() {
                break signal;
            }
        };
        self.finish(signal)
    }

    /// Stop the scheduler, wait for it within the grace period, then release
    /// the surface.
    ///
    /// A widget still inside `update` when the grace period runs out keeps
    /// its thread. The thread touches only that widget's buffers, never the
    /// surface, and exits at its next stop check. It may overlap the
    /// scheduler of a restarted session until then.
    pub fn finish(mut self, signal: Signal) -> SessionOutcome {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.scheduler.take() {
            if let Err(detached) = handle.shutdown(self.base.shutdown_grace()) {
                self.log.warning(detached.to_string());
            }
        }
        tracing::info!(signal = %signal, "session ended");
        let Session {
            base, surface, log, ..
        } = self;
        drop(surface);
        SessionOutcome {
            signal,
            log,
            retry_after: base.resize_retry(),
        }
    }
}
