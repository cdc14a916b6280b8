//! Headless dashboards for tests.

use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::Terminal;

use crate::config::{BaseConfig, Config, Secrets};
use crate::container::WidgetContainer;
use crate::control::ControlState;
use crate::error::Signal;
use crate::event::{ScriptedEvents, TerminalEvent};
use crate::input::GlobalKeys;
use crate::log::LogMessages;
use crate::plugin::PluginRegistry;
use crate::scheduler::Scheduler;
use crate::session::{Prepared, Session};
use crate::ui_state::UiState;
use crate::widget::Widget;

/// A headless dashboard for testing plugins and the runtime together.
///
/// `TestDashboard` runs a real [`Session`] on a [`TestBackend`] with
/// scripted input. The scheduler does not run on its own thread; call
/// [`tick`](TestDashboard::tick) with any instant to refresh due widgets.
///
/// # Example
///
/// ```rust,ignore
/// use dashgrid_core::testing::TestDashboard;
///
/// let mut dash = TestDashboard::new(&registry, configs, 80, 24)?;
/// dash.tick(Instant::now());
/// dash.frame()?;
/// assert!(dash.render_string().contains("12:00"));
/// ```
pub struct TestDashboard {
    session: Session<Terminal<TestBackend>, ScriptedEvents>,
    scheduler: Scheduler,
}

impl TestDashboard {
    /// Build widgets for `configs` from `registry` on a `width` x `height`
    /// terminal and run their `init` callbacks.
    pub fn new(
        registry: &PluginRegistry,
        configs: Vec<Config>,
        width: u16,
        height: u16,
    ) -> Result<Self, Signal> {
        Self::with_base(registry, configs, BaseConfig::default(), width, height)
    }

    /// Like [`new`](TestDashboard::new) with explicit base settings.
    pub fn with_base(
        registry: &PluginRegistry,
        configs: Vec<Config>,
        base: BaseConfig,
        width: u16,
        height: u16,
    ) -> Result<Self, Signal> {
        let secrets = Arc::new(Secrets::default());
        let mut widgets = Vec::with_capacity(configs.len());
        for config in configs {
            let plugin = registry
                .get(&config.name)
                .ok_or_else(|| Signal::unknown(format!("no plugin named \"{}\"", config.name)))?;
            widgets.push(plugin.build(config, secrets.clone()));
        }
        let mut container = WidgetContainer::new(base.layout);
        container.add_widgets(widgets).map_err(Signal::unknown)?;
        let keys = GlobalKeys::from_bindings(&base.keys).map_err(Signal::ConfigSpecific)?;
        let terminal = Terminal::new(TestBackend::new(width, height)).map_err(Signal::unknown)?;

        let prepared = Prepared {
            base,
            keys,
            container,
        };
        let mut session = Session::new(prepared, terminal, ScriptedEvents::new(), LogMessages::new());
        session.begin()?;
        let scheduler = Scheduler::new(session.container().widgets(), session.stop_flag());
        Ok(Self { session, scheduler })
    }

    /// Run one scheduler pass as if the clock read `now`.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.scheduler.tick(now)
    }

    /// Run one frame.
    pub fn frame(&mut self) -> Result<ControlState, Signal> {
        self.session.frame()
    }

    /// Queue an event for a later frame.
    pub fn push(&mut self, event: TerminalEvent) {
        self.session.events_mut().push(event);
    }

    /// Queue a key press.
    pub fn press(&mut self, code: KeyCode) {
        self.push(TerminalEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    /// Queue a left click at an absolute cell.
    pub fn click(&mut self, column: u16, row: u16) {
        self.push(TerminalEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }));
    }

    /// Resize the fake terminal and queue the matching resize event.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.session
            .surface_mut()
            .backend_mut()
            .resize(width, height);
        self.push(TerminalEvent::Resize(width, height));
    }

    /// Look up a widget.
    pub fn widget(&self, name: &str) -> Option<&Arc<Widget>> {
        self.session.container().get(name)
    }

    /// Focus state.
    pub fn ui(&self) -> &UiState {
        self.session.ui()
    }

    /// Messages collected so far.
    pub fn log(&self) -> &LogMessages {
        self.session.log()
    }

    /// The last frame's cells.
    pub fn buffer(&mut self) -> &Buffer {
        self.session.surface_mut().backend().buffer()
    }

    /// The last frame as plain text, one line per row.
    pub fn render_string(&mut self) -> String {
        let buf = self.buffer();
        let area = buf.area;
        let mut output = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                output.push_str(buf[(x, y)].symbol());
            }
            if y < area.bottom() - 1 {
                output.push('\n');
            }
        }
        output
    }
}
