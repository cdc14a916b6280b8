//! Routing of terminal input to global commands and to widgets.

use std::fmt;
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};

use crate::config::KeyBindings;
use crate::container::WidgetContainer;
use crate::error::Signal;
use crate::event::TerminalEvent;
use crate::log::LogMessages;
use crate::plugin::MouseInput;
use crate::ui_state::UiState;

/// A key string from the config could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid key \"{0}\"")]
pub struct InvalidKey(pub String);

/// A key plus the modifiers that must accompany it.
///
/// Parsed from strings such as `q`, `R`, `Esc`, `F5` or `Ctrl+r`. Shift is
/// implied by the character itself and is not compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeySpec {
    /// Key with no modifiers.
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    /// Key that requires Ctrl.
    pub const fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    /// Whether `key` is this key.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        let relevant = KeyModifiers::CONTROL | KeyModifiers::ALT;
        let same_code = match (self.code, key.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) if self.modifiers.contains(KeyModifiers::CONTROL) => {
                a.eq_ignore_ascii_case(&b)
            }
            (a, b) => a == b,
        };
        same_code && key.modifiers & relevant == self.modifiers & relevant
    }
}

impl FromStr for KeySpec {
    type Err = InvalidKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidKey(s.to_string());
        let mut modifiers = KeyModifiers::NONE;
        let mut rest = s;
        loop {
            let lower = rest.to_ascii_lowercase();
            if let Some(tail) = lower.strip_prefix("ctrl+") {
                modifiers |= KeyModifiers::CONTROL;
                rest = &rest[rest.len() - tail.len()..];
            } else if let Some(tail) = lower.strip_prefix("alt+") {
                modifiers |= KeyModifiers::ALT;
                rest = &rest[rest.len() - tail.len()..];
            } else {
                break;
            }
        }

        let mut chars = rest.chars();
        let code = match (chars.next(), chars.next()) {
            (Some(c), None) => KeyCode::Char(c),
            (None, _) => return Err(invalid()),
            _ => match rest.to_ascii_lowercase().as_str() {
                "esc" | "escape" => KeyCode::Esc,
                "enter" | "return" => KeyCode::Enter,
                "tab" => KeyCode::Tab,
                "space" => KeyCode::Char(' '),
                "backspace" => KeyCode::Backspace,
                "up" => KeyCode::Up,
                "down" => KeyCode::Down,
                "left" => KeyCode::Left,
                "right" => KeyCode::Right,
                other => {
                    let n = other
                        .strip_prefix('f')
                        .and_then(|n| n.parse::<u8>().ok())
                        .filter(|n| (1..=12).contains(n))
                        .ok_or_else(invalid)?;
                    KeyCode::F(n)
                }
            },
        };
        Ok(Self { code, modifiers })
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("Ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("Alt+")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Keys handled before any widget sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalKeys {
    /// End the session.
    pub quit: KeySpec,
    /// Rebuild the session from the config directory.
    pub reload: KeySpec,
    /// Toggle help on the focused widget.
    pub help: KeySpec,
    /// Clear focus.
    pub unfocus: KeySpec,
}

impl GlobalKeys {
    /// Parse every binding, reporting all the bad ones at once.
    pub fn from_bindings(bindings: &KeyBindings) -> Result<Self, LogMessages> {
        let mut problems = LogMessages::new();
        let mut parse = |field: &str, value: &str| match value.parse::<KeySpec>() {
            Ok(key) => key,
            Err(e) => {
                problems.error(format!("base config keys.{field}: {e}"));
                KeySpec::plain(KeyCode::Null)
            }
        };
        let keys = Self {
            quit: parse("quit", &bindings.quit),
            reload: parse("reload", &bindings.reload),
            help: parse("help", &bindings.help),
            unfocus: parse("unfocus", &bindings.unfocus),
        };
        if problems.is_empty() {
            Ok(keys)
        } else {
            Err(problems)
        }
    }
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: KeySpec::plain(KeyCode::Char('q')),
            reload: KeySpec::plain(KeyCode::Char('R')),
            help: KeySpec::plain(KeyCode::Char('h')),
            unfocus: KeySpec::plain(KeyCode::Esc),
        }
    }
}

const INTERRUPT: KeySpec = KeySpec::ctrl(KeyCode::Char('c'));

/// What the dispatcher did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Nothing to do.
    Ignored,
    /// Consumed by a global command or a widget.
    Handled,
    /// The whole screen must be redrawn from scratch.
    Repaint,
}

/// Routes one event per frame.
#[derive(Debug, Clone)]
pub struct InputDispatcher {
    keys: GlobalKeys,
    mouse: bool,
}

impl InputDispatcher {
    /// Dispatcher using `keys`; mouse events are ignored unless `mouse`.
    pub fn new(keys: GlobalKeys, mouse: bool) -> Self {
        Self { keys, mouse }
    }

    /// Route `event`.
    ///
    /// Quit and reload come back as `Err` so they unwind the frame loop.
    /// Failures in widget callbacks are folded into `log`.
    pub fn dispatch(
        &self,
        event: TerminalEvent,
        container: &WidgetContainer,
        ui: &mut UiState,
        log: &mut LogMessages,
    ) -> Result<Dispatched, Signal> {
        match event {
            TerminalEvent::Key(key) => self.on_key(key, ui, log),
            TerminalEvent::Mouse(mouse) if self.mouse => Ok(self.on_mouse(mouse, container, ui, log)),
            TerminalEvent::Resize(columns, rows) => {
                tracing::debug!(columns, rows, "resize");
                Ok(Dispatched::Repaint)
            }
            _ => Ok(Dispatched::Ignored),
        }
    }

    fn on_key(&self, key: KeyEvent, ui: &mut UiState, log: &mut LogMessages) -> Result<Dispatched, Signal> {
        if key.kind != KeyEventKind::Press {
            return Ok(Dispatched::Ignored);
        }
        if INTERRUPT.matches(&key) || self.keys.quit.matches(&key) {
            tracing::info!("quit requested");
            return Err(Signal::Stop);
        }
        if self.keys.reload.matches(&key) {
            tracing::info!("reload requested");
            return Err(Signal::Restart);
        }
        if self.keys.unfocus.matches(&key) {
            ui.clear();
            return Ok(Dispatched::Handled);
        }

        let Some(widget) = ui.highlighted() else {
            return Ok(Dispatched::Ignored);
        };
        if self.keys.help.matches(&key) {
            let on = widget.toggle_help();
            tracing::debug!(widget = %widget.name(), help = on, "help toggled");
            return Ok(Dispatched::Handled);
        }
        match widget.run_keyboard(key) {
            Some(errors) => {
                for e in errors {
                    log.extend(e.log_messages(widget.name()));
                }
                Ok(Dispatched::Handled)
            }
            None => Ok(Dispatched::Ignored),
        }
    }

    fn on_mouse(
        &self,
        mouse: MouseEvent,
        container: &WidgetContainer,
        ui: &mut UiState,
        log: &mut LogMessages,
    ) -> Dispatched {
        let focusing = matches!(mouse.kind, MouseEventKind::Down(_));
        let scrolling = matches!(mouse.kind, MouseEventKind::ScrollUp | MouseEventKind::ScrollDown);
        if !focusing && !scrolling {
            return Dispatched::Ignored;
        }

        let Some(widget) = container.hit_test(mouse.column, mouse.row) else {
            if focusing {
                ui.clear();
                return Dispatched::Handled;
            }
            return Dispatched::Ignored;
        };
        if focusing {
            ui.highlight(widget);
        }
        let origin = widget.area();
        let input = MouseInput {
            column: mouse.column - origin.x,
            row: mouse.row - origin.y,
            kind: mouse.kind,
        };
        for e in widget.run_mouse(input).unwrap_or_default() {
            log.extend(e.log_messages(widget.name()));
        }
        Dispatched::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dimensions::BaseDimensions;
    use crate::error::WidgetError;
    use crate::plugin::Plugin;
    use crossterm::event::MouseButton;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn press(code: KeyCode) -> TerminalEvent {
        TerminalEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn click(column: u16, row: u16) -> TerminalEvent {
        TerminalEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    struct Fixture {
        container: WidgetContainer,
        ui: UiState,
        log: LogMessages,
        dispatcher: InputDispatcher,
        clicks: Arc<Mutex<Vec<(u16, u16)>>>,
        keys: Arc<Mutex<Vec<KeyCode>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let clicks = Arc::new(Mutex::new(Vec::new()));
            let keys = Arc::new(Mutex::new(Vec::new()));
            let (c, k) = (clicks.clone(), keys.clone());
            let plugin = Plugin::new(|_, _| Ok(()))
                .with_mouse(move |_, input| {
                    c.lock().push((input.column, input.row));
                    Ok(())
                })
                .with_keyboard(move |_, key| {
                    if key.code == KeyCode::Char('x') {
                        return Err(WidgetError::failed("x is not allowed"));
                    }
                    k.lock().push(key.code);
                    Ok(())
                });
            let mut container = WidgetContainer::default();
            container
                .add_widgets([
                    plugin.build(
                        Config::new("a", "A", BaseDimensions::new(0, 0, 10, 5)),
                        Arc::default(),
                    ),
                    plugin.build(
                        Config::new("b", "B", BaseDimensions::new(20, 2, 10, 5)),
                        Arc::default(),
                    ),
                    plugin.build(
                        Config::new("off", "Off", BaseDimensions::new(40, 0, 10, 5)).with_enabled(false),
                        Arc::default(),
                    ),
                ])
                .unwrap();
            Self {
                container,
                ui: UiState::new(),
                log: LogMessages::new(),
                dispatcher: InputDispatcher::new(GlobalKeys::default(), true),
                clicks,
                keys,
            }
        }

        fn send(&mut self, event: TerminalEvent) -> Result<Dispatched, Signal> {
            self.dispatcher
                .dispatch(event, &self.container, &mut self.ui, &mut self.log)
        }
    }

    #[test]
    fn parses_key_strings() {
        assert_eq!("q".parse::<KeySpec>(), Ok(KeySpec::plain(KeyCode::Char('q'))));
        assert_eq!("Esc".parse::<KeySpec>(), Ok(KeySpec::plain(KeyCode::Esc)));
        assert_eq!("F5".parse::<KeySpec>(), Ok(KeySpec::plain(KeyCode::F(5))));
        assert_eq!("Ctrl+r".parse::<KeySpec>(), Ok(KeySpec::ctrl(KeyCode::Char('r'))));
        assert!("F13".parse::<KeySpec>().is_err());
        assert!("".parse::<KeySpec>().is_err());
        assert!("nope".parse::<KeySpec>().is_err());
    }

    #[test]
    fn uppercase_binding_ignores_shift() {
        let spec = KeySpec::plain(KeyCode::Char('R'));
        assert!(spec.matches(&KeyEvent::new(KeyCode::Char('R'), KeyModifiers::SHIFT)));
        assert!(!spec.matches(&KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE)));
        assert!(!spec.matches(&KeyEvent::new(KeyCode::Char('R'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn bad_bindings_are_all_reported() {
        let bindings = KeyBindings {
            quit: "".into(),
            help: "Hyper+h".into(),
            ..KeyBindings::default()
        };
        let problems = GlobalKeys::from_bindings(&bindings).unwrap_err();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn global_keys_raise_signals() {
        let mut fx = Fixture::new();
        assert_eq!(fx.send(press(KeyCode::Char('q'))), Err(Signal::Stop));
        assert_eq!(fx.send(press(KeyCode::Char('R'))), Err(Signal::Restart));
        let ctrl_c = TerminalEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(fx.send(ctrl_c), Err(Signal::Stop));
    }

    #[test]
    fn click_focuses_and_translates_coordinates() {
        let mut fx = Fixture::new();
        assert_eq!(fx.send(click(23, 4)), Ok(Dispatched::Handled));
        assert_eq!(fx.ui.highlighted_name().as_deref(), Some("b"));
        assert_eq!(*fx.clicks.lock(), vec![(3, 2)]);

        fx.send(press(KeyCode::Left)).unwrap();
        assert_eq!(*fx.keys.lock(), vec![KeyCode::Left]);
    }

    #[test]
    fn click_outside_every_widget_clears_focus() {
        let mut fx = Fixture::new();
        fx.send(click(1, 1)).unwrap();
        fx.send(click(15, 15)).unwrap();
        assert!(fx.ui.highlighted().is_none());
    }

    #[test]
    fn disabled_widgets_cannot_be_focused() {
        let mut fx = Fixture::new();
        fx.send(click(42, 1)).unwrap();
        assert!(fx.ui.highlighted().is_none());
        assert!(fx.clicks.lock().is_empty());
    }

    #[test]
    fn keys_without_focus_are_ignored() {
        let mut fx = Fixture::new();
        assert_eq!(fx.send(press(KeyCode::Up)), Ok(Dispatched::Ignored));
        assert!(fx.keys.lock().is_empty());
    }

    #[test]
    fn help_toggles_on_the_focused_widget_and_esc_unfocuses() {
        let mut fx = Fixture::new();
        fx.send(click(1, 1)).unwrap();
        fx.send(press(KeyCode::Char('h'))).unwrap();
        assert!(fx.container.get("a").unwrap().help_mode());
        fx.send(press(KeyCode::Esc)).unwrap();
        assert!(fx.ui.highlighted().is_none());
    }

    #[test]
    fn keyboard_errors_are_logged() {
        let mut fx = Fixture::new();
        fx.send(click(1, 1)).unwrap();
        assert_eq!(fx.send(press(KeyCode::Char('x'))), Ok(Dispatched::Handled));
        assert!(fx.log.to_string().contains("x is not allowed"));
    }

    #[test]
    fn resize_requests_repaint() {
        let mut fx = Fixture::new();
        assert_eq!(fx.send(TerminalEvent::Resize(80, 24)), Ok(Dispatched::Repaint));
    }
}
