//! The runtime entity wrapping one plugin instance.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyEvent;
use parking_lot::{Mutex, MutexGuard};
use ratatui::layout::{Rect, Size};

use crate::config::{Config, Secrets};
use crate::dimensions::{Dimensions, LayoutMode};
use crate::error::{contain, WidgetError};
use crate::plugin::{Content, InternalData, MouseInput, Plugin, WidgetContext};

/// What travels through the pending buffer: fresh content or the reason
/// there is none.
pub type Pending = Result<Content, WidgetError>;

/// Events held back while `update` owns the scratch state.
const INPUT_QUEUE_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy)]
enum QueuedInput {
    Key(KeyEvent),
    Mouse(MouseInput),
}

#[derive(Default)]
struct PendingSlot {
    payload: Option<Pending>,
    publishes: u64,
}

/// One pane of the dashboard.
///
/// Widgets are shared between the render context and the scheduler thread
/// behind an `Arc`. The only state both sides touch is the pending buffer,
/// and each side holds its lock just long enough to assign or clone.
pub struct Widget {
    config: Config,
    plugin: Plugin,
    secrets: Arc<Secrets>,
    dimensions: Mutex<Dimensions>,
    internal: Mutex<InternalData>,
    pending: Mutex<PendingSlot>,
    queued: Mutex<VecDeque<QueuedInput>>,
    help_mode: AtomicBool,
    init_failed: AtomicBool,
    publishes: AtomicU64,
}

impl Widget {
    pub(crate) fn new(config: Config, plugin: Plugin, secrets: Arc<Secrets>) -> Self {
        let dimensions = Dimensions::new(config.dimensions);
        Self {
            config,
            plugin,
            secrets,
            dimensions: Mutex::new(dimensions),
            internal: Mutex::new(InternalData::default()),
            pending: Mutex::new(PendingSlot::default()),
            queued: Mutex::new(VecDeque::new()),
            help_mode: AtomicBool::new(false),
            init_failed: AtomicBool::new(false),
            publishes: AtomicU64::new(0),
        }
    }

    /// Unique widget name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Title drawn in the top border.
    pub fn title(&self) -> &str {
        &self.config.title
    }

    /// The config this widget was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Secrets available to the plugin.
    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    /// Whether the widget takes part in the session at all.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Refresh interval, or `None` for a single refresh.
    pub fn interval(&self) -> Option<Duration> {
        self.config.interval()
    }

    /// Whether the plugin refreshes this widget on a schedule.
    pub fn is_scheduled(&self) -> bool {
        self.plugin.has_update()
    }

    pub(crate) fn plugin(&self) -> &Plugin {
        &self.plugin
    }

    /// Current geometry.
    pub fn dimensions(&self) -> Dimensions {
        *self.dimensions.lock()
    }

    /// Current on-screen rectangle.
    pub fn area(&self) -> Rect {
        self.dimensions.lock().current()
    }

    pub(crate) fn rescale(&self, terminal: Size, mode: LayoutMode) -> Dimensions {
        let mut dimensions = self.dimensions.lock();
        dimensions.rescale(terminal, mode);
        *dimensions
    }

    /// Whether the help screen is showing.
    pub fn help_mode(&self) -> bool {
        self.help_mode.load(Ordering::Relaxed)
    }

    /// Flip help mode, returning the new value.
    pub fn toggle_help(&self) -> bool {
        !self.help_mode.fetch_xor(true, Ordering::Relaxed)
    }

    /// Replace the pending content. The lock covers only the assignment.
    pub fn publish(&self, result: Pending) {
        if let Err(e) = &result {
            tracing::warn!(widget = %self.name(), error = %e, "widget published an error");
        }
        let mut slot = self.pending.lock();
        slot.payload = Some(result);
        slot.publishes += 1;
        drop(slot);
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    /// Clone the pending content out of the buffer.
    pub fn pending(&self) -> Option<Pending> {
        self.pending.lock().payload.clone()
    }

    /// Clone the pending content together with the publish count it belongs to.
    pub fn pending_with_count(&self) -> (Option<Pending>, u64) {
        let slot = self.pending.lock();
        (slot.payload.clone(), slot.publishes)
    }

    /// How many times anything has been published.
    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }

    /// Whether `init` failed; such widgets are never scheduled.
    pub fn init_failed(&self) -> bool {
        self.init_failed.load(Ordering::Relaxed)
    }

    /// Run `init` once. A failure is published so the pane shows it.
    pub(crate) fn run_init(&self) {
        let Some(init) = self.plugin.init.clone() else {
            return;
        };
        let mut data = self.internal.lock();
        let result = contain(|| {
            init(&mut WidgetContext {
                widget: self,
                data: &mut data,
            })
        });
        drop(data);
        if let Err(e) = result {
            self.init_failed.store(true, Ordering::Relaxed);
            self.publish(Err(e));
        }
    }

    /// Run `update` and publish whatever it produced. Panics are contained.
    pub(crate) fn run_update(&self) {
        let Some(update) = self.plugin.update.clone() else {
            return;
        };
        let result = {
            let mut data = self.internal.lock();
            contain(|| {
                update(&mut WidgetContext {
                    widget: self,
                    data: &mut data,
                })
            })
        };
        self.publish(result);
    }

    /// Forward a key press. Returns `None` without a handler.
    ///
    /// While `update` holds the scratch state the key is queued and
    /// delivered by [`replay_input`](Self::replay_input) once it is free.
    pub(crate) fn run_keyboard(&self, key: KeyEvent) -> Option<Vec<WidgetError>> {
        self.plugin.keyboard.as_ref()?;
        Some(self.deliver(QueuedInput::Key(key)))
    }

    /// Forward a mouse event already translated to widget coordinates.
    pub(crate) fn run_mouse(&self, input: MouseInput) -> Option<Vec<WidgetError>> {
        self.plugin.mouse.as_ref()?;
        Some(self.deliver(QueuedInput::Mouse(input)))
    }

    /// Deliver queued input, in arrival order, if the scratch state is free.
    pub(crate) fn replay_input(&self) -> Vec<WidgetError> {
        if self.queued.lock().is_empty() {
            return Vec::new();
        }
        self.drain_input()
    }

    /// Number of events waiting for the scratch state.
    pub fn queued_input(&self) -> usize {
        self.queued.lock().len()
    }

    fn deliver(&self, input: QueuedInput) -> Vec<WidgetError> {
        let mut queue = self.queued.lock();
        if queue.len() == INPUT_QUEUE_LIMIT {
            queue.pop_front();
            tracing::warn!(widget = %self.name(), "input queue full, dropped the oldest event");
        }
        queue.push_back(input);
        drop(queue);
        self.drain_input()
    }

    fn drain_input(&self) -> Vec<WidgetError> {
        let Some(mut data) = self.try_internal() else {
            tracing::debug!(widget = %self.name(), "input queued until update finishes");
            return Vec::new();
        };
        let inputs: Vec<QueuedInput> = self.queued.lock().drain(..).collect();
        inputs
            .into_iter()
            .filter_map(|input| self.call_input(&mut data, input).err())
            .collect()
    }

    fn call_input(&self, data: &mut InternalData, input: QueuedInput) -> Result<(), WidgetError> {
        let mut ctx = WidgetContext { widget: self, data };
        match input {
            QueuedInput::Key(key) => match &self.plugin.keyboard {
                Some(keyboard) => contain(|| keyboard(&mut ctx, key)),
                None => Ok(()),
            },
            QueuedInput::Mouse(mouse_input) => match &self.plugin.mouse {
                Some(mouse) => contain(|| mouse(&mut ctx, mouse_input)),
                None => Ok(()),
            },
        }
    }

    /// The scratch state, unless a callback on another thread holds it.
    pub(crate) fn try_internal(&self) -> Option<MutexGuard<'_, InternalData>> {
        let guard = self.internal.try_lock();
        if guard.is_none() {
            tracing::debug!(widget = %self.name(), "internal data busy");
        }
        guard
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("name", &self.config.name)
            .field("enabled", &self.config.enabled)
            .field("plugin", &self.plugin)
            .field("publishes", &self.publish_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::BaseDimensions;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn config() -> Config {
        Config::new("counter", "Counter", BaseDimensions::new(0, 0, 10, 4))
    }

    #[derive(Default)]
    struct Count(u32);

    fn counting_plugin() -> Plugin {
        Plugin::new(|_, _| Ok(()))
            .with_init(|ctx| {
                ctx.data.insert(Count(100));
                Ok(())
            })
            .with_update(|ctx| {
                let count = ctx.data.get_or_insert_with(Count::default);
                count.0 += 1;
                Ok(Content::new(count.0))
            })
            .with_keyboard(|ctx, _key| {
                ctx.data.get_or_insert_with(Count::default).0 = 0;
                Ok(())
            })
    }

    #[test]
    fn init_then_update_publishes() {
        let widget = counting_plugin().build(config(), Arc::default());
        assert!(widget.pending().is_none());
        widget.run_init();
        widget.run_update();
        let content = widget.pending().unwrap().unwrap();
        assert_eq!(content.downcast_ref::<u32>(), Some(&101));
        assert_eq!(widget.publish_count(), 1);
    }

    #[test]
    fn failing_init_is_published_and_flagged() {
        let plugin = Plugin::new(|_, _| Ok(())).with_init(|_| Err(WidgetError::failed("no board")));
        let widget = plugin.build(config(), Arc::default());
        widget.run_init();
        assert!(widget.init_failed());
        assert_eq!(
            widget.pending(),
            Some(Err(WidgetError::failed("no board")))
        );
    }

    #[test]
    fn panicking_update_publishes_panicked_error() {
        let plugin = Plugin::new(|_, _| Ok(())).with_update(|_| panic!("boom"));
        let widget = plugin.build(config(), Arc::default());
        widget.run_update();
        assert_eq!(
            widget.pending(),
            Some(Err(WidgetError::Panicked("boom".into())))
        );
    }

    #[test]
    fn keyboard_waits_while_internal_data_is_busy() {
        let widget = counting_plugin().build(config(), Arc::default());
        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        let guard = widget.internal.lock();
        assert_eq!(widget.run_keyboard(key), Some(vec![]));
        assert_eq!(widget.queued_input(), 1);
        assert!(widget.replay_input().is_empty());
        assert_eq!(widget.queued_input(), 1);
        drop(guard);
        assert!(widget.replay_input().is_empty());
        assert_eq!(widget.queued_input(), 0);
        assert_eq!(widget.internal.lock().get::<Count>().map(|c| c.0), Some(0));
    }

    #[test]
    fn key_sent_during_slow_update_is_delivered_after_it() {
        use std::sync::mpsc;
        use std::thread;

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let started_tx = parking_lot::Mutex::new(started_tx);
        let release_rx = parking_lot::Mutex::new(release_rx);
        let plugin = Plugin::new(|_, _| Ok(()))
            .with_update(move |ctx| {
                ctx.data.insert(Vec::<char>::new());
                let _ = started_tx.lock().send(());
                let _ = release_rx.lock().recv();
                ctx.data.get_or_insert_with(Vec::<char>::new).push('u');
                Ok(Content::new(()))
            })
            .with_keyboard(|ctx, key| {
                if let KeyCode::Char(c) = key.code {
                    ctx.data.get_or_insert_with(Vec::<char>::new).push(c);
                }
                Ok(())
            });
        let widget = Arc::new(plugin.build(config(), Arc::default()));

        let updating = Arc::clone(&widget);
        let update = thread::spawn(move || updating.run_update());
        started_rx.recv().unwrap();

        let left = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        let right = KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE);
        assert_eq!(widget.run_keyboard(left), Some(vec![]));
        assert_eq!(widget.run_keyboard(right), Some(vec![]));
        assert_eq!(widget.queued_input(), 2);

        release_tx.send(()).unwrap();
        update.join().unwrap();
        assert!(widget.replay_input().is_empty());

        let seen = widget.internal.lock().get::<Vec<char>>().cloned();
        assert_eq!(seen, Some(vec!['u', 'a', 'b']));
    }

    #[test]
    fn errors_from_queued_input_are_returned() {
        let plugin = Plugin::new(|_, _| Ok(()))
            .with_keyboard(|_, _| Err(WidgetError::failed("bad key")));
        let widget = plugin.build(config(), Arc::default());
        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        let guard = widget.internal.lock();
        widget.run_keyboard(key);
        widget.run_keyboard(key);
        drop(guard);
        assert_eq!(
            widget.replay_input(),
            vec![WidgetError::failed("bad key"), WidgetError::failed("bad key")]
        );
    }

    #[test]
    fn help_toggle_flips() {
        let widget = counting_plugin().build(config(), Arc::default());
        assert!(widget.toggle_help());
        assert!(widget.help_mode());
        assert!(!widget.toggle_help());
    }
}
