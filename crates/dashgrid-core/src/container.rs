//! The widget registry, layout arithmetic and the per-frame draw cycle.

use std::collections::HashSet;
use std::sync::Arc;

use ratatui::buffer::Buffer;
use ratatui::layout::{Rect, Size};

use crate::canvas::{self, Canvas};
use crate::dimensions::LayoutMode;
use crate::error::{contain, LayoutError, Signal, WidgetError};
use crate::log::LogMessages;
use crate::plugin::DrawContext;
use crate::ui_state::UiState;
use crate::widget::Widget;

/// What one call to [`WidgetContainer::render_frame`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Widgets whose plugin drew this frame.
    pub drawn: usize,
    /// Widgets shown from their last snapshot or as "Loading...".
    pub deferred: usize,
    /// Widgets showing an error panel.
    pub errors: usize,
}

enum Drawn {
    Fresh,
    Deferred,
    Failed(WidgetError),
}

/// Owns the widgets of one session, in render order.
#[derive(Debug, Default)]
pub struct WidgetContainer {
    widgets: Vec<Arc<Widget>>,
    layout: LayoutMode,
    min_size: Size,
    snapshots: Vec<Option<Buffer>>,
}

impl WidgetContainer {
    /// Empty container using `layout` to derive widget geometry.
    pub fn new(layout: LayoutMode) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Append `widgets` in order. Nothing is added if any name is taken,
    /// either by an existing widget or within the batch.
    pub fn add_widgets(
        &mut self,
        widgets: impl IntoIterator<Item = Widget>,
    ) -> Result<(), LayoutError> {
        let widgets: Vec<Widget> = widgets.into_iter().collect();
        let mut names: HashSet<&str> = self.widgets.iter().map(|w| w.name()).collect();
        for widget in &widgets {
            if !names.insert(widget.name()) {
                return Err(LayoutError::DuplicateName(widget.name().to_string()));
            }
        }
        for widget in widgets {
            tracing::debug!(widget = %widget.name(), enabled = widget.is_enabled(), "widget added");
            self.widgets.push(Arc::new(widget));
            self.snapshots.push(None);
        }
        Ok(())
    }

    /// Every widget, enabled or not.
    pub fn widgets(&self) -> &[Arc<Widget>] {
        &self.widgets
    }

    /// The widgets the runtime operates on, in render order.
    pub fn enabled_widgets(&self) -> impl DoubleEndedIterator<Item = &Arc<Widget>> + '_ {
        self.widgets.iter().filter(|w| w.is_enabled())
    }

    /// Hand input that waited on a busy `update` to its widgets.
    pub(crate) fn replay_input(&self, log: &mut LogMessages) {
        for widget in self.enabled_widgets() {
            for e in widget.replay_input() {
                log.extend(e.log_messages(widget.name()));
            }
        }
    }

    /// Look a widget up by name.
    pub fn get(&self, name: &str) -> Option<&Arc<Widget>> {
        self.widgets.iter().find(|w| w.name() == name)
    }

    /// Smallest terminal the enabled widgets fit in.
    pub fn min_size(&self) -> Size {
        self.min_size
    }

    /// Derive every enabled widget's geometry from `terminal`, then the
    /// aggregate minimum size.
    pub fn recompute_bounds(&mut self, terminal: Size) {
        let (mut width, mut height) = (0_u32, 0_u32);
        for (widget, snapshot) in self.widgets.iter().zip(self.snapshots.iter_mut()) {
            if !widget.is_enabled() {
                continue;
            }
            let before = widget.area();
            let dims = widget.rescale(terminal, self.layout);
            if dims.current() != before {
                *snapshot = None;
            }
            width = width.max(dims.right());
            height = height.max(dims.bottom());
        }
        self.min_size = Size::new(clamp(width), clamp(height));
    }

    /// Fail with [`Signal::TerminalTooSmall`] unless `terminal` holds the
    /// aggregate minimum size.
    pub fn validate_terminal_size(&self, terminal: Size) -> Result<(), Signal> {
        if terminal.width < self.min_size.width || terminal.height < self.min_size.height {
            return Err(Signal::TerminalTooSmall {
                required: self.min_size,
                actual: terminal,
            });
        }
        Ok(())
    }

    /// The topmost enabled widget under (`column`, `row`). Later widgets
    /// are drawn over earlier ones, so they win.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<&Arc<Widget>> {
        self.enabled_widgets()
            .rev()
            .find(|w| w.dimensions().contains(column, row))
    }

    /// Forget every snapshot, e.g. after the screen was cleared.
    pub fn invalidate_snapshots(&mut self) {
        self.snapshots.iter_mut().for_each(|s| *s = None);
    }

    /// Draw every enabled widget into `buf`.
    ///
    /// Widget failures are drawn in place and folded into `log`; they never
    /// escape this function.
    pub fn render_frame(
        &mut self,
        buf: &mut Buffer,
        ui: &UiState,
        log: &mut LogMessages,
    ) -> FrameReport {
        let focused = ui.highlighted_name();
        let mut report = FrameReport::default();
        for (widget, snapshot) in self.widgets.iter().zip(self.snapshots.iter_mut()) {
            if !widget.is_enabled() {
                continue;
            }
            let area = widget.area().intersection(buf.area);
            if area.is_empty() {
                continue;
            }
            let is_focused = ui.is_highlighted(widget);
            match draw_widget(widget, buf, area, is_focused, focused.as_deref()) {
                Drawn::Fresh => {
                    *snapshot = Some(canvas::snapshot(buf, area));
                    report.drawn += 1;
                }
                Drawn::Deferred => {
                    match snapshot {
                        Some(saved) if saved.area == area => {
                            canvas::restore(buf, saved);
                            canvas::draw_chrome(buf, area, widget.title(), is_focused);
                        }
                        _ => {
                            let inner = canvas::draw_chrome(buf, area, widget.title(), is_focused);
                            canvas::draw_loading(buf, inner);
                        }
                    }
                    report.deferred += 1;
                }
                Drawn::Failed(error) => {
                    canvas::draw_error(buf, area, widget.title(), &error.lines());
                    log.extend(error.log_messages(widget.name()));
                    *snapshot = None;
                    report.errors += 1;
                }
            }
        }
        report
    }
}

fn draw_widget(
    widget: &Widget,
    buf: &mut Buffer,
    area: Rect,
    is_focused: bool,
    focused: Option<&str>,
) -> Drawn {
    let plugin = widget.plugin();
    let help = plugin.help.as_ref().filter(|_| widget.help_mode());

    let content = match widget.pending() {
        _ if help.is_some() => None,
        Some(Err(error)) => return Drawn::Failed(error),
        Some(Ok(content)) => Some(content),
        None if widget.is_scheduled() => return Drawn::Deferred,
        None => None,
    };
    let Some(mut data) = widget.try_internal() else {
        return Drawn::Deferred;
    };

    let inner = canvas::draw_chrome(buf, area, widget.title(), is_focused);
    let mut ctx = DrawContext {
        widget,
        data: &mut data,
        canvas: Canvas::new(buf, inner),
        focused,
    };
    let result = match help {
        Some(help) => contain(|| help(&mut ctx)),
        None => contain(|| (plugin.draw)(&mut ctx, content.as_ref())),
    };
    match result {
        Ok(()) => Drawn::Fresh,
        Err(error) => Drawn::Failed(error),
    }
}

fn clamp(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dimensions::BaseDimensions;
    use crate::plugin::{Content, Plugin};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(name: &str, x: u16, y: u16) -> Config {
        Config::new(name, name.to_uppercase(), BaseDimensions::new(x, y, 12, 4))
    }

    fn text_plugin(text: &'static str) -> Plugin {
        Plugin::new(move |ctx, _| {
            ctx.canvas.lines([text]);
            Ok(())
        })
    }

    fn lines_plugin() -> Plugin {
        Plugin::new(|ctx, content| {
            if let Some(lines) = content.and_then(Content::as_lines) {
                ctx.canvas.lines(lines);
            }
            Ok(())
        })
        .with_update(|_| Ok(Content::lines(vec!["fresh".into()])))
    }

    fn render(container: &mut WidgetContainer, log: &mut LogMessages) -> (String, FrameReport) {
        let mut buf = Buffer::empty(Rect::new(0, 0, 30, 8));
        let report = container.render_frame(&mut buf, &UiState::new(), log);
        let text = (0..8)
            .map(|y| (0..30).map(|x| buf[(x, y)].symbol().to_string()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");
        (text, report)
    }

    #[test]
    fn duplicate_names_are_rejected_atomically() {
        let mut container = WidgetContainer::default();
        container
            .add_widgets([text_plugin("a").build(config("a", 0, 0), Arc::default())])
            .unwrap();
        let result = container.add_widgets([
            text_plugin("b").build(config("b", 0, 0), Arc::default()),
            text_plugin("a").build(config("a", 0, 0), Arc::default()),
        ]);
        assert_eq!(result, Err(LayoutError::DuplicateName("a".into())));
        assert_eq!(container.widgets().len(), 1);
    }

    #[test]
    fn bounds_ignore_disabled_widgets() {
        let mut container = WidgetContainer::default();
        container
            .add_widgets([
                text_plugin("a").build(config("a", 0, 0), Arc::default()),
                text_plugin("b").build(config("b", 50, 20).with_enabled(false), Arc::default()),
            ])
            .unwrap();
        container.recompute_bounds(Size::new(30, 8));
        assert_eq!(container.min_size(), Size::new(12, 4));
        assert!(container.validate_terminal_size(Size::new(12, 4)).is_ok());
        assert!(matches!(
            container.validate_terminal_size(Size::new(11, 10)),
            Err(Signal::TerminalTooSmall { .. })
        ));
    }

    #[test]
    fn static_widgets_draw_every_frame() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let plugin = Plugin::new(move |_, content| {
            assert!(content.is_none());
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let mut container = WidgetContainer::default();
        container
            .add_widgets([plugin.build(config("s", 0, 0), Arc::default())])
            .unwrap();
        let mut log = LogMessages::new();
        for _ in 0..5 {
            render(&mut container, &mut log);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn scheduled_widget_shows_loading_until_first_publish() {
        let mut container = WidgetContainer::default();
        container
            .add_widgets([lines_plugin().build(config("feed", 0, 0), Arc::default())])
            .unwrap();
        let mut log = LogMessages::new();
        let (text, report) = render(&mut container, &mut log);
        assert!(text.contains("Loading..."));
        assert_eq!(report.deferred, 1);

        container.widgets()[0].run_update();
        let (text, report) = render(&mut container, &mut log);
        assert!(text.contains("fresh"));
        assert_eq!(report.drawn, 1);
    }

    #[test]
    fn busy_widget_reuses_its_last_frame() {
        let mut container = WidgetContainer::default();
        container
            .add_widgets([lines_plugin().build(config("feed", 0, 0), Arc::default())])
            .unwrap();
        let widget = container.widgets()[0].clone();
        widget.run_update();
        let mut log = LogMessages::new();
        render(&mut container, &mut log);

        let guard = widget.try_internal().unwrap();
        let (text, report) = render(&mut container, &mut log);
        drop(guard);
        assert_eq!(report.deferred, 1);
        assert!(text.contains("fresh"));
        assert!(!text.contains("Loading"));
    }

    #[test]
    fn failing_widget_is_contained() {
        let broken = Plugin::new(|_, _| Ok(())).with_update(|_| Err(WidgetError::failed("offline")));
        let mut container = WidgetContainer::default();
        container
            .add_widgets([
                broken.build(config("news", 0, 0), Arc::default()),
                text_plugin("fine").build(config("ok", 14, 0), Arc::default()),
            ])
            .unwrap();
        container.widgets()[0].run_update();
        let mut log = LogMessages::new();
        let (text, report) = render(&mut container, &mut log);
        render(&mut container, &mut log);
        assert!(text.contains("offline"));
        assert!(text.contains("fine"));
        assert_eq!(report.errors, 1);
        assert_eq!(report.drawn, 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn panicking_draw_becomes_an_error_panel() {
        let plugin = Plugin::new(|_, _| panic!("bad draw"));
        let mut container = WidgetContainer::default();
        container
            .add_widgets([plugin.build(config("p", 0, 0), Arc::default())])
            .unwrap();
        let mut log = LogMessages::new();
        let (text, report) = render(&mut container, &mut log);
        assert_eq!(report.errors, 1);
        assert!(text.contains("bad draw"));
    }

    #[test]
    fn hit_test_prefers_the_last_widget() {
        let mut container = WidgetContainer::default();
        container
            .add_widgets([
                text_plugin("a").build(config("under", 0, 0), Arc::default()),
                text_plugin("b").build(config("over", 5, 2), Arc::default()),
                text_plugin("c").build(config("off", 0, 0).with_enabled(false), Arc::default()),
            ])
            .unwrap();
        assert_eq!(container.hit_test(6, 3).map(|w| w.name()), Some("over"));
        assert_eq!(container.hit_test(1, 1).map(|w| w.name()), Some("under"));
        assert!(container.hit_test(29, 7).is_none());
    }
}
