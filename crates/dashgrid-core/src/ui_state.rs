//! Which widget has focus.

use std::sync::{Arc, Weak};

use crate::widget::Widget;

/// Focus tracking. Lives on the render context only, so it needs no lock.
///
/// Focus is held weakly: clearing it never drops a widget, and a widget that
/// is gone simply stops being focused.
#[derive(Debug, Default)]
pub struct UiState {
    highlighted: Option<Weak<Widget>>,
}

impl UiState {
    /// No widget focused.
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus `widget`, replacing any previous focus.
    pub fn highlight(&mut self, widget: &Arc<Widget>) {
        tracing::debug!(widget = %widget.name(), "focus");
        self.highlighted = Some(Arc::downgrade(widget));
    }

    /// Drop focus.
    pub fn clear(&mut self) {
        if self.highlighted.take().is_some() {
            tracing::debug!("focus cleared");
        }
    }

    /// The focused widget, if it still exists.
    pub fn highlighted(&self) -> Option<Arc<Widget>> {
        self.highlighted.as_ref().and_then(Weak::upgrade)
    }

    /// Whether `widget` is the focused one.
    pub fn is_highlighted(&self, widget: &Widget) -> bool {
        self.highlighted
            .as_ref()
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), widget))
    }

    /// Name of the focused widget.
    pub fn highlighted_name(&self) -> Option<String> {
        self.highlighted().map(|w| w.name().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dimensions::BaseDimensions;
    use crate::plugin::Plugin;

    fn widget(name: &str) -> Arc<Widget> {
        let config = Config::new(name, name, BaseDimensions::new(0, 0, 4, 4));
        Arc::new(Plugin::new(|_, _| Ok(())).build(config, Arc::default()))
    }

    #[test]
    fn at_most_one_widget_is_highlighted() {
        let (a, b) = (widget("a"), widget("b"));
        let mut ui = UiState::new();
        ui.highlight(&a);
        ui.highlight(&b);
        assert!(ui.is_highlighted(&b));
        assert!(!ui.is_highlighted(&a));
        assert_eq!(ui.highlighted_name().as_deref(), Some("b"));
    }

    #[test]
    fn clearing_focus_keeps_the_widget_alive() {
        let a = widget("a");
        let mut ui = UiState::new();
        ui.highlight(&a);
        ui.clear();
        assert!(ui.highlighted().is_none());
        assert_eq!(Arc::strong_count(&a), 1);
    }

    #[test]
    fn dropped_widget_is_no_longer_focused() {
        let mut ui = UiState::new();
        ui.highlight(&widget("gone"));
        assert!(ui.highlighted().is_none());
    }
}
