//! The contract a plugin implements to become a [`Widget`].
//!
//! A [`Plugin`] is a bundle of callbacks. Only `draw` is mandatory; the
//! others are attached builder-style:
//!
//! ```rust,ignore
//! use dashgrid_core::plugin::{Content, Plugin};
//!
//! let plugin = Plugin::new(|ctx, content| {
//!     if let Some(lines) = content.and_then(Content::as_lines) {
//!         ctx.canvas.lines(lines);
//!     }
//!     Ok(())
//! })
//! .with_update(|_ctx| Ok(Content::lines(vec!["fresh".into()])));
//! ```
//!
//! Plugins are looked up by name in a [`PluginRegistry`]. A [`PluginSource`]
//! supplies the builtin set and any custom set; custom entries win.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crossterm::event::{KeyEvent, MouseEventKind};

use crate::canvas::Canvas;
use crate::config::{Config, ConfigLoader, Secrets};
use crate::error::WidgetError;
use crate::log::LogMessages;
use crate::widget::Widget;

/// Per-widget scratch state, owned by the plugin's own callbacks.
///
/// The runtime never looks inside; it only hands the map to callbacks. Values
/// are keyed by type, so each plugin stores its own state struct.
#[derive(Default)]
pub struct InternalData {
    values: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl InternalData {
    /// Store `value`, replacing any previous value of the same type.
    pub fn insert<T: Any + Send>(&mut self, value: T) -> Option<T> {
        self.values
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Borrow the stored value of type `T`.
    pub fn get<T: Any + Send>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref())
    }

    /// Mutably borrow the stored value of type `T`.
    pub fn get_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.values
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut())
    }

    /// Borrow the value of type `T`, inserting `f()` first if absent.
    pub fn get_or_insert_with<T: Any + Send>(&mut self, f: impl FnOnce() -> T) -> &mut T {
        let slot = self
            .values
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(f()));
        match slot.downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("internal data keyed by TypeId holds a foreign type"),
        }
    }

    /// Remove and return the value of type `T`.
    pub fn remove<T: Any + Send>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for InternalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalData")
            .field("entries", &self.values.len())
            .finish()
    }
}

/// Content produced by `update` and handed to `draw`.
///
/// Cloning is cheap: the payload is shared, so the render path copies the
/// whole value out of the pending buffer in one step.
#[derive(Clone)]
pub struct Content(Arc<dyn Any + Send + Sync>);

impl Content {
    /// Wrap any payload.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Content(Arc::new(value))
    }

    /// The most common payload: lines of text.
    pub fn lines(lines: Vec<String>) -> Self {
        Content::new(lines)
    }

    /// Borrow the payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Borrow a [`Content::lines`] payload.
    pub fn as_lines(&self) -> Option<&[String]> {
        self.downcast_ref::<Vec<String>>().map(Vec::as_slice)
    }
}

/// Two contents are equal when they share the same payload.
impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_lines() {
            Some(lines) => f.debug_tuple("Content").field(&lines).finish(),
            None => f.write_str("Content(..)"),
        }
    }
}

/// What non-drawing callbacks receive.
pub struct WidgetContext<'a> {
    /// The widget being served.
    pub widget: &'a Widget,
    /// The widget's scratch state.
    pub data: &'a mut InternalData,
}

/// What `draw` and `help` receive.
pub struct DrawContext<'a> {
    /// The widget being drawn.
    pub widget: &'a Widget,
    /// The widget's scratch state.
    pub data: &'a mut InternalData,
    /// The widget's interior, inside its border.
    pub canvas: Canvas<'a>,
    /// Name of the focused widget, if any.
    pub focused: Option<&'a str>,
}

/// A mouse event translated into widget-local coordinates.
///
/// `(0, 0)` is the widget's top-left border corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseInput {
    /// Column relative to the widget's left edge.
    pub column: u16,
    /// Row relative to the widget's top edge.
    pub row: u16,
    /// Button state.
    pub kind: MouseEventKind,
}

/// Draws one frame; `content` is `None` for static widgets.
pub type DrawFn =
    Arc<dyn Fn(&mut DrawContext<'_>, Option<&Content>) -> Result<(), WidgetError> + Send + Sync>;
/// Produces fresh content. May block.
pub type UpdateFn = Arc<dyn Fn(&mut WidgetContext<'_>) -> Result<Content, WidgetError> + Send + Sync>;
/// Runs once before scheduling starts.
pub type InitFn = Arc<dyn Fn(&mut WidgetContext<'_>) -> Result<(), WidgetError> + Send + Sync>;
/// Handles a key press while the widget is focused.
pub type KeyboardFn =
    Arc<dyn Fn(&mut WidgetContext<'_>, KeyEvent) -> Result<(), WidgetError> + Send + Sync>;
/// Handles a mouse event inside the widget.
pub type MouseFn =
    Arc<dyn Fn(&mut WidgetContext<'_>, MouseInput) -> Result<(), WidgetError> + Send + Sync>;
/// Draws the help screen while the widget is in help mode.
pub type HelpFn = Arc<dyn Fn(&mut DrawContext<'_>) -> Result<(), WidgetError> + Send + Sync>;

/// A set of callbacks that can be bound to any number of widget configs.
#[derive(Clone)]
pub struct Plugin {
    pub(crate) draw: DrawFn,
    pub(crate) update: Option<UpdateFn>,
    pub(crate) init: Option<InitFn>,
    pub(crate) keyboard: Option<KeyboardFn>,
    pub(crate) mouse: Option<MouseFn>,
    pub(crate) help: Option<HelpFn>,
}

impl Plugin {
    /// Plugin with only a `draw` callback: a static widget.
    pub fn new<F>(draw: F) -> Self
    where
        F: Fn(&mut DrawContext<'_>, Option<&Content>) -> Result<(), WidgetError> + Send + Sync + 'static,
    {
        Self {
            draw: Arc::new(draw),
            update: None,
            init: None,
            keyboard: None,
            mouse: None,
            help: None,
        }
    }

    /// Attach a scheduled `update`.
    pub fn with_update<F>(mut self, update: F) -> Self
    where
        F: Fn(&mut WidgetContext<'_>) -> Result<Content, WidgetError> + Send + Sync + 'static,
    {
        self.update = Some(Arc::new(update));
        self
    }

    /// Attach a one-shot `init`.
    pub fn with_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&mut WidgetContext<'_>) -> Result<(), WidgetError> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    /// Attach a `keyboard` handler.
    pub fn with_keyboard<F>(mut self, keyboard: F) -> Self
    where
        F: Fn(&mut WidgetContext<'_>, KeyEvent) -> Result<(), WidgetError> + Send + Sync + 'static,
    {
        self.keyboard = Some(Arc::new(keyboard));
        self
    }

    /// Attach a `mouse` handler.
    pub fn with_mouse<F>(mut self, mouse: F) -> Self
    where
        F: Fn(&mut WidgetContext<'_>, MouseInput) -> Result<(), WidgetError> + Send + Sync + 'static,
    {
        self.mouse = Some(Arc::new(mouse));
        self
    }

    /// Attach a `help` screen.
    pub fn with_help<F>(mut self, help: F) -> Self
    where
        F: Fn(&mut DrawContext<'_>) -> Result<(), WidgetError> + Send + Sync + 'static,
    {
        self.help = Some(Arc::new(help));
        self
    }

    /// Whether widgets of this plugin refresh on a schedule.
    pub fn has_update(&self) -> bool {
        self.update.is_some()
    }

    /// Whether this plugin has a help screen.
    pub fn has_help(&self) -> bool {
        self.help.is_some()
    }

    /// Bind this plugin to `config`, producing a widget.
    pub fn build(&self, config: Config, secrets: Arc<Secrets>) -> Widget {
        Widget::new(config, self.clone(), secrets)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("update", &self.update.is_some())
            .field("init", &self.init.is_some())
            .field("keyboard", &self.keyboard.is_some())
            .field("mouse", &self.mouse.is_some())
            .field("help", &self.help.is_some())
            .finish()
    }
}

/// Name to plugin mapping.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Plugin>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` under `name`, returning any plugin it replaced.
    pub fn register(&mut self, name: impl Into<String>, plugin: Plugin) -> Option<Plugin> {
        self.plugins.insert(name.into(), plugin)
    }

    /// Builder-style [`register`](PluginRegistry::register).
    pub fn with(mut self, name: impl Into<String>, plugin: Plugin) -> Self {
        self.register(name, plugin);
        self
    }

    /// Look up a plugin.
    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Merge `overrides` into this registry. Entries in `overrides` replace
    /// entries of the same name.
    pub fn merge(mut self, overrides: PluginRegistry) -> Self {
        for (name, plugin) in overrides.plugins {
            if self.plugins.insert(name.clone(), plugin).is_some() {
                tracing::info!(plugin = %name, "custom plugin overrides builtin");
            }
        }
        self
    }
}

/// Where plugins come from.
pub trait PluginSource {
    /// Plugins compiled into the binary.
    fn builtin(&self) -> PluginRegistry;

    /// Plugins declared in the config directory. Problems with the
    /// declarations are reported as messages.
    fn custom(&self, loader: &ConfigLoader) -> Result<PluginRegistry, LogMessages>;

    /// Builtins merged with custom plugins, custom entries winning.
    fn registry(&self, loader: &ConfigLoader) -> Result<PluginRegistry, LogMessages> {
        Ok(self.builtin().merge(self.custom(loader)?))
    }
}

/// A fixed registry with no custom plugins.
impl PluginSource for PluginRegistry {
    fn builtin(&self) -> PluginRegistry {
        self.clone()
    }

    fn custom(&self, _loader: &ConfigLoader) -> Result<PluginRegistry, LogMessages> {
        Ok(PluginRegistry::new())
    }
}
