//! Plugin registry: named widget factories with shared services.
//!
//! A plugin creates widgets of one or more kinds and may hold state its
//! widgets share (a font handle, an interpreter). Widgets do not keep a
//! reference to their plugin; anything they need is passed in at
//! construction through [`PluginContext`].

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use crate::gpu::GpuBackend;
use crate::terminal::FontMetrics;
use crate::widget::{WidgetError, WidgetHandle, WidgetParams};

/// Descriptive plugin metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMeta {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
}

impl PluginMeta {
    pub fn new(name: &str, version: &str, author: &str, description: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: version.to_owned(),
            author: author.to_owned(),
            description: description.to_owned(),
        }
    }
}

/// Services injected into plugins and, through them, into widgets.
pub struct PluginContext<B: GpuBackend> {
    pub device: B::Device,
    pub metrics: FontMetrics,
}

impl<B: GpuBackend> Clone for PluginContext<B> {
    fn clone(&self) -> Self {
        Self {
            device: self.device.clone(),
            metrics: self.metrics,
        }
    }
}

/// A widget factory.
pub trait Plugin<B: GpuBackend> {
    fn meta(&self) -> &PluginMeta;

    /// Kinds this plugin creates. The first is used when a create request
    /// names only the plugin.
    fn widget_kinds(&self) -> &[&'static str];

    /// Construct and initialize a widget, normally through
    /// [`crate::widget::build`].
    fn create_widget(
        &mut self,
        kind: &str,
        params: WidgetParams,
        payload: &str,
        ctx: &PluginContext<B>,
    ) -> Result<WidgetHandle<B>, WidgetError>;

    fn on_terminal_resize(&mut self, _cols: usize, _lines: usize) {}

    /// Release plugin-global state. Called once.
    fn dispose(&mut self) {}
}

/// Deferred plugin constructor for [`PluginRegistry::register_lazy`].
pub type PluginLoader<B> =
    Box<dyn FnOnce(&PluginContext<B>) -> Result<Box<dyn Plugin<B>>, WidgetError>>;

enum Slot<B: GpuBackend> {
    Pending(Option<PluginLoader<B>>),
    Loaded(Box<dyn Plugin<B>>),
    Failed(Arc<dyn Error + Send + Sync>),
}

/// Plugins by name.
pub struct PluginRegistry<B: GpuBackend> {
    slots: BTreeMap<String, Slot<B>>,
    ctx: PluginContext<B>,
    disposed: bool,
}

impl<B: GpuBackend> PluginRegistry<B> {
    pub fn new(ctx: PluginContext<B>) -> Self {
        Self {
            slots: BTreeMap::new(),
            ctx,
            disposed: false,
        }
    }

    pub fn context(&self) -> &PluginContext<B> {
        &self.ctx
    }

    /// Metrics handed to plugins created from now on.
    pub fn set_metrics(&mut self, metrics: FontMetrics) {
        self.ctx.metrics = metrics;
    }

    /// Register a ready plugin under its meta name, replacing any previous
    /// registration.
    pub fn register(&mut self, plugin: Box<dyn Plugin<B>>) {
        let name = plugin.meta().name.clone();
        log::debug!("registered plugin `{name}`");
        if let Some(Slot::Loaded(mut old)) = self.slots.insert(name, Slot::Loaded(plugin)) {
            old.dispose();
        }
    }

    /// Register a plugin constructed on first use. A failed load is
    /// remembered and reported on every later request.
    pub fn register_lazy<F>(&mut self, name: &str, loader: F)
    where
        F: FnOnce(&PluginContext<B>) -> Result<Box<dyn Plugin<B>>, WidgetError> + 'static,
    {
        log::debug!("registered lazy plugin `{name}`");
        let slot = Slot::Pending(Some(Box::new(loader)));
        if let Some(Slot::Loaded(mut old)) = self.slots.insert(name.to_owned(), slot) {
            old.dispose();
        }
    }

    /// Create a widget. `spec` is `plugin` or `plugin.kind`; `args` are
    /// layout flags parsed into [`WidgetParams`].
    pub fn create(
        &mut self,
        spec: &str,
        args: &str,
        payload: &str,
    ) -> Result<WidgetHandle<B>, WidgetError> {
        if self.disposed {
            return Err(WidgetError::Disposed("plugin registry".to_owned()));
        }
        let (plugin_name, kind) = match spec.split_once('.') {
            Some((plugin, kind)) => (plugin, Some(kind)),
            None => (spec, None),
        };
        let params = WidgetParams::parse(args)?;

        let plugin = load(&mut self.slots, &self.ctx, plugin_name)?;
        let kind = match kind {
            Some(kind) if plugin.widget_kinds().contains(&kind) => kind,
            Some(kind) => {
                return Err(WidgetError::UnknownWidget {
                    plugin: plugin_name.to_owned(),
                    kind: kind.to_owned(),
                });
            }
            None => plugin.widget_kinds().first().copied().ok_or_else(|| {
                WidgetError::UnknownWidget {
                    plugin: plugin_name.to_owned(),
                    kind: String::new(),
                }
            })?,
        };
        plugin.create_widget(kind, params, payload, &self.ctx)
    }

    /// Registered plugin names, sorted, including ones not yet loaded.
    pub fn available_plugins(&self) -> Vec<&str> {
        self.slots.keys().map(String::as_str).collect()
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Widget kinds of `name`, loading it if needed.
    pub fn widget_kinds(&mut self, name: &str) -> Result<Vec<&'static str>, WidgetError> {
        let plugin = load(&mut self.slots, &self.ctx, name)?;
        Ok(plugin.widget_kinds().to_vec())
    }

    /// Metadata of `name`, loading it if needed.
    pub fn meta(&mut self, name: &str) -> Result<PluginMeta, WidgetError> {
        let plugin = load(&mut self.slots, &self.ctx, name)?;
        Ok(plugin.meta().clone())
    }

    /// Broadcast a terminal grid size change to loaded plugins.
    pub fn on_terminal_resize(&mut self, cols: usize, lines: usize) {
        for slot in self.slots.values_mut() {
            if let Slot::Loaded(plugin) = slot {
                plugin.on_terminal_resize(cols, lines);
            }
        }
    }

    /// Dispose every loaded plugin. Later calls do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for (name, slot) in &mut self.slots {
            if let Slot::Loaded(plugin) = slot {
                log::debug!("disposing plugin `{name}`");
                plugin.dispose();
            }
        }
    }
}

impl<B: GpuBackend> Drop for PluginRegistry<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Resolve `name` to a loaded plugin, running a pending loader once.
fn load<'a, B: GpuBackend>(
    slots: &'a mut BTreeMap<String, Slot<B>>,
    ctx: &PluginContext<B>,
    name: &str,
) -> Result<&'a mut dyn Plugin<B>, WidgetError> {
    let slot = slots
        .get_mut(name)
        .ok_or_else(|| WidgetError::UnknownPlugin(name.to_owned()))?;

    if let Slot::Pending(loader) = slot {
        *slot = match loader.take().map(|run| run(ctx)) {
            Some(Ok(plugin)) => {
                log::info!("loaded plugin `{name}` {}", plugin.meta().version);
                Slot::Loaded(plugin)
            }
            Some(Err(e)) => {
                log::error!("plugin `{name}` failed to load: {e}");
                Slot::Failed(Arc::new(e))
            }
            None => Slot::Failed(Arc::new(WidgetError::Disposed(name.to_owned()))),
        };
    }

    match slot {
        Slot::Loaded(plugin) => Ok(plugin.as_mut()),
        Slot::Failed(source) => Err(WidgetError::PluginLoad {
            name: name.to_owned(),
            source: Arc::clone(source),
        }),
        Slot::Pending(_) => Err(WidgetError::UnknownPlugin(name.to_owned())),
    }
}

#[cfg(test)]
mod tests;
