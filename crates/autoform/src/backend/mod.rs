//! The backend widget protocol.
//!
//! A backend renders widgets; the engine only ever talks to it through the
//! traits in this module. [`WidgetBackend`] is the base protocol every
//! backend widget implements, and the optional capability traits
//! ([`ValueBackend`], [`RangedBackend`], [`CategoricalBackend`],
//! [`TextBackend`], [`ContainerBackend`]) are surfaced through accessor
//! methods returning `Option<&dyn ...>`. Which capabilities a
//! [`WidgetKind`] requires is checked once, at widget construction, by
//! [`ensure_capabilities`]; a deficient backend fails loudly with the full
//! list of missing methods instead of erroring lazily on first use.
//!
//! [`MockBackend`] is a headless in-memory backend, always available; gui
//! toolkit backends implement the same traits in their own crates and are
//! installed with [`set_default_factory`].

mod mock;

pub use mock::{MockBackend, MockBackendFactory};

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::Value;
use crate::widget::WidgetKind;

/// Identifies a backend widget within its backend.
pub type BackendId = u64;

// ============================================================================
// Base protocol
// ============================================================================

/// The base protocol: lifecycle, visibility, geometry and parenting.
pub trait WidgetBackend: Send + Sync {
    fn id(&self) -> BackendId;

    fn close(&self);
    fn is_closed(&self) -> bool;

    fn visible(&self) -> bool;
    fn set_visible(&self, visible: bool);

    fn enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);

    fn parent(&self) -> Option<BackendId>;
    fn set_parent(&self, parent: Option<BackendId>);
    /// Register a callback fired after the widget is reparented.
    fn on_parent_change(&self, callback: Box<dyn Fn() + Send + Sync>);

    fn tooltip(&self) -> Option<String>;
    fn set_tooltip(&self, tooltip: Option<&str>);

    fn width(&self) -> f32;
    fn set_width(&self, width: f32);
    fn min_width(&self) -> f32;
    fn set_min_width(&self, width: f32);
    fn max_width(&self) -> f32;
    fn set_max_width(&self, width: f32);

    fn height(&self) -> f32;
    fn set_height(&self, height: f32);
    fn min_height(&self) -> f32;
    fn set_min_height(&self, height: f32);
    fn max_height(&self) -> f32;
    fn set_max_height(&self, height: f32);

    /// The rendered width of `text` in this widget's font, in pixels.
    fn text_width(&self, text: &str) -> f32;

    // Capability accessors. A backend returns `Some` only for the
    // capabilities its widget actually implements.

    fn as_value(&self) -> Option<&dyn ValueBackend> {
        None
    }

    fn as_ranged(&self) -> Option<&dyn RangedBackend> {
        None
    }

    fn as_categorical(&self) -> Option<&dyn CategoricalBackend> {
        None
    }

    fn as_text(&self) -> Option<&dyn TextBackend> {
        None
    }

    fn as_container(&self) -> Option<&dyn ContainerBackend> {
        None
    }

    /// Escape hatch for backend-specific access to the native widget.
    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// Capability traits
// ============================================================================

/// Widgets holding a current value.
pub trait ValueBackend: Send + Sync {
    fn value(&self) -> Value;
    /// Set the value. Implementations fire change callbacks only when the
    /// stored value genuinely changed; the frontend never emits on its own.
    fn set_value(&self, value: &Value);
    fn on_change(&self, callback: Box<dyn Fn(&Value) + Send + Sync>);
}

/// Numeric widgets constrained to a minimum/maximum/step.
pub trait RangedBackend: Send + Sync {
    fn minimum(&self) -> f64;
    fn set_minimum(&self, minimum: f64);
    fn maximum(&self) -> f64;
    fn set_maximum(&self, maximum: f64);
    fn step(&self) -> f64;
    fn set_step(&self, step: f64);

    /// Adaptive stepping is an optional refinement; backends without it
    /// report `false` and ignore writes.
    fn adaptive_step(&self) -> bool {
        false
    }
    fn set_adaptive_step(&self, _enabled: bool) {}
}

/// Widgets selecting from a list of named choices.
pub trait CategoricalBackend: Send + Sync {
    /// Current `(label, data)` pairs in presentation order.
    fn choices(&self) -> Vec<(String, Value)>;
    /// Replace the choice list. The current selection is preserved when its
    /// data is still present, otherwise it falls back to the first choice.
    fn set_choices(&self, choices: &[(String, Value)]);
    fn get_choice(&self, label: &str) -> Option<Value>;
    fn set_choice(&self, label: &str, data: Value);
    fn del_choice(&self, label: &str);
    fn count(&self) -> usize;
}

/// Widgets with a text caption of their own (labels, buttons).
pub trait TextBackend: Send + Sync {
    fn text(&self) -> String;
    fn set_text(&self, text: &str);
}

/// Widgets laying out child widgets.
pub trait ContainerBackend: Send + Sync {
    fn insert_child(&self, index: usize, child: BackendId);
    fn remove_child(&self, child: BackendId);
    fn child_count(&self) -> usize;
    /// `(left, top, right, bottom)` margins in pixels.
    fn margins(&self) -> (f32, f32, f32, f32);
    fn set_margins(&self, margins: (f32, f32, f32, f32));
}

// ============================================================================
// Capability checking
// ============================================================================

pub const VALUE_METHODS: &[&str] = &["value", "set_value", "on_change"];
pub const RANGED_METHODS: &[&str] = &[
    "minimum",
    "set_minimum",
    "maximum",
    "set_maximum",
    "step",
    "set_step",
];
pub const CATEGORICAL_METHODS: &[&str] = &[
    "choices",
    "set_choices",
    "get_choice",
    "set_choice",
    "del_choice",
    "count",
];
pub const TEXT_METHODS: &[&str] = &["text", "set_text"];
pub const CONTAINER_METHODS: &[&str] = &[
    "insert_child",
    "remove_child",
    "child_count",
    "margins",
    "set_margins",
];

/// Verify `backend` implements every capability `kind` requires.
///
/// Called once per widget, at construction. The error names the capability
/// and enumerates its required methods so a backend author sees the whole
/// contract at once.
pub fn ensure_capabilities(kind: WidgetKind, backend: &dyn WidgetBackend) -> Result<()> {
    if kind.has_value() && backend.as_value().is_none() {
        return Err(missing(kind, "value", VALUE_METHODS));
    }
    if kind.is_ranged() && backend.as_ranged().is_none() {
        return Err(missing(kind, "ranged", RANGED_METHODS));
    }
    if kind.is_categorical() && backend.as_categorical().is_none() {
        return Err(missing(kind, "categorical", CATEGORICAL_METHODS));
    }
    if kind.has_text() && backend.as_text().is_none() {
        return Err(missing(kind, "text", TEXT_METHODS));
    }
    if kind.is_container() && backend.as_container().is_none() {
        return Err(missing(kind, "container", CONTAINER_METHODS));
    }
    Ok(())
}

fn missing(kind: WidgetKind, capability: &'static str, methods: &'static [&'static str]) -> Error {
    Error::MissingCapability {
        kind,
        capability,
        methods,
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Creates backend widgets for the engine.
pub trait BackendFactory: Send + Sync {
    fn create(&self, kind: WidgetKind) -> Result<Box<dyn WidgetBackend>>;
    fn name(&self) -> &str;
}

static DEFAULT_FACTORY: RwLock<Option<Arc<dyn BackendFactory>>> = RwLock::new(None);

/// The process-wide backend factory. Defaults to the mock backend until a
/// gui toolkit backend installs itself.
pub fn default_factory() -> Arc<dyn BackendFactory> {
    if let Some(factory) = DEFAULT_FACTORY.read().as_ref() {
        return factory.clone();
    }
    let mut slot = DEFAULT_FACTORY.write();
    slot.get_or_insert_with(|| Arc::new(MockBackendFactory::new()))
        .clone()
}

/// Install a backend factory as the process-wide default.
pub fn set_default_factory(factory: Arc<dyn BackendFactory>) {
    tracing::debug!(
        target: autoform_core::logging::targets::WIDGET,
        backend = factory.name(),
        "installing default backend factory"
    );
    *DEFAULT_FACTORY.write() = Some(factory);
}
