//! The frontend widget handle.
//!
//! A [`Widget`] pairs a [`WidgetKind`] with a backend widget and the
//! engine-side metadata (name, label, annotation, bound value). Handles are
//! cheap to clone and share state; dropping the last handle drops the
//! backend widget.
//!
//! Change notification has a single source: the backend fires its change
//! callback only on a genuine value change, and that callback is the only
//! thing that emits [`Widget::changed`]. The frontend never emits the
//! signal itself, so programmatic writes and user edits are
//! indistinguishable to listeners and no-op writes stay silent.

use std::fmt;
use std::sync::{Arc, Weak};

use autoform_core::logging::targets;
use autoform_core::Signal;
use parking_lot::RwLock;

use crate::backend::{ensure_capabilities, CategoricalBackend, RangedBackend, WidgetBackend};
use crate::error::{Error, Result};
use crate::field::{Bind, ChoicesSource};
use crate::signature::ParameterKind;
use crate::types::{TypeHint, Value};
use crate::widget::WidgetKind;

pub(crate) struct WidgetInner {
    kind: WidgetKind,
    backend: Box<dyn WidgetBackend>,
    name: RwLock<String>,
    label: RwLock<Option<String>>,
    annotation: RwLock<Option<TypeHint>>,
    param_kind: RwLock<ParameterKind>,
    gui_only: RwLock<bool>,
    nullable: RwLock<bool>,
    choices_source: RwLock<Option<ChoicesSource>>,
    bind: RwLock<Option<Bind>>,
    /// Set when this widget is the face of a [`Container`]; lets container
    /// traversal recurse through widget handles.
    ///
    /// [`Container`]: crate::widget::Container
    pub(crate) container: RwLock<Option<Arc<crate::widget::ContainerState>>>,

    /// Emitted with the new value after a genuine backend change.
    pub(crate) changed: Signal<Value>,
    /// Emitted with the rendered label after `set_label`.
    pub(crate) label_changed: Signal<String>,
    pub(crate) parent_changed: Signal<()>,
}

/// A shared handle to one widget.
#[derive(Clone)]
pub struct Widget {
    pub(crate) inner: Arc<WidgetInner>,
}

impl Widget {
    /// Wrap a backend widget, verifying it implements every capability
    /// `kind` requires.
    pub fn new(kind: WidgetKind, backend: Box<dyn WidgetBackend>) -> Result<Self> {
        ensure_capabilities(kind, backend.as_ref())?;

        let inner = Arc::new(WidgetInner {
            kind,
            backend,
            name: RwLock::new(String::new()),
            label: RwLock::new(None),
            annotation: RwLock::new(None),
            param_kind: RwLock::new(ParameterKind::PositionalOrKeyword),
            gui_only: RwLock::new(false),
            nullable: RwLock::new(false),
            choices_source: RwLock::new(None),
            bind: RwLock::new(None),
            container: RwLock::new(None),
            changed: Signal::new(),
            label_changed: Signal::new(),
            parent_changed: Signal::new(),
        });

        // Forward backend change callbacks into the changed signal. The
        // weak reference lets the backend outlive callback registration
        // without keeping the widget alive.
        if let Some(value_backend) = inner.backend.as_value() {
            let weak: Weak<WidgetInner> = Arc::downgrade(&inner);
            value_backend.on_change(Box::new(move |value| {
                if let Some(inner) = weak.upgrade() {
                    inner.changed.emit(value.clone());
                }
            }));
        }

        let weak: Weak<WidgetInner> = Arc::downgrade(&inner);
        inner.backend.on_parent_change(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                // Choice callables can depend on where the widget sits in
                // the tree, so reparenting re-derives categorical choices.
                if inner.kind.is_categorical() {
                    let widget = Widget { inner: inner.clone() };
                    if let Err(error) = widget.reset_choices() {
                        tracing::warn!(
                            target: targets::WIDGET,
                            name = %widget.name(),
                            %error,
                            "failed to reset choices after reparenting"
                        );
                    }
                }
                inner.parent_changed.emit(());
            }
        }));

        Ok(Self { inner })
    }

    /// Create a widget of `kind` using the process-default backend.
    pub fn of_kind(kind: WidgetKind) -> Result<Self> {
        let backend = crate::backend::default_factory().create(kind)?;
        Self::new(kind, backend)
    }

    pub fn kind(&self) -> WidgetKind {
        self.inner.kind
    }

    /// Whether two handles refer to the same widget.
    pub fn same(&self, other: &Widget) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Backend access for toolkit-specific code paths.
    pub fn native(&self) -> &dyn WidgetBackend {
        self.inner.backend.as_ref()
    }

    // ========================================================================
    // Identity and metadata
    // ========================================================================

    pub fn name(&self) -> String {
        self.inner.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.inner.name.write() = name.into();
    }

    /// The display label: the explicit label if set, else the name with
    /// underscores rendered as spaces.
    pub fn label(&self) -> String {
        if let Some(label) = self.inner.label.read().as_ref() {
            return label.clone();
        }
        self.name().replace('_', " ")
    }

    pub fn set_label(&self, label: impl Into<String>) {
        *self.inner.label.write() = Some(label.into());
        self.inner.label_changed.emit(self.label());
    }

    pub fn annotation(&self) -> Option<TypeHint> {
        self.inner.annotation.read().clone()
    }

    pub fn set_annotation(&self, annotation: Option<TypeHint>) {
        *self.inner.annotation.write() = annotation;
    }

    pub fn param_kind(&self) -> ParameterKind {
        *self.inner.param_kind.read()
    }

    pub fn set_param_kind(&self, kind: ParameterKind) {
        *self.inner.param_kind.write() = kind;
    }

    pub fn gui_only(&self) -> bool {
        *self.inner.gui_only.read()
    }

    pub fn set_gui_only(&self, gui_only: bool) {
        *self.inner.gui_only.write() = gui_only;
    }

    pub fn nullable(&self) -> bool {
        *self.inner.nullable.read()
    }

    pub fn set_nullable(&self, nullable: bool) {
        *self.inner.nullable.write() = nullable;
    }

    pub fn bind(&self) -> Option<Bind> {
        self.inner.bind.read().clone()
    }

    pub fn set_bind(&self, bind: Option<Bind>) {
        *self.inner.bind.write() = bind;
    }

    // ========================================================================
    // Signals
    // ========================================================================

    pub fn changed(&self) -> &Signal<Value> {
        &self.inner.changed
    }

    pub fn label_changed(&self) -> &Signal<String> {
        &self.inner.label_changed
    }

    pub fn parent_changed(&self) -> &Signal<()> {
        &self.inner.parent_changed
    }

    // ========================================================================
    // Value
    // ========================================================================

    /// The widget's current value.
    ///
    /// A bound value, when present, shadows the gui state entirely.
    pub fn value(&self) -> Result<Value> {
        let bind = self.inner.bind.read().clone();
        if let Some(bind) = bind {
            return Ok(bind.resolve(self));
        }
        Ok(self.value_backend()?.value())
    }

    /// Set the gui value. For categorical widgets the value must be among
    /// the current choices.
    pub fn set_value(&self, value: Value) -> Result<()> {
        if self.inner.kind.is_categorical() {
            self.validate_choice(&value)?;
        }
        self.value_backend()?.set_value(&value);
        Ok(())
    }

    fn validate_choice(&self, value: &Value) -> Result<()> {
        let choices = self.categorical_backend()?.choices();
        let is_valid = |v: &Value| choices.iter().any(|(_, data)| data == v);
        let ok = if self.inner.kind.allows_multiple() {
            match value {
                Value::List(items) => items.iter().all(is_valid),
                _ => false,
            }
        } else {
            is_valid(value) || (value.is_null() && self.nullable())
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidChoice {
                value: value.to_string(),
                valid: choices.into_iter().map(|(label, _)| label).collect(),
            })
        }
    }

    fn value_backend(&self) -> Result<&dyn crate::backend::ValueBackend> {
        self.inner
            .backend
            .as_value()
            .ok_or_else(|| self.not_supported("value"))
    }

    // ========================================================================
    // Ranged
    // ========================================================================

    pub fn minimum(&self) -> Result<f64> {
        Ok(self.ranged_backend()?.minimum())
    }

    pub fn set_minimum(&self, minimum: f64) -> Result<()> {
        self.ranged_backend()?.set_minimum(minimum);
        Ok(())
    }

    pub fn maximum(&self) -> Result<f64> {
        Ok(self.ranged_backend()?.maximum())
    }

    pub fn set_maximum(&self, maximum: f64) -> Result<()> {
        self.ranged_backend()?.set_maximum(maximum);
        Ok(())
    }

    pub fn step(&self) -> Result<f64> {
        Ok(self.ranged_backend()?.step())
    }

    pub fn set_step(&self, step: f64) -> Result<()> {
        self.ranged_backend()?.set_step(step);
        Ok(())
    }

    pub fn range(&self) -> Result<(f64, f64)> {
        let ranged = self.ranged_backend()?;
        Ok((ranged.minimum(), ranged.maximum()))
    }

    pub fn set_range(&self, range: (f64, f64)) -> Result<()> {
        let ranged = self.ranged_backend()?;
        ranged.set_minimum(range.0);
        ranged.set_maximum(range.1);
        Ok(())
    }

    fn ranged_backend(&self) -> Result<&dyn RangedBackend> {
        self.inner
            .backend
            .as_ranged()
            .ok_or_else(|| self.not_supported("ranged"))
    }

    // ========================================================================
    // Categorical
    // ========================================================================

    /// The data side of the current choices, in presentation order.
    pub fn choices(&self) -> Result<Vec<Value>> {
        Ok(self
            .categorical_backend()?
            .choices()
            .into_iter()
            .map(|(_, data)| data)
            .collect())
    }

    pub fn choice_pairs(&self) -> Result<Vec<(String, Value)>> {
        Ok(self.categorical_backend()?.choices())
    }

    /// Install a choice source and apply it immediately. The source is
    /// retained so [`reset_choices`](Self::reset_choices) can re-derive it.
    pub fn set_choices(&self, source: ChoicesSource) -> Result<()> {
        let pairs = source.resolve(self);
        *self.inner.choices_source.write() = Some(source);
        self.categorical_backend()?.set_choices(&pairs);
        Ok(())
    }

    /// Re-evaluate the installed choice source.
    pub fn reset_choices(&self) -> Result<()> {
        let source = self.inner.choices_source.read().clone();
        if let Some(source) = source {
            let pairs = source.resolve(self);
            self.categorical_backend()?.set_choices(&pairs);
        }
        Ok(())
    }

    pub fn get_choice(&self, label: &str) -> Result<Option<Value>> {
        Ok(self.categorical_backend()?.get_choice(label))
    }

    pub fn set_choice(&self, label: &str, data: Value) -> Result<()> {
        self.categorical_backend()?.set_choice(label, data);
        Ok(())
    }

    pub fn del_choice(&self, label: &str) -> Result<()> {
        self.categorical_backend()?.del_choice(label);
        Ok(())
    }

    /// The label of the currently selected choice.
    pub fn current_choice(&self) -> Result<Option<String>> {
        let current = self.value()?;
        Ok(self
            .categorical_backend()?
            .choices()
            .into_iter()
            .find(|(_, data)| *data == current)
            .map(|(label, _)| label))
    }

    fn categorical_backend(&self) -> Result<&dyn CategoricalBackend> {
        self.inner
            .backend
            .as_categorical()
            .ok_or_else(|| self.not_supported("categorical"))
    }

    // ========================================================================
    // Text caption
    // ========================================================================

    pub fn text(&self) -> Result<String> {
        Ok(self.text_backend()?.text())
    }

    pub fn set_text(&self, text: &str) -> Result<()> {
        self.text_backend()?.set_text(text);
        Ok(())
    }

    fn text_backend(&self) -> Result<&dyn crate::backend::TextBackend> {
        self.inner
            .backend
            .as_text()
            .ok_or_else(|| self.not_supported("text"))
    }

    // ========================================================================
    // Visibility, state and geometry
    // ========================================================================

    pub fn visible(&self) -> bool {
        self.inner.backend.visible()
    }

    pub fn set_visible(&self, visible: bool) {
        self.inner.backend.set_visible(visible);
    }

    pub fn show(&self) {
        self.set_visible(true);
    }

    pub fn hide(&self) {
        self.set_visible(false);
    }

    pub fn enabled(&self) -> bool {
        self.inner.backend.enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.backend.set_enabled(enabled);
    }

    pub fn close(&self) {
        self.inner.backend.close();
    }

    pub fn tooltip(&self) -> Option<String> {
        self.inner.backend.tooltip()
    }

    pub fn set_tooltip(&self, tooltip: Option<&str>) {
        self.inner.backend.set_tooltip(tooltip);
    }

    pub fn width(&self) -> f32 {
        self.inner.backend.width()
    }

    pub fn set_width(&self, width: f32) {
        self.inner.backend.set_width(width);
    }

    pub fn set_min_width(&self, width: f32) {
        self.inner.backend.set_min_width(width);
    }

    pub fn height(&self) -> f32 {
        self.inner.backend.height()
    }

    pub fn set_height(&self, height: f32) {
        self.inner.backend.set_height(height);
    }

    fn not_supported(&self, capability: &'static str) -> Error {
        Error::NotSupported {
            name: self.name(),
            kind: self.kind(),
            capability,
        }
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}
