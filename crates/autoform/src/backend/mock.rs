//! A headless in-memory backend.
//!
//! [`MockBackend`] implements the full widget protocol with plain state and
//! no rendering. It is the default backend, which keeps the engine fully
//! functional (and testable) without a gui toolkit on the system.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use autoform_core::Property;
use parking_lot::Mutex;

use super::{
    BackendFactory, BackendId, CategoricalBackend, ContainerBackend, RangedBackend, TextBackend,
    ValueBackend, WidgetBackend,
};
use crate::error::Result;
use crate::types::Value;
use crate::widget::WidgetKind;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Approximate glyph advance used for text measurement, in pixels.
const GLYPH_WIDTH: f32 = 7.0;

#[derive(Clone, Copy, Default)]
struct Caps {
    value: bool,
    ranged: bool,
    categorical: bool,
    text: bool,
    container: bool,
}

impl Caps {
    fn for_kind(kind: WidgetKind) -> Self {
        Self {
            value: kind.has_value(),
            ranged: kind.is_ranged(),
            categorical: kind.is_categorical(),
            text: kind.has_text(),
            container: kind.is_container(),
        }
    }
}

/// One mock widget. All protocol state lives in-process.
pub struct MockBackend {
    id: BackendId,
    kind: WidgetKind,
    caps: Caps,

    closed: Property<bool>,
    visible: Property<bool>,
    enabled: Property<bool>,
    tooltip: Property<Option<String>>,

    parent: Property<Option<BackendId>>,
    parent_callbacks: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,

    width: Property<f32>,
    min_width: Property<f32>,
    max_width: Property<f32>,
    height: Property<f32>,
    min_height: Property<f32>,
    max_height: Property<f32>,

    value: Property<Value>,
    change_callbacks: Mutex<Vec<Box<dyn Fn(&Value) + Send + Sync>>>,

    minimum: Property<f64>,
    maximum: Property<f64>,
    step: Property<f64>,
    adaptive: Property<bool>,

    choices: Mutex<Vec<(String, Value)>>,

    text: Property<String>,

    children: Mutex<Vec<BackendId>>,
    margins: Property<(f32, f32, f32, f32)>,
}

fn initial_value(kind: WidgetKind) -> Value {
    match kind {
        WidgetKind::CheckBox | WidgetKind::PushButton | WidgetKind::RadioButton => {
            Value::Bool(false)
        }
        WidgetKind::SpinBox | WidgetKind::Slider | WidgetKind::ProgressBar => Value::Int(0),
        WidgetKind::FloatSpinBox | WidgetKind::FloatSlider => Value::Float(0.0),
        WidgetKind::LineEdit | WidgetKind::TextEdit | WidgetKind::PasswordEdit => {
            Value::Str(String::new())
        }
        WidgetKind::FileEdit => Value::Path(Default::default()),
        WidgetKind::DateEdit => Value::Date(Default::default()),
        WidgetKind::TimeEdit => Value::Time(Default::default()),
        WidgetKind::DateTimeEdit => Value::DateTime(Default::default()),
        WidgetKind::RangeEdit => Value::Range {
            start: 0,
            stop: 10,
            step: 1,
        },
        WidgetKind::SliceEdit => Value::Slice {
            start: 0,
            stop: 10,
            step: 1,
        },
        WidgetKind::ListEdit => Value::List(Vec::new()),
        WidgetKind::TupleEdit => Value::Tuple(Vec::new()),
        WidgetKind::Select => Value::List(Vec::new()),
        WidgetKind::Table => Value::Table(Vec::new()),
        _ => Value::Null,
    }
}

impl MockBackend {
    pub fn new(kind: WidgetKind) -> Self {
        Self::with_caps(kind, Caps::for_kind(kind))
    }

    /// A widget with no capabilities at all, for exercising the
    /// construction-time protocol check.
    pub fn bare(kind: WidgetKind) -> Self {
        Self::with_caps(kind, Caps::default())
    }

    fn with_caps(kind: WidgetKind, caps: Caps) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            caps,
            closed: Property::new(false),
            visible: Property::new(true),
            enabled: Property::new(true),
            tooltip: Property::new(None),
            parent: Property::new(None),
            parent_callbacks: Mutex::new(Vec::new()),
            width: Property::new(100.0),
            min_width: Property::new(0.0),
            max_width: Property::new(f32::MAX),
            height: Property::new(20.0),
            min_height: Property::new(0.0),
            max_height: Property::new(f32::MAX),
            value: Property::new(initial_value(kind)),
            change_callbacks: Mutex::new(Vec::new()),
            minimum: Property::new(0.0),
            maximum: Property::new(if kind.is_ranged() { 1000.0 } else { 0.0 }),
            step: Property::new(1.0),
            adaptive: Property::new(false),
            choices: Mutex::new(Vec::new()),
            text: Property::new(String::new()),
            children: Mutex::new(Vec::new()),
            margins: Property::new((6.0, 6.0, 6.0, 6.0)),
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    fn store_value(&self, value: Value) {
        if self.value.set(value.clone()) {
            for callback in self.change_callbacks.lock().iter() {
                callback(&value);
            }
        }
    }

    /// Keep the stored selection consistent with the choice list after a
    /// replacement. Multi-select widgets drop vanished selections; single
    /// selects fall back to the first choice.
    fn reconcile_selection(&self, choices: &[(String, Value)]) {
        let current = self.value.get();
        if self.kind.allows_multiple() {
            let retained: Vec<Value> = match &current {
                Value::List(items) => items
                    .iter()
                    .filter(|v| choices.iter().any(|(_, data)| data == *v))
                    .cloned()
                    .collect(),
                _ => Vec::new(),
            };
            self.store_value(Value::List(retained));
        } else {
            let still_there = choices.iter().any(|(_, data)| *data == current);
            if !still_there {
                let fallback = choices
                    .first()
                    .map(|(_, data)| data.clone())
                    .unwrap_or(Value::Null);
                self.store_value(fallback);
            }
        }
    }
}

impl WidgetBackend for MockBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    fn close(&self) {
        self.closed.set(true);
        self.visible.set(false);
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }

    fn visible(&self) -> bool {
        self.visible.get()
    }

    fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    fn enabled(&self) -> bool {
        self.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    fn parent(&self) -> Option<BackendId> {
        self.parent.get()
    }

    fn set_parent(&self, parent: Option<BackendId>) {
        if self.parent.set(parent) {
            for callback in self.parent_callbacks.lock().iter() {
                callback();
            }
        }
    }

    fn on_parent_change(&self, callback: Box<dyn Fn() + Send + Sync>) {
        self.parent_callbacks.lock().push(callback);
    }

    fn tooltip(&self) -> Option<String> {
        self.tooltip.get()
    }

    fn set_tooltip(&self, tooltip: Option<&str>) {
        self.tooltip.set(tooltip.map(str::to_owned));
    }

    fn width(&self) -> f32 {
        self.width.get()
    }

    fn set_width(&self, width: f32) {
        self.width.set(width);
    }

    fn min_width(&self) -> f32 {
        self.min_width.get()
    }

    fn set_min_width(&self, width: f32) {
        self.min_width.set(width);
        if self.width.get() < width {
            self.width.set(width);
        }
    }

    fn max_width(&self) -> f32 {
        self.max_width.get()
    }

    fn set_max_width(&self, width: f32) {
        self.max_width.set(width);
        if self.width.get() > width {
            self.width.set(width);
        }
    }

    fn height(&self) -> f32 {
        self.height.get()
    }

    fn set_height(&self, height: f32) {
        self.height.set(height);
    }

    fn min_height(&self) -> f32 {
        self.min_height.get()
    }

    fn set_min_height(&self, height: f32) {
        self.min_height.set(height);
        if self.height.get() < height {
            self.height.set(height);
        }
    }

    fn max_height(&self) -> f32 {
        self.max_height.get()
    }

    fn set_max_height(&self, height: f32) {
        self.max_height.set(height);
        if self.height.get() > height {
            self.height.set(height);
        }
    }

    fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * GLYPH_WIDTH
    }

    fn as_value(&self) -> Option<&dyn ValueBackend> {
        self.caps.value.then_some(self as &dyn ValueBackend)
    }

    fn as_ranged(&self) -> Option<&dyn RangedBackend> {
        self.caps.ranged.then_some(self as &dyn RangedBackend)
    }

    fn as_categorical(&self) -> Option<&dyn CategoricalBackend> {
        self.caps
            .categorical
            .then_some(self as &dyn CategoricalBackend)
    }

    fn as_text(&self) -> Option<&dyn TextBackend> {
        self.caps.text.then_some(self as &dyn TextBackend)
    }

    fn as_container(&self) -> Option<&dyn ContainerBackend> {
        self.caps.container.then_some(self as &dyn ContainerBackend)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ValueBackend for MockBackend {
    fn value(&self) -> Value {
        self.value.get()
    }

    fn set_value(&self, value: &Value) {
        self.store_value(value.clone());
    }

    fn on_change(&self, callback: Box<dyn Fn(&Value) + Send + Sync>) {
        self.change_callbacks.lock().push(callback);
    }
}

impl RangedBackend for MockBackend {
    fn minimum(&self) -> f64 {
        self.minimum.get()
    }

    fn set_minimum(&self, minimum: f64) {
        self.minimum.set(minimum);
    }

    fn maximum(&self) -> f64 {
        self.maximum.get()
    }

    fn set_maximum(&self, maximum: f64) {
        self.maximum.set(maximum);
    }

    fn step(&self) -> f64 {
        self.step.get()
    }

    fn set_step(&self, step: f64) {
        self.step.set(step);
    }

    fn adaptive_step(&self) -> bool {
        self.adaptive.get()
    }

    fn set_adaptive_step(&self, enabled: bool) {
        self.adaptive.set(enabled);
    }
}

impl CategoricalBackend for MockBackend {
    fn choices(&self) -> Vec<(String, Value)> {
        self.choices.lock().clone()
    }

    fn set_choices(&self, choices: &[(String, Value)]) {
        *self.choices.lock() = choices.to_vec();
        self.reconcile_selection(choices);
    }

    fn get_choice(&self, label: &str) -> Option<Value> {
        self.choices
            .lock()
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, data)| data.clone())
    }

    fn set_choice(&self, label: &str, data: Value) {
        let mut choices = self.choices.lock();
        match choices.iter_mut().find(|(l, _)| l == label) {
            Some(entry) => entry.1 = data,
            None => choices.push((label.to_owned(), data)),
        }
    }

    fn del_choice(&self, label: &str) {
        let mut choices = self.choices.lock();
        choices.retain(|(l, _)| l != label);
        let snapshot = choices.clone();
        drop(choices);
        self.reconcile_selection(&snapshot);
    }

    fn count(&self) -> usize {
        self.choices.lock().len()
    }
}

impl TextBackend for MockBackend {
    fn text(&self) -> String {
        self.text.get()
    }

    fn set_text(&self, text: &str) {
        self.text.set(text.to_owned());
    }
}

impl ContainerBackend for MockBackend {
    fn insert_child(&self, index: usize, child: BackendId) {
        let mut children = self.children.lock();
        let index = index.min(children.len());
        children.insert(index, child);
    }

    fn remove_child(&self, child: BackendId) {
        self.children.lock().retain(|c| *c != child);
    }

    fn child_count(&self) -> usize {
        self.children.lock().len()
    }

    fn margins(&self) -> (f32, f32, f32, f32) {
        self.margins.get()
    }

    fn set_margins(&self, margins: (f32, f32, f32, f32)) {
        self.margins.set(margins);
    }
}

/// Creates [`MockBackend`] widgets.
pub struct MockBackendFactory;

impl MockBackendFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockBackendFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory for MockBackendFactory {
    fn create(&self, kind: WidgetKind) -> Result<Box<dyn WidgetBackend>> {
        Ok(Box::new(MockBackend::new(kind)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
