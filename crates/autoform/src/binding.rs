//! Two-way binding between guis and model instances.
//!
//! [`bind_gui_to_instance`] wires a container's value widgets to the
//! equally named fields of a [`BindableModel`]: widget edits write the
//! model, and (when the model exposes per-field change signals) model
//! writes update the widgets. Each direction carries its own reentrancy
//! flag, so one edit propagates exactly once and never echoes back.
//!
//! [`GuiModel`] is the batteries-included model: declared fields, evented
//! writes, and a lazily built, cached, bound gui.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use autoform_core::logging::targets;
use autoform_core::{ConnectionId, Signal};
use parking_lot::{Mutex, RwLock};

use crate::backend::{default_factory, BackendFactory};
use crate::error::{Error, Result};
use crate::field::UiField;
use crate::registry::{global_registry, TypeRegistry};
use crate::types::Value;
use crate::widget::{create_widget_with, Container, Orientation, Widget};

/// A model whose named fields can back a gui.
pub trait BindableModel: Send + Sync {
    fn field_names(&self) -> Vec<String>;
    fn get_field(&self, name: &str) -> Option<Value>;
    /// Write a field, returning `true` if the stored value changed.
    /// Implementations emit their field signal on genuine change.
    fn set_field(&self, name: &str, value: Value) -> bool;
    /// The per-field change signal, if the model has one. Models without
    /// signals still receive widget edits; they just cannot push updates
    /// back to the gui.
    fn field_signal(&self, name: &str) -> Option<&Signal<Value>>;
}

struct BindingEntry {
    widget_conn: ConnectionId,
    model_conn: Option<(String, ConnectionId)>,
}

type BindingKey = (u64, usize);

fn bindings() -> &'static Mutex<HashMap<BindingKey, BindingEntry>> {
    static BINDINGS: OnceLock<Mutex<HashMap<BindingKey, BindingEntry>>> = OnceLock::new();
    BINDINGS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn instance_key<M: BindableModel + ?Sized>(instance: &Arc<M>) -> usize {
    Arc::as_ptr(instance) as *const () as usize
}

/// Connect a container's widgets to `instance`'s fields by name.
///
/// Widgets that are buttons, gui-only, unnamed, or whose name matches no
/// model field are skipped. With `two_way`, a field lacking a change
/// signal is downgraded to one-way with a warning rather than an error.
pub fn bind_gui_to_instance<M>(container: &Container, instance: &Arc<M>, two_way: bool)
where
    M: BindableModel + 'static,
{
    for widget in container.children() {
        let name = widget.name();
        if name.is_empty()
            || widget.gui_only()
            || widget.kind().is_button()
            || !widget.kind().has_value()
        {
            continue;
        }
        if instance.get_field(&name).is_none() {
            continue;
        }

        let key = (widget.native().id(), instance_key(instance));
        if bindings().lock().contains_key(&key) {
            continue;
        }

        // One flag per direction; a propagation step no-ops when the flag
        // for the opposite direction is up.
        let updating_model = Arc::new(AtomicBool::new(false));
        let updating_widget = Arc::new(AtomicBool::new(false));

        let widget_conn = {
            let weak_instance: Weak<M> = Arc::downgrade(instance);
            let updating_model = updating_model.clone();
            let updating_widget = updating_widget.clone();
            let field = name.clone();
            widget.changed().connect(move |value: &Value| {
                if updating_widget.load(Ordering::SeqCst) {
                    return;
                }
                let Some(instance) = weak_instance.upgrade() else {
                    return;
                };
                updating_model.store(true, Ordering::SeqCst);
                instance.set_field(&field, value.clone());
                updating_model.store(false, Ordering::SeqCst);
            })
        };

        let model_conn = if two_way {
            match instance.field_signal(&name) {
                Some(signal) => {
                    let weak_widget = Arc::downgrade(&widget.inner);
                    let conn = signal.connect(move |value: &Value| {
                        if updating_model.load(Ordering::SeqCst) {
                            return;
                        }
                        let Some(inner) = weak_widget.upgrade() else {
                            return;
                        };
                        let widget = Widget { inner };
                        updating_widget.store(true, Ordering::SeqCst);
                        if let Err(error) = widget.set_value(value.clone()) {
                            tracing::warn!(
                                target: targets::BINDING,
                                field = %widget.name(),
                                %error,
                                "model value rejected by widget"
                            );
                        }
                        updating_widget.store(false, Ordering::SeqCst);
                    });
                    Some((name.clone(), conn))
                }
                None => {
                    tracing::warn!(
                        target: targets::BINDING,
                        field = %name,
                        "field has no change signal; binding one-way"
                    );
                    None
                }
            }
        } else {
            None
        };

        bindings().lock().insert(
            key,
            BindingEntry {
                widget_conn,
                model_conn,
            },
        );
    }
}

/// Disconnect every binding between this container and `instance`.
/// Idempotent: unbound pairs are skipped silently.
pub fn unbind_gui_from_instance<M>(container: &Container, instance: &Arc<M>)
where
    M: BindableModel + 'static,
{
    for widget in container.children() {
        let key = (widget.native().id(), instance_key(instance));
        let Some(entry) = bindings().lock().remove(&key) else {
            continue;
        };
        widget.changed().disconnect(entry.widget_conn);
        if let Some((field, conn)) = entry.model_conn {
            if let Some(signal) = instance.field_signal(&field) {
                signal.disconnect(conn);
            }
        }
    }
}

// ============================================================================
// GuiModel
// ============================================================================

/// A field-declared model with evented writes and a cached, bound gui.
pub struct GuiModel {
    fields: Vec<UiField>,
    values: RwLock<HashMap<String, Value>>,
    signals: HashMap<String, Signal<Value>>,
    gui: Mutex<Option<Container>>,
}

impl GuiModel {
    /// Declare a model from its fields. Every field needs a name, and
    /// names must be unique.
    pub fn new(fields: Vec<UiField>) -> Result<Arc<Self>> {
        let mut values = HashMap::new();
        let mut signals = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            let name = field.name.clone().ok_or_else(|| Error::InvalidOption {
                key: "name".into(),
                message: format!("model field {i} has no name"),
            })?;
            if fields[..i].iter().any(|f| f.name.as_deref() == Some(&name)) {
                return Err(Error::DuplicateName(name));
            }
            values.insert(name.clone(), field.effective_default().unwrap_or(Value::Null));
            signals.insert(name, Signal::new());
        }
        Ok(Arc::new(Self {
            fields,
            values: RwLock::new(values),
            signals,
            gui: Mutex::new(None),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.get_field(name)
    }

    /// Write a field, emitting its change signal on genuine change.
    pub fn set(&self, name: &str, value: Value) -> bool {
        self.set_field(name, value)
    }

    /// The change signal for one field.
    pub fn events(&self, name: &str) -> Option<&Signal<Value>> {
        self.signals.get(name)
    }

    /// Build an unbound gui for this model's current state.
    pub fn build_widget(
        &self,
        registry: &TypeRegistry,
        factory: &dyn BackendFactory,
    ) -> Result<Container> {
        let container = Container::new(Orientation::Vertical, true)?;
        for field in &self.fields {
            let name = field.name.clone().unwrap_or_default();
            let value = self.get_field(&name);
            let widget = create_widget_with(
                registry,
                factory,
                &name,
                value.as_ref().filter(|v| !v.is_null()),
                field.type_hint.as_ref(),
                field,
                false,
            )?;
            container.push(&widget)?;
        }
        Ok(container)
    }

    /// The model's gui, built and bound two-way on first access, cached
    /// afterwards.
    pub fn gui(self: &Arc<Self>) -> Result<Container> {
        let mut cached = self.gui.lock();
        if let Some(container) = cached.as_ref() {
            return Ok(container.clone());
        }
        let container = self.build_widget(global_registry(), default_factory().as_ref())?;
        bind_gui_to_instance(&container, self, true);
        *cached = Some(container.clone());
        Ok(container)
    }

    /// Unbind and drop the cached gui. The next [`gui`](Self::gui) call
    /// builds a fresh one.
    pub fn clear_gui(self: &Arc<Self>) {
        let mut cached = self.gui.lock();
        if let Some(container) = cached.take() {
            unbind_gui_from_instance(&container, self);
        }
    }
}

// Derive is blocked by the signal and cached-gui fields.
impl std::fmt::Debug for GuiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuiModel")
            .field("fields", &self.field_names())
            .field("values", &*self.values.read())
            .finish_non_exhaustive()
    }
}

impl BindableModel for GuiModel {
    fn field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter_map(|f| f.name.clone())
            .collect()
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    fn set_field(&self, name: &str, value: Value) -> bool {
        let changed = {
            let mut values = self.values.write();
            match values.get_mut(name) {
                Some(slot) if *slot != value => {
                    *slot = value.clone();
                    true
                }
                _ => false,
            }
        };
        if changed {
            if let Some(signal) = self.signals.get(name) {
                signal.emit(value);
            }
        }
        changed
    }

    fn field_signal(&self, name: &str) -> Option<&Signal<Value>> {
        self.signals.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackendFactory;
    use crate::types::TypeHint;
    use crate::widget::WidgetKind;
    use std::sync::atomic::AtomicUsize;

    fn model() -> Arc<GuiModel> {
        GuiModel::new(vec![
            UiField::named("count")
                .with_type(TypeHint::Int)
                .with_default(3),
            UiField::named("active")
                .with_type(TypeHint::Bool)
                .with_default(false),
        ])
        .unwrap()
    }

    fn bound_gui(model: &Arc<GuiModel>) -> Container {
        let container = model
            .build_widget(&TypeRegistry::new(), &MockBackendFactory::new())
            .unwrap();
        bind_gui_to_instance(&container, model, true);
        container
    }

    #[test]
    fn fields_need_unique_names() {
        let err = GuiModel::new(vec![UiField::new().with_default(1)]).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));

        let err = GuiModel::new(vec![UiField::named("x"), UiField::named("x")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(n) if n == "x"));
    }

    #[test]
    fn model_debug_names_its_fields() {
        let rendered = format!("{:?}", model());
        assert!(rendered.contains("count"));
        assert!(rendered.contains("active"));
    }

    #[test]
    fn widget_edits_write_the_model() {
        let model = model();
        let gui = bound_gui(&model);

        gui.widget("count")
            .unwrap()
            .set_value(Value::Int(9))
            .unwrap();
        assert_eq!(model.get("count"), Some(Value::Int(9)));
    }

    #[test]
    fn model_writes_update_the_widget() {
        let model = model();
        let gui = bound_gui(&model);

        assert!(model.set("count", Value::Int(12)));
        assert_eq!(
            gui.widget("count").unwrap().value().unwrap(),
            Value::Int(12)
        );
    }

    #[test]
    fn propagation_happens_exactly_once() {
        let model = model();
        let gui = bound_gui(&model);
        let widget = gui.widget("count").unwrap();

        let widget_events = Arc::new(AtomicUsize::new(0));
        let model_events = Arc::new(AtomicUsize::new(0));
        let we = widget_events.clone();
        widget.changed().connect(move |_| {
            we.fetch_add(1, Ordering::SeqCst);
        });
        let me = model_events.clone();
        model.events("count").unwrap().connect(move |_| {
            me.fetch_add(1, Ordering::SeqCst);
        });

        widget.set_value(Value::Int(5)).unwrap();
        assert_eq!(widget_events.load(Ordering::SeqCst), 1);
        assert_eq!(model_events.load(Ordering::SeqCst), 1);

        model.set("count", Value::Int(6));
        assert_eq!(widget_events.load(Ordering::SeqCst), 2);
        assert_eq!(model_events.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn checkbox_fields_bind_like_any_value_widget() {
        let model = model();
        let gui = bound_gui(&model);
        let active = gui.widget("active").unwrap();
        assert_eq!(active.kind(), WidgetKind::CheckBox);

        active.set_value(Value::Bool(true)).unwrap();
        assert_eq!(model.get("active"), Some(Value::Bool(true)));

        model.set("active", Value::Bool(false));
        assert_eq!(active.value().unwrap(), Value::Bool(false));
    }

    #[test]
    fn unbind_is_complete_and_idempotent() {
        let model = model();
        let gui = bound_gui(&model);
        let widget = gui.widget("count").unwrap();

        unbind_gui_from_instance(&gui, &model);
        unbind_gui_from_instance(&gui, &model);

        widget.set_value(Value::Int(50)).unwrap();
        assert_eq!(model.get("count"), Some(Value::Int(3)));

        model.set("count", Value::Int(60));
        assert_eq!(widget.value().unwrap(), Value::Int(50));
    }

    #[test]
    fn gui_is_cached_until_cleared() {
        let model = model();
        let first = model.gui().unwrap();
        let second = model.gui().unwrap();
        assert!(first.as_widget().same(second.as_widget()));

        model.clear_gui();
        let third = model.gui().unwrap();
        assert!(!first.as_widget().same(third.as_widget()));
    }

    #[test]
    fn widgets_missing_from_the_model_are_skipped() {
        let model = model();
        let gui = bound_gui(&model);

        let stray = Widget::of_kind(WidgetKind::SpinBox).unwrap();
        stray.set_name("stray");
        gui.push(&stray).unwrap();
        bind_gui_to_instance(&gui, &model, true);

        stray.set_value(Value::Int(5)).unwrap();
        assert_eq!(model.get("stray"), None);
    }

    struct SignallessModel {
        value: RwLock<Value>,
    }

    impl BindableModel for SignallessModel {
        fn field_names(&self) -> Vec<String> {
            vec!["count".into()]
        }

        fn get_field(&self, name: &str) -> Option<Value> {
            (name == "count").then(|| self.value.read().clone())
        }

        fn set_field(&self, name: &str, value: Value) -> bool {
            if name != "count" {
                return false;
            }
            let mut slot = self.value.write();
            if *slot != value {
                *slot = value;
                true
            } else {
                false
            }
        }

        fn field_signal(&self, _name: &str) -> Option<&Signal<Value>> {
            None
        }
    }

    #[test]
    fn missing_field_signal_downgrades_to_one_way() {
        let model = Arc::new(SignallessModel {
            value: RwLock::new(Value::Int(0)),
        });
        let gui = Container::new(Orientation::Vertical, true).unwrap();
        let widget = Widget::of_kind(WidgetKind::SpinBox).unwrap();
        widget.set_name("count");
        gui.push(&widget).unwrap();

        // Requesting two-way must not fail.
        bind_gui_to_instance(&gui, &model, true);

        widget.set_value(Value::Int(4)).unwrap();
        assert_eq!(model.get_field("count"), Some(Value::Int(4)));
    }
}
