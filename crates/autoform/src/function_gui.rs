//! A callable with a widget per parameter.
//!
//! [`FunctionGui`] binds a function to a [`Container`] built from its
//! signature. Calling the gui gathers each parameter's value from its
//! widget (or from a bound value, or a per-call override), invokes the
//! function, and routes the result to the result widget, registered return
//! callbacks and the [`called`](FunctionGui::called) signal. A call button
//! and change-driven auto-calling are built in.
//!
//! # Example
//!
//! ```
//! use autoform::function_gui::{arg, FunctionGuiBuilder};
//! use autoform::signature::{MagicSignature, Parameter};
//! use autoform::types::{TypeHint, Value};
//!
//! let signature = MagicSignature::builder()
//!     .param(Parameter::new("a").annotation(TypeHint::Int).default(2))
//!     .param(Parameter::new("b").annotation(TypeHint::Int).default(3))
//!     .returns(TypeHint::Int)
//!     .build()
//!     .unwrap();
//!
//! let gui = FunctionGuiBuilder::new("add", signature, |args| {
//!     let a = arg(args, "a").and_then(Value::as_i64).unwrap_or(0);
//!     let b = arg(args, "b").and_then(Value::as_i64).unwrap_or(0);
//!     Value::Int(a + b)
//! })
//! .build()
//! .unwrap();
//!
//! assert_eq!(gui.call(&[]).unwrap(), Value::Int(5));
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use autoform_core::logging::targets;
use autoform_core::{Signal, Throttle};
use parking_lot::RwLock;

use crate::backend::{default_factory, BackendFactory};
use crate::error::{Error, Result};
use crate::field::UiField;
use crate::persist::{dump_state, load_state_quiet, state_path};
use crate::registry::{global_registry, TypeRegistry};
use crate::signature::MagicSignature;
use crate::types::{TypeHint, Value};
use crate::widget::{Container, Orientation, Widget, WidgetKind};

/// Arguments handed to the wrapped function: `(name, value)` pairs in
/// parameter order.
pub type CallArgs = [(String, Value)];

/// Convenience lookup into [`CallArgs`].
pub fn arg<'a>(args: &'a CallArgs, name: &str) -> Option<&'a Value> {
    args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

enum RegistryHandle {
    Global,
    Local(Arc<TypeRegistry>),
}

impl RegistryHandle {
    fn get(&self) -> &TypeRegistry {
        match self {
            RegistryHandle::Global => global_registry(),
            RegistryHandle::Local(registry) => registry,
        }
    }
}

struct PersistState {
    path: PathBuf,
    throttle: Throttle,
}

struct FgInner {
    name: String,
    function: Arc<dyn Fn(&CallArgs) -> Value + Send + Sync>,
    container: Container,
    call_button: Option<Widget>,
    result_widget: Option<Widget>,
    return_annotation: Option<TypeHint>,
    registry: RegistryHandle,
    call_count: AtomicUsize,
    /// True while a call is in flight; suppresses auto-call reentry.
    calling: AtomicBool,
    called: Signal<Value>,
    persist: RwLock<Option<PersistState>>,
}

impl Drop for FgInner {
    fn drop(&mut self) {
        // Deliver a rate-limited dump that never got flushed.
        if let Some(persist) = self.persist.get_mut().as_ref() {
            if persist.throttle.has_pending() {
                let _ = dump_state(&self.container, &persist.path);
            }
        }
    }
}

/// A shared handle to a function gui.
#[derive(Clone)]
pub struct FunctionGui {
    inner: Arc<FgInner>,
}

impl FunctionGui {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    /// Look up a parameter widget by name.
    pub fn widget(&self, name: &str) -> Option<Widget> {
        self.inner.container.widget(name)
    }

    pub fn call_button(&self) -> Option<&Widget> {
        self.inner.call_button.as_ref()
    }

    pub fn result_widget(&self) -> Option<&Widget> {
        self.inner.result_widget.as_ref()
    }

    /// How many times the function has been invoked through this gui.
    pub fn call_count(&self) -> usize {
        self.inner.call_count.load(Ordering::SeqCst)
    }

    /// Emitted with the result after every successful call.
    pub fn called(&self) -> &Signal<Value> {
        &self.inner.called
    }

    /// The signature the gui currently represents.
    pub fn signature(&self) -> MagicSignature {
        self.inner
            .container
            .to_signature()
            .with_return_annotation(self.inner.return_annotation.clone())
    }

    pub fn persist_path(&self) -> Option<PathBuf> {
        self.inner.persist.read().as_ref().map(|p| p.path.clone())
    }

    pub fn show(&self) {
        self.inner.container.show();
    }

    pub fn hide(&self) {
        self.inner.container.hide();
    }

    /// Invoke the function with current widget values.
    ///
    /// `overrides` substitute values for named parameters without touching
    /// their widgets. A parameter whose widget is a placeholder, with no
    /// bound value and no override, is a missing required argument.
    pub fn call(&self, overrides: &[(String, Value)]) -> Result<Value> {
        let args = self.bound_args(overrides)?;

        self.inner.calling.store(true, Ordering::SeqCst);
        let _clear_calling = ClearOnDrop(&self.inner.calling);
        if let Some(button) = &self.inner.call_button {
            button.set_enabled(false);
        }
        // Re-enabled unconditionally, whatever the function does.
        let _re_enable = EnableOnDrop(self.inner.call_button.as_ref());

        tracing::debug!(
            target: targets::FUNCTION_GUI,
            function = %self.inner.name,
            args = args.len(),
            "calling"
        );
        let result = (self.inner.function)(&args);
        self.inner.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(result_widget) = &self.inner.result_widget {
            // Showing the result must not look like user input.
            let _block = result_widget.changed().blocked();
            let display = match (result_widget.kind(), &result) {
                (WidgetKind::Table, Value::Table(_)) => result.clone(),
                _ => Value::Str(result.to_string()),
            };
            if let Err(error) = result_widget.set_value(display) {
                tracing::warn!(
                    target: targets::FUNCTION_GUI,
                    %error,
                    "failed to display result"
                );
            }
        }

        if let Some(return_annotation) = &self.inner.return_annotation {
            for callback in self.inner.registry.get().type2callback(return_annotation) {
                callback(self, &result, return_annotation);
            }
        }

        if let Some(persist) = &*self.inner.persist.read() {
            persist.throttle.call();
        }

        self.inner.called.emit(result.clone());
        Ok(result)
    }

    fn bound_args(&self, overrides: &[(String, Value)]) -> Result<Vec<(String, Value)>> {
        let children = self.inner.container.children();
        for (name, _) in overrides {
            let known = children
                .iter()
                .any(|w| !w.gui_only() && w.name() == *name);
            if !known {
                return Err(Error::UnexpectedArgument {
                    name: name.clone(),
                    function: self.inner.name.clone(),
                });
            }
        }

        let mut args = Vec::with_capacity(children.len());
        for child in children {
            let name = child.name();
            if name.is_empty() || child.gui_only() {
                continue;
            }
            if let Some(value) = arg(overrides, &name) {
                args.push((name, value.clone()));
                continue;
            }
            match child.value() {
                Ok(value) => args.push((name, value)),
                // A placeholder with neither a bound value nor an override.
                Err(_) => {
                    return Err(Error::MissingArgument {
                        name,
                        function: self.inner.name.clone(),
                    })
                }
            }
        }
        Ok(args)
    }
}

impl std::fmt::Debug for FunctionGui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionGui")
            .field("name", &self.inner.name)
            .field("call_count", &self.call_count())
            .finish()
    }
}

struct EnableOnDrop<'a>(Option<&'a Widget>);

impl Drop for EnableOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(widget) = self.0 {
            widget.set_enabled(true);
        }
    }
}

struct ClearOnDrop<'a>(&'a AtomicBool);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// How often rapid changes may write persisted state.
const PERSIST_INTERVAL: Duration = Duration::from_millis(250);

/// Configures and builds a [`FunctionGui`].
pub struct FunctionGuiBuilder {
    name: String,
    signature: MagicSignature,
    function: Arc<dyn Fn(&CallArgs) -> Value + Send + Sync>,
    layout: Orientation,
    labels: bool,
    call_button: Option<String>,
    auto_call: bool,
    result_widget: bool,
    persist: bool,
    gui_options: Vec<(String, UiField)>,
    registry: Option<Arc<TypeRegistry>>,
    factory: Option<Arc<dyn BackendFactory>>,
}

impl FunctionGuiBuilder {
    pub fn new(
        name: impl Into<String>,
        signature: MagicSignature,
        function: impl Fn(&CallArgs) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            function: Arc::new(function),
            layout: Orientation::Vertical,
            labels: true,
            call_button: Some("Run".into()),
            auto_call: false,
            result_widget: false,
            persist: false,
            gui_options: Vec::new(),
            registry: None,
            factory: None,
        }
    }

    pub fn layout(mut self, layout: Orientation) -> Self {
        self.layout = layout;
        self
    }

    pub fn labels(mut self, labels: bool) -> Self {
        self.labels = labels;
        self
    }

    pub fn call_button(mut self, text: impl Into<String>) -> Self {
        self.call_button = Some(text.into());
        self
    }

    pub fn no_call_button(mut self) -> Self {
        self.call_button = None;
        self
    }

    /// Call the function automatically on every value change. Implies no
    /// call button.
    pub fn auto_call(mut self, auto_call: bool) -> Self {
        self.auto_call = auto_call;
        self
    }

    /// Append a gui-only widget displaying the most recent result.
    pub fn result_widget(mut self, result_widget: bool) -> Self {
        self.result_widget = result_widget;
        self
    }

    /// Save values to the per-user cache on change and restore them at
    /// build time.
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Extra options for one parameter's widget.
    pub fn param_options(mut self, name: impl Into<String>, options: UiField) -> Self {
        self.gui_options.push((name.into(), options));
        self
    }

    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn factory(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn build(self) -> Result<FunctionGui> {
        let registry = match self.registry {
            Some(registry) => RegistryHandle::Local(registry),
            None => RegistryHandle::Global,
        };
        let factory = self.factory.unwrap_or_else(default_factory);

        let signature = self.signature.with_gui_options(&self.gui_options)?;
        let return_annotation = signature.return_annotation().cloned();
        let container =
            signature.to_container(registry.get(), factory.as_ref(), self.layout, self.labels)?;

        let result_widget = if self.result_widget {
            let (kind, options) = registry.get().get_widget_class(
                None,
                return_annotation.as_ref(),
                &UiField::default(),
                true,
                false,
            )?;
            let widget = Widget::new(kind, factory.create(kind)?)?;
            widget.set_name("result");
            widget.set_gui_only(true);
            widget.set_enabled(false);
            if let Some(label) = options.label {
                widget.set_label(label);
            }
            container.push(&widget)?;
            Some(widget)
        } else {
            None
        };

        let call_button = match (&self.call_button, self.auto_call) {
            (Some(text), false) => {
                let widget = Widget::new(
                    WidgetKind::PushButton,
                    factory.create(WidgetKind::PushButton)?,
                )?;
                widget.set_name("call_button");
                widget.set_gui_only(true);
                widget.set_text(text)?;
                container.push(&widget)?;
                Some(widget)
            }
            _ => None,
        };

        let inner = Arc::new(FgInner {
            name: self.name,
            function: self.function,
            container,
            call_button,
            result_widget,
            return_annotation,
            registry,
            call_count: AtomicUsize::new(0),
            calling: AtomicBool::new(false),
            called: Signal::new(),
            persist: RwLock::new(None),
        });

        if let Some(button) = &inner.call_button {
            let weak = Arc::downgrade(&inner);
            button.changed().connect(move |_| {
                call_from_signal(&weak);
            });
        }

        if self.auto_call {
            let weak = Arc::downgrade(&inner);
            inner.container.changed().connect(move |_| {
                call_from_signal(&weak);
            });
        }

        if self.persist {
            let path = state_path(&inner.name)?;
            load_state_quiet(&inner.container, &path);

            let weak: Weak<FgInner> = Arc::downgrade(&inner);
            let dump_path = path.clone();
            let throttle = Throttle::new(PERSIST_INTERVAL, move || {
                if let Some(inner) = weak.upgrade() {
                    if let Err(error) = dump_state(&inner.container, &dump_path) {
                        tracing::warn!(
                            target: targets::PERSIST,
                            %error,
                            "failed to persist state"
                        );
                    }
                }
            });
            *inner.persist.write() = Some(PersistState { path, throttle });

            let weak = Arc::downgrade(&inner);
            inner.container.changed().connect(move |_| {
                if let Some(inner) = weak.upgrade() {
                    if let Some(persist) = &*inner.persist.read() {
                        persist.throttle.call();
                    }
                }
            });
        }

        Ok(FunctionGui { inner })
    }
}

fn call_from_signal(weak: &Weak<FgInner>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    if inner.calling.load(Ordering::SeqCst) {
        return;
    }
    let gui = FunctionGui { inner };
    if let Err(error) = gui.call(&[]) {
        tracing::warn!(
            target: targets::FUNCTION_GUI,
            function = %gui.inner.name,
            %error,
            "gui-triggered call failed"
        );
    }
}
