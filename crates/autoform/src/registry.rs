//! The type-to-widget resolution engine.
//!
//! [`TypeRegistry::get_widget_class`] turns a `(value, annotation, options)`
//! triple into a concrete [`WidgetKind`] plus the options to apply. The
//! resolution strategies run in a fixed order, and the first one that
//! produces a widget wins:
//!
//! 1. inline `Annotated` metadata is folded into the options (explicit
//!    options win over the metadata)
//! 2. completely empty input resolves to a hidden placeholder
//! 3. `Optional` is unwrapped, marking the field nullable
//! 4. an explicit `widget_type` option short-circuits everything
//! 5. user registrations, exact type first, then base types
//! 6. result slots use a restricted set (text display or table)
//! 7. a choice source (or enum type) selects a categorical widget
//! 8. the ordered matcher list handles the built-in types
//! 9. otherwise: an error, or a hidden placeholder when errors are off
//!
//! A process-wide registry is available through [`global_registry`];
//! constructing isolated [`TypeRegistry`] instances is equally supported
//! and is what tests should do.

use std::sync::{Arc, OnceLock};

use autoform_core::logging::targets;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::field::{ChoicesSource, UiField};
use crate::function_gui::FunctionGui;
use crate::types::{TypeHint, Value};
use crate::widget::{WidgetKind, WidgetRef};

/// A resolved widget request: which widget, with which options.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSpec {
    pub widget: WidgetRef,
    pub options: UiField,
}

impl WidgetSpec {
    pub fn of(widget: impl Into<WidgetRef>) -> Self {
        Self {
            widget: widget.into(),
            options: UiField::default(),
        }
    }

    pub fn with_options(mut self, options: UiField) -> Self {
        self.options = options;
        self
    }
}

/// Invoked after a gui call, with the gui, the returned value and the
/// declared return annotation.
pub type ReturnCallback = Arc<dyn Fn(&FunctionGui, &Value, &TypeHint) + Send + Sync>;

/// A pluggable resolution strategy. Matchers run in order after every other
/// strategy has passed; the first `Some` wins.
pub type Matcher = fn(Option<&Value>, Option<&TypeHint>) -> Option<WidgetSpec>;

/// The lookup key a [`TypeHint`] reduces to for registration purposes.
///
/// Structural detail (element types, variant lists) is deliberately erased:
/// a registration for lists applies to every list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Any,
    Bool,
    Int,
    Float,
    Str,
    Path,
    Date,
    Time,
    DateTime,
    Range,
    Slice,
    Table,
    List,
    Tuple,
    Sequence,
    Enum(String),
    Custom(String),
}

impl TypeKey {
    pub fn of(hint: &TypeHint) -> Self {
        match hint {
            TypeHint::Any => TypeKey::Any,
            TypeHint::Bool => TypeKey::Bool,
            TypeHint::Int => TypeKey::Int,
            TypeHint::Float => TypeKey::Float,
            TypeHint::Str => TypeKey::Str,
            TypeHint::Path => TypeKey::Path,
            TypeHint::Date => TypeKey::Date,
            TypeHint::Time => TypeKey::Time,
            TypeHint::DateTime => TypeKey::DateTime,
            TypeHint::Range => TypeKey::Range,
            TypeHint::Slice => TypeKey::Slice,
            TypeHint::Table => TypeKey::Table,
            TypeHint::List(_) => TypeKey::List,
            TypeHint::Tuple(_) => TypeKey::Tuple,
            TypeHint::Sequence(_) => TypeKey::Sequence,
            TypeHint::Enum(e) => TypeKey::Enum(e.name.clone()),
            TypeHint::Custom(c) => TypeKey::Custom(c.name.clone()),
            TypeHint::Optional(inner) => TypeKey::of(inner),
            TypeHint::Annotated(inner, _) => TypeKey::of(inner),
        }
    }
}

/// What to associate with a type in [`TypeRegistry::register`].
///
/// At least one of the widget, a choice source (in `options`), a bound
/// value (in `options`) or a return callback must be present.
#[derive(Clone, Default)]
pub struct Registration {
    pub widget_type: Option<WidgetRef>,
    pub options: UiField,
    pub return_callback: Option<ReturnCallback>,
}

impl Registration {
    pub fn widget(widget: impl Into<WidgetRef>) -> Self {
        Self {
            widget_type: Some(widget.into()),
            ..Self::default()
        }
    }

    pub fn options(options: UiField) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: UiField) -> Self {
        self.options = options;
        self
    }

    pub fn return_callback(
        callback: impl Fn(&FunctionGui, &Value, &TypeHint) + Send + Sync + 'static,
    ) -> Self {
        Self {
            return_callback: Some(Arc::new(callback)),
            ..Self::default()
        }
    }

    pub fn with_return_callback(
        mut self,
        callback: impl Fn(&FunctionGui, &Value, &TypeHint) + Send + Sync + 'static,
    ) -> Self {
        self.return_callback = Some(Arc::new(callback));
        self
    }
}

struct RegistryState {
    /// Registration-ordered; order is the tiebreak for base-type lookups.
    type_defs: Vec<(TypeKey, WidgetSpec)>,
    return_callbacks: Vec<(TypeKey, ReturnCallback)>,
    matchers: Vec<Matcher>,
}

/// Maps types to widgets. See the module docs for the resolution order.
pub struct TypeRegistry {
    state: RwLock<RegistryState>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry with the built-in matchers and no user registrations.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                type_defs: Vec::new(),
                return_callbacks: Vec::new(),
                matchers: vec![match_scalars, match_path_sequences, match_tables, match_sequences],
            }),
        }
    }

    /// Append a custom matcher. It runs after the built-ins.
    pub fn add_matcher(&self, matcher: Matcher) {
        self.state.write().matchers.push(matcher);
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Associate a widget (and/or a return callback) with a type.
    ///
    /// A registration for the same key replaces the previous one in place,
    /// keeping its position in the lookup order.
    pub fn register(&self, type_: &TypeHint, registration: Registration) -> Result<()> {
        let Registration {
            mut widget_type,
            options,
            return_callback,
        } = registration;

        if widget_type.is_none()
            && options.choices.is_none()
            && options.bind.is_none()
            && return_callback.is_none()
        {
            return Err(Error::EmptyRegistration);
        }

        if options.choices.is_some() {
            if let Some(requested) = &widget_type {
                tracing::warn!(
                    target: targets::REGISTRY,
                    requested = ?requested,
                    "choices take precedence over widget_type; using ComboBox"
                );
            }
            widget_type = Some(WidgetRef::Kind(WidgetKind::ComboBox));
        } else if widget_type.is_none() && options.bind.is_some() {
            // A bind-only registration contributes a value without gui.
            widget_type = Some(WidgetRef::Kind(WidgetKind::Empty));
        }

        let key = TypeKey::of(type_);
        let mut state = self.state.write();

        if let Some(callback) = return_callback {
            state.return_callbacks.push((key.clone(), callback));
        }

        if let Some(widget) = widget_type {
            let spec = WidgetSpec { widget, options };
            match state.type_defs.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = spec,
                None => state.type_defs.push((key, spec)),
            }
        }
        Ok(())
    }

    /// Register a type for the lifetime of the returned guard, restoring
    /// whatever was registered before when the guard drops.
    pub fn register_scoped(
        &self,
        type_: &TypeHint,
        registration: Registration,
    ) -> Result<ScopedRegistration<'_>> {
        let key = TypeKey::of(type_);
        let (prior_def, prior_callbacks) = {
            let state = self.state.read();
            (
                state
                    .type_defs
                    .iter()
                    .position(|(k, _)| *k == key)
                    .map(|i| (i, state.type_defs[i].1.clone())),
                state
                    .return_callbacks
                    .iter()
                    .enumerate()
                    .filter(|(_, (k, _))| *k == key)
                    .map(|(i, (_, c))| (i, c.clone()))
                    .collect(),
            )
        };
        self.register(type_, registration)?;
        Ok(ScopedRegistration {
            registry: self,
            key,
            prior_def,
            prior_callbacks,
        })
    }

    /// Return callbacks registered for a type, exact key first, then base
    /// types, in registration order.
    pub fn type2callback(&self, type_: &TypeHint) -> Vec<ReturnCallback> {
        let key = TypeKey::of(type_);
        let state = self.state.read();
        let mut callbacks: Vec<ReturnCallback> = state
            .return_callbacks
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, c)| c.clone())
            .collect();
        if let TypeHint::Custom(custom) = type_ {
            for (k, callback) in &state.return_callbacks {
                if let TypeKey::Custom(name) = k {
                    if name != &custom.name && custom.bases.iter().any(|b| b == name) {
                        callbacks.push(callback.clone());
                    }
                }
            }
        }
        callbacks
    }

    fn lookup(&self, dtype: &TypeHint) -> Option<WidgetSpec> {
        let key = TypeKey::of(dtype);
        let state = self.state.read();
        if let Some((_, spec)) = state.type_defs.iter().find(|(k, _)| *k == key) {
            return Some(spec.clone());
        }
        // Base-type fallback for nominal types, in registration order.
        if let TypeHint::Custom(custom) = dtype {
            for (k, spec) in &state.type_defs {
                if let TypeKey::Custom(name) = k {
                    if custom.bases.iter().any(|b| b == name) {
                        return Some(spec.clone());
                    }
                }
            }
        }
        None
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve a widget kind and its options for one field.
    ///
    /// `is_result` restricts resolution to widgets that can display a
    /// value; `raise_on_unknown` chooses between an error and a hidden
    /// placeholder when every strategy passes.
    pub fn get_widget_class(
        &self,
        value: Option<&Value>,
        annotation: Option<&TypeHint>,
        options: &UiField,
        is_result: bool,
        raise_on_unknown: bool,
    ) -> Result<(WidgetKind, UiField)> {
        let mut options = options.clone();
        let mut annotation = annotation.cloned();

        // An unannotated result slot displays as text.
        if is_result && annotation.is_none() {
            annotation = Some(TypeHint::Str);
        }

        // Fold inline metadata under the explicit options.
        if let Some(TypeHint::Annotated(base, meta)) = annotation {
            options = meta.merged_with(&options);
            annotation = Some(*base);
        }

        // Nothing to go on at all: a hidden placeholder. A bound value may
        // still ride along in the options.
        if value.is_none()
            && annotation.is_none()
            && options.widget_type.is_none()
            && options.choices.is_none()
        {
            options.visible = Some(false);
            return Ok((WidgetKind::Empty, options));
        }

        // Unwrap optionality into the nullable flag.
        if let Some(TypeHint::Optional(inner)) = annotation {
            annotation = Some(*inner);
            options.nullable.get_or_insert(true);
        }
        // A null default marks the field nullable even when annotated:
        // the caller chose null as the starting state.
        if matches!(value, Some(Value::Null)) {
            options.nullable.get_or_insert(true);
        }

        let dtype = annotation.or_else(|| value.and_then(Value::hint));

        let enum_choices = match &dtype {
            Some(TypeHint::Enum(e)) => Some(ChoicesSource::Enum(e.clone())),
            _ => None,
        };

        // An explicit widget_type short-circuits resolution.
        if let Some(widget_ref) = options.widget_type.clone() {
            let mut kind = widget_ref.resolve()?;
            if options.choices.is_some() || enum_choices.is_some() {
                if options.choices.is_none() {
                    options.choices = enum_choices;
                }
                if kind == WidgetKind::RadioButton {
                    tracing::warn!(
                        target: targets::REGISTRY,
                        "RadioButton is a single button; using RadioButtons for a choice set"
                    );
                    kind = WidgetKind::RadioButtons;
                }
            }
            tracing::trace!(target: targets::REGISTRY, widget = %kind, "resolved via widget_type");
            return Ok((kind, options));
        }

        // User registrations beat the built-in strategies. The registered
        // options win over caller options, matching registration intent.
        if let Some(dtype) = &dtype {
            if let Some(spec) = self.lookup(dtype) {
                let kind = spec.widget.resolve()?;
                let merged = options.merged_with(&spec.options);
                tracing::trace!(target: targets::REGISTRY, widget = %kind, "resolved via registration");
                return Ok((kind, merged));
            }
        }

        if is_result {
            let kind = match dtype {
                Some(TypeHint::Table) => WidgetKind::Table,
                _ => WidgetKind::LineEdit,
            };
            options.gui_only = Some(true);
            return Ok((kind, options));
        }

        // A choice source selects a categorical widget.
        if options.choices.is_some() || enum_choices.is_some() {
            if options.choices.is_none() {
                options.choices = enum_choices;
            }
            let kind = if options.allow_multiple.unwrap_or(false) {
                WidgetKind::Select
            } else {
                WidgetKind::ComboBox
            };
            return Ok((kind, options));
        }

        let matchers = self.state.read().matchers.clone();
        for matcher in matchers {
            if let Some(spec) = matcher(value, dtype.as_ref()) {
                let kind = spec.widget.resolve()?;
                // Unlike registrations, matcher options are defaults only:
                // caller options win.
                let merged = spec.options.merged_with(&options);
                tracing::trace!(target: targets::REGISTRY, widget = %kind, "resolved via matcher");
                return Ok((kind, merged));
            }
        }

        if raise_on_unknown {
            Err(Error::NoWidgetFound {
                value_type: value.map(Value::type_name),
                annotation: dtype.map(|t| t.display_name()),
            })
        } else {
            options.visible = Some(false);
            Ok((WidgetKind::Empty, options))
        }
    }
}

/// Restores the prior registration state for one type key on drop.
#[must_use = "dropping the guard immediately undoes the registration"]
pub struct ScopedRegistration<'a> {
    registry: &'a TypeRegistry,
    key: TypeKey,
    prior_def: Option<(usize, WidgetSpec)>,
    /// This key's return callbacks at scope entry, with their positions.
    prior_callbacks: Vec<(usize, ReturnCallback)>,
}

impl Drop for ScopedRegistration<'_> {
    fn drop(&mut self) {
        let mut state = self.registry.state.write();
        match self.prior_def.take() {
            Some((index, spec)) => {
                if let Some(entry) = state.type_defs.iter_mut().find(|(k, _)| *k == self.key) {
                    entry.1 = spec;
                } else {
                    let index = index.min(state.type_defs.len());
                    state.type_defs.insert(index, (self.key.clone(), spec));
                }
            }
            None => state.type_defs.retain(|(k, _)| *k != self.key),
        }
        // Only this key's callbacks are undone; callbacks registered for
        // other types during the scope stay.
        state.return_callbacks.retain(|(k, _)| *k != self.key);
        for (index, callback) in self.prior_callbacks.drain(..) {
            let index = index.min(state.return_callbacks.len());
            state
                .return_callbacks
                .insert(index, (self.key.clone(), callback));
        }
    }
}

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// The process-wide registry used when no explicit registry is passed.
pub fn global_registry() -> &'static TypeRegistry {
    GLOBAL.get_or_init(TypeRegistry::new)
}

// ============================================================================
// Built-in matchers
// ============================================================================

fn match_scalars(_value: Option<&Value>, hint: Option<&TypeHint>) -> Option<WidgetSpec> {
    let kind = match hint? {
        TypeHint::Bool => WidgetKind::CheckBox,
        TypeHint::Int => WidgetKind::SpinBox,
        TypeHint::Float => WidgetKind::FloatSpinBox,
        TypeHint::Str => WidgetKind::LineEdit,
        TypeHint::Path => WidgetKind::FileEdit,
        TypeHint::Date => WidgetKind::DateEdit,
        TypeHint::Time => WidgetKind::TimeEdit,
        TypeHint::DateTime => WidgetKind::DateTimeEdit,
        TypeHint::Range => WidgetKind::RangeEdit,
        TypeHint::Slice => WidgetKind::SliceEdit,
        _ => return None,
    };
    Some(WidgetSpec::of(kind))
}

/// Lists of paths get a multi-file picker rather than a generic list edit.
fn match_path_sequences(_value: Option<&Value>, hint: Option<&TypeHint>) -> Option<WidgetSpec> {
    match hint? {
        TypeHint::List(elem) | TypeHint::Sequence(elem) if **elem == TypeHint::Path => {
            let mut options = UiField::default();
            options.mode = Some("rm".into());
            Some(WidgetSpec::of(WidgetKind::FileEdit).with_options(options))
        }
        _ => None,
    }
}

fn match_tables(_value: Option<&Value>, hint: Option<&TypeHint>) -> Option<WidgetSpec> {
    match hint? {
        TypeHint::Table => Some(WidgetSpec::of(WidgetKind::Table)),
        _ => None,
    }
}

fn match_sequences(_value: Option<&Value>, hint: Option<&TypeHint>) -> Option<WidgetSpec> {
    let kind = match hint? {
        TypeHint::List(_) | TypeHint::Sequence(_) => WidgetKind::ListEdit,
        TypeHint::Tuple(_) => WidgetKind::TupleEdit,
        _ => return None,
    };
    Some(WidgetSpec::of(kind))
}
