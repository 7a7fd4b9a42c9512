//! Widget option records.
//!
//! [`UiField`] is the normalized bag of per-widget options. Every entry
//! point that accepts options (inline [`TypeHint::Annotated`] metadata,
//! per-parameter gui options, registry registrations) funnels into this one
//! record, so precedence between sources is a single field-wise merge.
//!
//! String-keyed option input goes through an alias table
//! (`min`/`ge` -> `minimum`, `text` -> `label`, and so on), and unknown keys
//! are rejected rather than ignored.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{EnumType, TypeHint, Value};
use crate::widget::{Orientation, Widget, WidgetRef};

// ============================================================================
// Bound values and choice sources
// ============================================================================

/// A value substituted for a widget's gui state at call time.
#[derive(Clone)]
pub enum Bind {
    /// A constant.
    Value(Value),
    /// Computed from the widget each time the value is read.
    Func(Arc<dyn Fn(&Widget) -> Value + Send + Sync>),
}

impl Bind {
    pub fn func(f: impl Fn(&Widget) -> Value + Send + Sync + 'static) -> Self {
        Bind::Func(Arc::new(f))
    }

    pub fn resolve(&self, widget: &Widget) -> Value {
        match self {
            Bind::Value(v) => v.clone(),
            Bind::Func(f) => f(widget),
        }
    }
}

impl fmt::Debug for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bind::Value(v) => f.debug_tuple("Bind::Value").field(v).finish(),
            Bind::Func(_) => f.write_str("Bind::Func(..)"),
        }
    }
}

impl PartialEq for Bind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Bind::Value(a), Bind::Value(b)) => a == b,
            (Bind::Func(a), Bind::Func(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Where a categorical widget's choices come from.
///
/// Sources other than `Pairs` are kept unevaluated on the widget so that
/// `reset_choices` can re-derive the current choice list, which matters for
/// [`ChoicesSource::Func`] callables whose output depends on gui state.
#[derive(Clone)]
pub enum ChoicesSource {
    /// Every member of a nominal enumeration.
    Enum(EnumType),
    /// Explicit values; labels are derived from the values.
    Values(Vec<Value>),
    /// Explicit `(label, value)` pairs.
    Pairs(Vec<(String, Value)>),
    /// Recomputed from the widget on every reset.
    Func(Arc<dyn Fn(&Widget) -> Vec<(String, Value)> + Send + Sync>),
    /// Explicit values labeled through a key function.
    Keyed {
        choices: Vec<Value>,
        key: Arc<dyn Fn(&Value) -> String + Send + Sync>,
    },
}

impl ChoicesSource {
    pub fn func(f: impl Fn(&Widget) -> Vec<(String, Value)> + Send + Sync + 'static) -> Self {
        ChoicesSource::Func(Arc::new(f))
    }

    /// Evaluate the source into concrete `(label, value)` pairs.
    pub fn resolve(&self, widget: &Widget) -> Vec<(String, Value)> {
        match self {
            ChoicesSource::Enum(e) => e.choices(),
            ChoicesSource::Values(vs) => vs.iter().map(|v| (v.to_string(), v.clone())).collect(),
            ChoicesSource::Pairs(ps) => ps.clone(),
            ChoicesSource::Func(f) => f(widget),
            ChoicesSource::Keyed { choices, key } => {
                choices.iter().map(|v| (key(v), v.clone())).collect()
            }
        }
    }
}

impl fmt::Debug for ChoicesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoicesSource::Enum(e) => f.debug_tuple("ChoicesSource::Enum").field(e).finish(),
            ChoicesSource::Values(vs) => f.debug_tuple("ChoicesSource::Values").field(vs).finish(),
            ChoicesSource::Pairs(ps) => f.debug_tuple("ChoicesSource::Pairs").field(ps).finish(),
            ChoicesSource::Func(_) => f.write_str("ChoicesSource::Func(..)"),
            ChoicesSource::Keyed { choices, .. } => f
                .debug_struct("ChoicesSource::Keyed")
                .field("choices", choices)
                .finish_non_exhaustive(),
        }
    }
}

impl PartialEq for ChoicesSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ChoicesSource::Enum(a), ChoicesSource::Enum(b)) => a == b,
            (ChoicesSource::Values(a), ChoicesSource::Values(b)) => a == b,
            (ChoicesSource::Pairs(a), ChoicesSource::Pairs(b)) => a == b,
            (ChoicesSource::Func(a), ChoicesSource::Func(b)) => Arc::ptr_eq(a, b),
            (
                ChoicesSource::Keyed { choices: a, key: ka },
                ChoicesSource::Keyed { choices: b, key: kb },
            ) => a == b && Arc::ptr_eq(ka, kb),
            _ => false,
        }
    }
}

impl From<EnumType> for ChoicesSource {
    fn from(e: EnumType) -> Self {
        ChoicesSource::Enum(e)
    }
}

// ============================================================================
// UiField
// ============================================================================

/// A normalized record of widget options. Every field is optional; `None`
/// means "unspecified", and merging is field-wise with the overlay winning.
#[derive(Clone, Default)]
pub struct UiField {
    pub name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    /// The initial value. At most one of `default` and `default_factory` is
    /// meaningful; `default` wins if both are present.
    pub default: Option<Value>,
    pub default_factory: Option<Arc<dyn Fn() -> Value + Send + Sync>>,
    pub type_hint: Option<TypeHint>,
    pub nullable: Option<bool>,
    pub widget_type: Option<WidgetRef>,
    pub choices: Option<ChoicesSource>,
    pub allow_multiple: Option<bool>,
    pub bind: Option<Bind>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: Option<bool>,
    pub orientation: Option<Orientation>,
    /// File dialog mode (`"r"`, `"rm"`, `"w"`, `"d"`).
    pub mode: Option<String>,
    pub visible: Option<bool>,
    pub enabled: Option<bool>,
    /// Excluded from signatures and call arguments (call buttons, result
    /// displays).
    pub gui_only: Option<bool>,
    pub const_value: Option<Value>,
}

/// Canonical option keys and the aliases that fold into them.
const ALIASES: &[(&str, &[&str])] = &[
    ("name", &[]),
    ("label", &["title", "text", "button_text"]),
    ("description", &["tooltip"]),
    ("default", &["value"]),
    ("nullable", &[]),
    ("widget_type", &["widget"]),
    ("choices", &["enum"]),
    ("allow_multiple", &[]),
    ("bind", &[]),
    ("minimum", &["min", "ge"]),
    ("maximum", &["max", "le"]),
    ("exclusive_minimum", &["exclusiveMinimum", "gt"]),
    ("exclusive_maximum", &["exclusiveMaximum", "lt"]),
    ("multiple_of", &["multipleOf", "step"]),
    ("min_length", &["minLength"]),
    ("max_length", &["maxLength"]),
    ("pattern", &["regex", "filter"]),
    ("min_items", &["minItems"]),
    ("max_items", &["maxItems"]),
    ("unique_items", &["uniqueItems"]),
    ("orientation", &[]),
    ("mode", &[]),
    ("visible", &[]),
    ("enabled", &[]),
    ("gui_only", &[]),
    ("const", &[]),
];

fn canonical_key(key: &str) -> Option<&'static str> {
    for (canonical, aliases) in ALIASES {
        if *canonical == key || aliases.contains(&key) {
            return Some(canonical);
        }
    }
    None
}

impl UiField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Build a field from string-keyed options, resolving aliases and
    /// rejecting unknown keys.
    pub fn from_pairs<K, I>(pairs: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, OptionValue)>,
    {
        let mut field = Self::default();
        for (key, value) in pairs {
            field.set(&key.into(), value)?;
        }
        Ok(field)
    }

    /// Set one option by (possibly aliased) key.
    pub fn set(&mut self, key: &str, value: OptionValue) -> Result<()> {
        // "disabled" is the one alias that inverts its target.
        if key == "disabled" {
            self.enabled = Some(!expect_bool(key, value)?);
            return Ok(());
        }
        let canonical = canonical_key(key).ok_or_else(|| Error::UnknownOption(key.to_owned()))?;
        match canonical {
            "name" => self.name = Some(expect_str(key, value)?),
            "label" => self.label = Some(expect_str(key, value)?),
            "description" => self.description = Some(expect_str(key, value)?),
            "default" => {
                if self.default_factory.is_some() {
                    return Err(Error::InvalidOption {
                        key: key.to_owned(),
                        message: "a default_factory is already set".into(),
                    });
                }
                self.default = Some(expect_value(key, value)?);
            }
            "nullable" => self.nullable = Some(expect_bool(key, value)?),
            "widget_type" => self.widget_type = Some(expect_widget(key, value)?),
            "choices" => self.choices = Some(expect_choices(key, value)?),
            "allow_multiple" => self.allow_multiple = Some(expect_bool(key, value)?),
            "bind" => self.bind = Some(expect_bind(value)),
            "minimum" => self.minimum = Some(expect_f64(key, value)?),
            "maximum" => self.maximum = Some(expect_f64(key, value)?),
            "exclusive_minimum" => self.exclusive_minimum = Some(expect_f64(key, value)?),
            "exclusive_maximum" => self.exclusive_maximum = Some(expect_f64(key, value)?),
            "multiple_of" => self.multiple_of = Some(expect_f64(key, value)?),
            "min_length" => self.min_length = Some(expect_usize(key, value)?),
            "max_length" => self.max_length = Some(expect_usize(key, value)?),
            "pattern" => self.pattern = Some(expect_str(key, value)?),
            "min_items" => self.min_items = Some(expect_usize(key, value)?),
            "max_items" => self.max_items = Some(expect_usize(key, value)?),
            "unique_items" => self.unique_items = Some(expect_bool(key, value)?),
            "orientation" => self.orientation = Some(expect_orientation(key, value)?),
            "mode" => self.mode = Some(expect_str(key, value)?),
            "visible" => self.visible = Some(expect_bool(key, value)?),
            "enabled" => self.enabled = Some(expect_bool(key, value)?),
            "gui_only" => self.gui_only = Some(expect_bool(key, value)?),
            "const" => self.const_value = Some(expect_value(key, value)?),
            _ => unreachable!("canonical key {canonical:?} not handled"),
        }
        Ok(())
    }

    /// Field-wise merge; `overlay`'s present fields win over `self`'s.
    pub fn merged_with(&self, overlay: &UiField) -> UiField {
        macro_rules! pick {
            ($($f:ident),+ $(,)?) => {
                UiField {
                    $($f: overlay.$f.clone().or_else(|| self.$f.clone())),+
                }
            };
        }
        pick!(
            name,
            label,
            description,
            default,
            default_factory,
            type_hint,
            nullable,
            widget_type,
            choices,
            allow_multiple,
            bind,
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
            multiple_of,
            min_length,
            max_length,
            pattern,
            min_items,
            max_items,
            unique_items,
            orientation,
            mode,
            visible,
            enabled,
            gui_only,
            const_value,
        )
    }

    /// The initial value, evaluating `default_factory` if no constant
    /// default is present.
    pub fn effective_default(&self) -> Option<Value> {
        self.default
            .clone()
            .or_else(|| self.default_factory.as_ref().map(|f| f()))
    }

    pub fn is_gui_only(&self) -> bool {
        self.gui_only.unwrap_or(false)
    }

    // Builder-style setters for the fields used programmatically.

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_default_factory(
        mut self,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    pub fn with_type(mut self, hint: TypeHint) -> Self {
        self.type_hint = Some(hint);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_widget(mut self, widget: impl Into<WidgetRef>) -> Self {
        self.widget_type = Some(widget.into());
        self
    }

    pub fn with_choices(mut self, choices: impl Into<ChoicesSource>) -> Self {
        self.choices = Some(choices.into());
        self
    }

    pub fn with_bind(mut self, bind: Bind) -> Self {
        self.bind = Some(bind);
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.multiple_of = Some(step);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_gui_only(mut self, gui_only: bool) -> Self {
        self.gui_only = Some(gui_only);
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }
}

impl PartialEq for UiField {
    fn eq(&self, other: &Self) -> bool {
        // Callables compare by identity, everything else by value.
        let factories_eq = match (&self.default_factory, &other.default_factory) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        factories_eq
            && self.name == other.name
            && self.label == other.label
            && self.description == other.description
            && self.default == other.default
            && self.type_hint == other.type_hint
            && self.nullable == other.nullable
            && self.widget_type == other.widget_type
            && self.choices == other.choices
            && self.allow_multiple == other.allow_multiple
            && self.bind == other.bind
            && self.minimum == other.minimum
            && self.maximum == other.maximum
            && self.exclusive_minimum == other.exclusive_minimum
            && self.exclusive_maximum == other.exclusive_maximum
            && self.multiple_of == other.multiple_of
            && self.min_length == other.min_length
            && self.max_length == other.max_length
            && self.pattern == other.pattern
            && self.min_items == other.min_items
            && self.max_items == other.max_items
            && self.unique_items == other.unique_items
            && self.orientation == other.orientation
            && self.mode == other.mode
            && self.visible == other.visible
            && self.enabled == other.enabled
            && self.gui_only == other.gui_only
            && self.const_value == other.const_value
    }
}

impl fmt::Debug for UiField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("UiField");
        macro_rules! field {
            ($($f:ident),+ $(,)?) => {
                $(if self.$f.is_some() {
                    s.field(stringify!($f), &self.$f);
                })+
            };
        }
        field!(
            name, label, description, default, type_hint, nullable, widget_type, choices,
            allow_multiple, bind, minimum, maximum, exclusive_minimum, exclusive_maximum,
            multiple_of, min_length, max_length, pattern, min_items, max_items, unique_items,
            orientation, mode, visible, enabled, gui_only, const_value,
        );
        if self.default_factory.is_some() {
            s.field("default_factory", &"..");
        }
        s.finish()
    }
}

// ============================================================================
// Option input values
// ============================================================================

/// The value side of a string-keyed option pair.
#[derive(Debug, Clone)]
pub enum OptionValue {
    Value(Value),
    Widget(WidgetRef),
    Choices(ChoicesSource),
    Bind(Bind),
    Orientation(Orientation),
}

impl From<Value> for OptionValue {
    fn from(v: Value) -> Self {
        OptionValue::Value(v)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Value(Value::Bool(v))
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Value(Value::Int(v))
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Value(Value::Int(v as i64))
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Value(Value::Float(v))
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Value(Value::Str(v.to_owned()))
    }
}

impl From<WidgetRef> for OptionValue {
    fn from(v: WidgetRef) -> Self {
        OptionValue::Widget(v)
    }
}

impl From<crate::widget::WidgetKind> for OptionValue {
    fn from(v: crate::widget::WidgetKind) -> Self {
        OptionValue::Widget(WidgetRef::Kind(v))
    }
}

impl From<ChoicesSource> for OptionValue {
    fn from(v: ChoicesSource) -> Self {
        OptionValue::Choices(v)
    }
}

impl From<EnumType> for OptionValue {
    fn from(v: EnumType) -> Self {
        OptionValue::Choices(ChoicesSource::Enum(v))
    }
}

impl From<Bind> for OptionValue {
    fn from(v: Bind) -> Self {
        OptionValue::Bind(v)
    }
}

impl From<Orientation> for OptionValue {
    fn from(v: Orientation) -> Self {
        OptionValue::Orientation(v)
    }
}

fn invalid(key: &str, message: &str) -> Error {
    Error::InvalidOption {
        key: key.to_owned(),
        message: message.to_owned(),
    }
}

fn expect_value(key: &str, value: OptionValue) -> Result<Value> {
    match value {
        OptionValue::Value(v) => Ok(v),
        _ => Err(invalid(key, "expected a value")),
    }
}

fn expect_bool(key: &str, value: OptionValue) -> Result<bool> {
    match value {
        OptionValue::Value(Value::Bool(b)) => Ok(b),
        _ => Err(invalid(key, "expected a boolean")),
    }
}

fn expect_f64(key: &str, value: OptionValue) -> Result<f64> {
    match value {
        OptionValue::Value(v) => v.as_f64().ok_or_else(|| invalid(key, "expected a number")),
        _ => Err(invalid(key, "expected a number")),
    }
}

fn expect_usize(key: &str, value: OptionValue) -> Result<usize> {
    match value {
        OptionValue::Value(Value::Int(i)) if i >= 0 => Ok(i as usize),
        _ => Err(invalid(key, "expected a non-negative integer")),
    }
}

fn expect_str(key: &str, value: OptionValue) -> Result<String> {
    match value {
        OptionValue::Value(Value::Str(s)) => Ok(s),
        _ => Err(invalid(key, "expected a string")),
    }
}

fn expect_widget(key: &str, value: OptionValue) -> Result<WidgetRef> {
    match value {
        OptionValue::Widget(w) => Ok(w),
        OptionValue::Value(Value::Str(s)) => Ok(WidgetRef::Name(s)),
        _ => Err(invalid(key, "expected a widget kind or widget name")),
    }
}

fn expect_choices(key: &str, value: OptionValue) -> Result<ChoicesSource> {
    match value {
        OptionValue::Choices(c) => Ok(c),
        OptionValue::Value(Value::List(vs)) => Ok(ChoicesSource::Values(vs)),
        _ => Err(invalid(key, "expected a choice source or a list of values")),
    }
}

fn expect_bind(value: OptionValue) -> Bind {
    match value {
        OptionValue::Bind(b) => b,
        OptionValue::Value(v) => Bind::Value(v),
        // Any other option shape is still a constant from the caller's view.
        OptionValue::Widget(w) => Bind::Value(Value::Str(format!("{w:?}"))),
        OptionValue::Choices(_) => Bind::Value(Value::Null),
        OptionValue::Orientation(_) => Bind::Value(Value::Null),
    }
}

fn expect_orientation(key: &str, value: OptionValue) -> Result<Orientation> {
    match value {
        OptionValue::Orientation(o) => Ok(o),
        OptionValue::Value(Value::Str(s)) => s
            .parse()
            .map_err(|message: String| Error::InvalidOption {
                key: key.to_owned(),
                message,
            }),
        _ => Err(invalid(key, "expected an orientation")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetKind;

    #[test]
    fn aliases_fold_into_canonical_fields() {
        let field = UiField::from_pairs([
            ("min", OptionValue::from(1)),
            ("max", OptionValue::from(10)),
            ("step", OptionValue::from(2)),
            ("text", OptionValue::from("Go")),
            ("tooltip", OptionValue::from("runs the thing")),
        ])
        .unwrap();
        assert_eq!(field.minimum, Some(1.0));
        assert_eq!(field.maximum, Some(10.0));
        assert_eq!(field.multiple_of, Some(2.0));
        assert_eq!(field.label.as_deref(), Some("Go"));
        assert_eq!(field.description.as_deref(), Some("runs the thing"));
    }

    #[test]
    fn schema_style_aliases() {
        let field = UiField::from_pairs([
            ("ge", OptionValue::from(0.0)),
            ("le", OptionValue::from(1.0)),
            ("multipleOf", OptionValue::from(0.25)),
            ("minLength", OptionValue::from(2)),
        ])
        .unwrap();
        assert_eq!(field.minimum, Some(0.0));
        assert_eq!(field.maximum, Some(1.0));
        assert_eq!(field.multiple_of, Some(0.25));
        assert_eq!(field.min_length, Some(2));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = UiField::from_pairs([("mimimum", OptionValue::from(1))]).unwrap_err();
        assert!(matches!(err, Error::UnknownOption(k) if k == "mimimum"));
    }

    #[test]
    fn disabled_inverts_enabled() {
        let field = UiField::from_pairs([("disabled", OptionValue::from(true))]).unwrap();
        assert_eq!(field.enabled, Some(false));
    }

    #[test]
    fn default_conflicts_with_default_factory() {
        let mut field = UiField::new().with_default_factory(|| Value::Int(0));
        let err = field.set("value", OptionValue::from(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));
    }

    #[test]
    fn merge_overlay_wins_per_field() {
        let base = UiField::new()
            .with_minimum(0.0)
            .with_maximum(10.0)
            .with_label("base");
        let overlay = UiField::new().with_maximum(5.0);
        let merged = base.merged_with(&overlay);
        assert_eq!(merged.minimum, Some(0.0));
        assert_eq!(merged.maximum, Some(5.0));
        assert_eq!(merged.label.as_deref(), Some("base"));
    }

    #[test]
    fn widget_type_accepts_names_and_kinds() {
        let by_name = UiField::from_pairs([("widget_type", OptionValue::from("Slider"))]).unwrap();
        assert_eq!(by_name.widget_type, Some(WidgetRef::Name("Slider".into())));

        let by_kind = UiField::from_pairs([("widget_type", OptionValue::from(WidgetKind::Slider))])
            .unwrap();
        assert_eq!(by_kind.widget_type, Some(WidgetRef::Kind(WidgetKind::Slider)));
    }

    #[test]
    fn effective_default_prefers_constant() {
        let factory_only = UiField::new().with_default_factory(|| Value::Int(7));
        assert_eq!(factory_only.effective_default(), Some(Value::Int(7)));

        let both = factory_only.with_default(3);
        assert_eq!(both.effective_default(), Some(Value::Int(3)));
    }
}
