//! The value and type-hint model.
//!
//! Gui state flows through the engine as [`Value`], a closed tagged union of
//! everything a widget can hold. Static type information travels separately
//! as [`TypeHint`], the annotation language the resolution engine consumes.
//! The two meet in [`Value::hint`], which recovers the hint a value would
//! have carried had it been annotated.
//!
//! # Key Types
//!
//! - [`Value`]: runtime widget state (serializable, used for persistence)
//! - [`TypeHint`]: static annotations, including [`TypeHint::Optional`] and
//!   [`TypeHint::Annotated`]
//! - [`EnumType`] / [`CustomType`]: nominal types described by name

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::field::UiField;

// ============================================================================
// Value
// ============================================================================

/// A runtime value held by a widget.
///
/// `Null` is a real value (the state of a nullable widget), distinct from
/// "no value supplied", which the engine spells `Option<Value>::None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// A `start..stop` progression with a step, edited as three spin boxes.
    Range {
        start: i64,
        stop: i64,
        step: i64,
    },
    /// Like `Range` but denoting an index window rather than a progression.
    Slice {
        start: i64,
        stop: i64,
        step: i64,
    },
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// A member of a nominal enumeration, carried by type and member name.
    EnumMember {
        type_name: String,
        name: String,
    },
    /// Row-major tabular data.
    Table(Vec<Vec<Value>>),
    /// An opaque value of a registered nominal type.
    Custom {
        type_name: String,
        repr: String,
    },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A short name for the value's runtime type, for error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "str".into(),
            Value::Path(_) => "path".into(),
            Value::Date(_) => "date".into(),
            Value::Time(_) => "time".into(),
            Value::DateTime(_) => "datetime".into(),
            Value::Range { .. } => "range".into(),
            Value::Slice { .. } => "slice".into(),
            Value::List(_) => "list".into(),
            Value::Tuple(_) => "tuple".into(),
            Value::EnumMember { type_name, .. } => type_name.clone(),
            Value::Table(_) => "table".into(),
            Value::Custom { type_name, .. } => type_name.clone(),
        }
    }

    /// Recover the [`TypeHint`] this value would satisfy.
    ///
    /// Returns `None` for `Null` (a null carries no type information) and
    /// for enum members and custom values, whose full nominal type (variant
    /// list, base chain) cannot be recovered from a lone value. Those resolve
    /// through their annotation instead.
    pub fn hint(&self) -> Option<TypeHint> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(TypeHint::Bool),
            Value::Int(_) => Some(TypeHint::Int),
            Value::Float(_) => Some(TypeHint::Float),
            Value::Str(_) => Some(TypeHint::Str),
            Value::Path(_) => Some(TypeHint::Path),
            Value::Date(_) => Some(TypeHint::Date),
            Value::Time(_) => Some(TypeHint::Time),
            Value::DateTime(_) => Some(TypeHint::DateTime),
            Value::Range { .. } => Some(TypeHint::Range),
            Value::Slice { .. } => Some(TypeHint::Slice),
            Value::List(items) => {
                let elem = items.first().and_then(Value::hint).unwrap_or(TypeHint::Any);
                Some(TypeHint::List(Box::new(elem)))
            }
            Value::Tuple(items) => {
                let elems = items
                    .iter()
                    .map(|v| v.hint().unwrap_or(TypeHint::Any))
                    .collect();
                Some(TypeHint::Tuple(elems))
            }
            Value::Table(_) => Some(TypeHint::Table),
            Value::EnumMember { .. } | Value::Custom { .. } => None,
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    /// Human-oriented rendering, used for derived choice labels and for
    /// showing results in text widgets.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Range { start, stop, step } => write!(f, "range({start}, {stop}, {step})"),
            Value::Slice { start, stop, step } => write!(f, "slice({start}, {stop}, {step})"),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_string).collect();
                write!(f, "({})", parts.join(", "))
            }
            Value::EnumMember { type_name, name } => write!(f, "{type_name}.{name}"),
            Value::Table(rows) => write!(f, "<table: {} rows>", rows.len()),
            Value::Custom { repr, .. } => f.write_str(repr),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Value::Path(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

// ============================================================================
// Nominal types
// ============================================================================

/// A nominal enumeration: a type name plus its ordered member names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, variants: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// The member named `name`, as a [`Value`], if it exists.
    pub fn member(&self, name: &str) -> Option<Value> {
        self.variants.iter().any(|v| v == name).then(|| Value::EnumMember {
            type_name: self.name.clone(),
            name: name.to_owned(),
        })
    }

    /// All members as `(label, value)` pairs, in declaration order.
    pub fn choices(&self) -> Vec<(String, Value)> {
        self.variants
            .iter()
            .map(|v| {
                (
                    v.clone(),
                    Value::EnumMember {
                        type_name: self.name.clone(),
                        name: v.clone(),
                    },
                )
            })
            .collect()
    }
}

/// A nominal type known only by name, with an optional base-type chain.
///
/// The base chain is what makes registry subclass lookup work: a
/// registration for `"Animal"` matches a `CustomType` whose `bases`
/// include `"Animal"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomType {
    pub name: String,
    pub bases: Vec<String>,
}

impl CustomType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
        }
    }

    pub fn with_bases(
        name: impl Into<String>,
        bases: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            bases: bases.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this type is, or descends from, the named type.
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.bases.iter().any(|b| b == name)
    }
}

// ============================================================================
// TypeHint
// ============================================================================

/// A static type annotation consumed by the resolution engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeHint {
    /// No constraint; the element type of an untyped list, for example.
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
    List(Box<TypeHint>),
    Tuple(Vec<TypeHint>),
    /// A homogeneous sequence with no concrete container type.
    Sequence(Box<TypeHint>),
    Enum(EnumType),
    Custom(CustomType),
    /// `T` or null. Unwrapped during resolution, marking the field nullable.
    Optional(Box<TypeHint>),
    /// A base hint with widget options attached inline. The options are
    /// boxed: `UiField` itself carries a `TypeHint`.
    Annotated(Box<TypeHint>, Box<UiField>),
}

impl TypeHint {
    pub fn optional(inner: TypeHint) -> Self {
        TypeHint::Optional(Box::new(inner))
    }

    pub fn annotated(inner: TypeHint, options: UiField) -> Self {
        TypeHint::Annotated(Box::new(inner), Box::new(options))
    }

    pub fn list(elem: TypeHint) -> Self {
        TypeHint::List(Box::new(elem))
    }

    pub fn sequence(elem: TypeHint) -> Self {
        TypeHint::Sequence(Box::new(elem))
    }

    /// A short, human-oriented rendering for error messages.
    pub fn display_name(&self) -> String {
        match self {
            TypeHint::Any => "Any".into(),
            TypeHint::Bool => "bool".into(),
            TypeHint::Int => "int".into(),
            TypeHint::Float => "float".into(),
            TypeHint::Str => "str".into(),
            TypeHint::Path => "Path".into(),
            TypeHint::Date => "date".into(),
            TypeHint::Time => "time".into(),
            TypeHint::DateTime => "datetime".into(),
            TypeHint::Range => "range".into(),
            TypeHint::Slice => "slice".into(),
            TypeHint::Table => "table".into(),
            TypeHint::List(e) => format!("list[{}]", e.display_name()),
            TypeHint::Tuple(es) => {
                let inner: Vec<String> = es.iter().map(TypeHint::display_name).collect();
                format!("tuple[{}]", inner.join(", "))
            }
            TypeHint::Sequence(e) => format!("Sequence[{}]", e.display_name()),
            TypeHint::Enum(e) => e.name.clone(),
            TypeHint::Custom(c) => c.name.clone(),
            TypeHint::Optional(e) => format!("Optional[{}]", e.display_name()),
            TypeHint::Annotated(e, _) => format!("Annotated[{}, ...]", e.display_name()),
        }
    }
}
