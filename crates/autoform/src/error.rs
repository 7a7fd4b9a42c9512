//! Error types for widget resolution, construction and calling.

use thiserror::Error;

use crate::widget::WidgetKind;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the form engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Type-to-widget resolution exhausted every strategy.
    #[error(
        "no widget found for value of type {value_type:?} with annotation {annotation:?}; \
         register the type with `TypeRegistry::register` or supply a `widget_type` option"
    )]
    NoWidgetFound {
        value_type: Option<String>,
        annotation: Option<String>,
    },

    /// A widget was requested by a name no [`WidgetKind`] carries.
    #[error("unknown widget name {0:?}")]
    UnknownWidgetName(String),

    /// An option key matched neither a canonical field name nor an alias.
    #[error("unknown option key {0:?}")]
    UnknownOption(String),

    /// An option key was recognized but its value had the wrong shape.
    #[error("invalid option {key:?}: {message}")]
    InvalidOption { key: String, message: String },

    /// A backend widget does not implement a capability its kind requires.
    #[error(
        "backend widget does not implement the {capability} capability required \
         by {kind:?}: missing methods {methods:?}"
    )]
    MissingCapability {
        kind: WidgetKind,
        capability: &'static str,
        methods: &'static [&'static str],
    },

    /// A value was set on a categorical widget that is not among its choices.
    #[error("{value:?} is not a valid choice. must be one of {valid:?}")]
    InvalidChoice { value: String, valid: Vec<String> },

    /// `TypeRegistry::register` was called with nothing to register.
    #[error(
        "at least one of `widget_type`, `choices`, `bind` or `return_callback` \
         must be provided to register a type"
    )]
    EmptyRegistration,

    /// Per-parameter gui options named parameters the signature lacks.
    #[error("received option keys {keys:?} that do not match any parameter name in the signature")]
    UnknownParameters { keys: Vec<String> },

    /// A call was attempted with a required parameter still unfilled.
    #[error(
        "missing a required argument: {name:?} in call to '{function}'. To avoid this error, \
         either bind a value to the parameter with the `bind` option, or provide \
         `widget_type`/`choices` options so a widget can be created for it"
    )]
    MissingArgument { name: String, function: String },

    /// A call supplied an override for a parameter the gui does not have.
    #[error("got an unexpected keyword argument {name:?} in call to '{function}'")]
    UnexpectedArgument { name: String, function: String },

    /// Container insertion would shadow an existing child.
    #[error("a widget named {0:?} already exists in this container")]
    DuplicateName(String),

    /// A capability accessor was used on a widget kind without it.
    #[error("widget {name:?} of kind {kind:?} has no {capability} capability")]
    NotSupported {
        name: String,
        kind: WidgetKind,
        capability: &'static str,
    },

    /// No per-user cache directory could be determined for persisted state.
    #[error("no cache directory available for persisted state")]
    NoCacheDir,

    /// Reading or writing persisted state failed.
    #[error("failed to read or write persisted state: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state was not valid JSON.
    #[error("invalid persisted state: {0}")]
    Json(#[from] serde_json::Error),
}
