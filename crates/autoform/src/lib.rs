//! autoform - build guis from function signatures.
//!
//! autoform turns a description of a callable (parameter names, type
//! annotations, defaults) into a container of typed widgets, keeps the two
//! in sync, and calls the function with whatever the widgets currently
//! hold. It is backend-agnostic: the engine talks to rendering toolkits
//! only through the traits in [`backend`], and ships a headless
//! [`MockBackend`](backend::MockBackend) so everything works without a
//! display.
//!
//! # Key types
//!
//! - [`Value`](types::Value) / [`TypeHint`](types::TypeHint) - the data
//!   model: runtime values and the annotations that describe them.
//! - [`TypeRegistry`](registry::TypeRegistry) - resolves a value and an
//!   annotation to a [`WidgetKind`](widget::WidgetKind) plus creation
//!   options.
//! - [`Widget`](widget::Widget) / [`Container`](widget::Container) - the
//!   flat widget handle and the widget collection.
//! - [`MagicSignature`](signature::MagicSignature) - a callable's
//!   parameter list, convertible to a container and back.
//! - [`FunctionGui`](function_gui::FunctionGui) - a callable bound to its
//!   gui, with a call button, result display and auto-call.
//! - [`GuiModel`](binding::GuiModel) - a field-declared model with a
//!   two-way bound gui.
//!
//! # Example
//!
//! ```
//! use autoform::function_gui::{arg, FunctionGuiBuilder};
//! use autoform::signature::{MagicSignature, Parameter};
//! use autoform::types::{TypeHint, Value};
//!
//! let signature = MagicSignature::builder()
//!     .param(Parameter::new("width").annotation(TypeHint::Int).default(4))
//!     .param(Parameter::new("height").annotation(TypeHint::Int).default(5))
//!     .returns(TypeHint::Int)
//!     .build()?;
//!
//! let gui = FunctionGuiBuilder::new("area", signature, |args| {
//!     let w = arg(args, "width").and_then(Value::as_i64).unwrap_or(0);
//!     let h = arg(args, "height").and_then(Value::as_i64).unwrap_or(0);
//!     Value::Int(w * h)
//! })
//! .build()?;
//!
//! gui.widget("width").unwrap().set_value(Value::Int(10))?;
//! assert_eq!(gui.call(&[])?, Value::Int(50));
//! # Ok::<(), autoform::Error>(())
//! ```

pub mod backend;
pub mod binding;
pub mod error;
pub mod field;
pub mod function_gui;
pub mod persist;
pub mod registry;
pub mod signature;
pub mod types;
pub mod widget;

pub use autoform_core::{BlockGuard, ConnectionGuard, ConnectionId, Signal};

pub use binding::{bind_gui_to_instance, unbind_gui_from_instance, BindableModel, GuiModel};
pub use error::{Error, Result};
pub use field::{Bind, ChoicesSource, OptionValue, UiField};
pub use function_gui::{FunctionGui, FunctionGuiBuilder};
pub use registry::{global_registry, Registration, TypeRegistry};
pub use signature::{MagicSignature, Parameter, ParameterKind};
pub use types::{EnumType, TypeHint, Value};
pub use widget::{create_widget, Container, Orientation, Widget, WidgetKind, WidgetRef};
