//! The widget abstraction layer.
//!
//! Widgets are flat: one [`Widget`] handle type for every kind, with
//! capability-gated methods instead of a type hierarchy. [`WidgetKind`]
//! names the kind, [`Container`] adds child management on top, and
//! [`create_widget`] is the factory that runs type-to-widget resolution and
//! applies options.

mod base;
mod container;
mod create;
mod kind;

pub use base::Widget;
pub use container::Container;
pub use create::{create_widget, create_widget_with};
pub use kind::{Orientation, WidgetKind, WidgetRef};

pub(crate) use container::ContainerState;
