//! Logging facilities for autoform.
//!
//! autoform instruments its subsystems with the `tracing` crate. To see
//! logs, install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! The constants in [`targets`] give every subsystem a stable target name,
//! so logs can be filtered with directives such as
//! `RUST_LOG=autoform::registry=trace`.

/// Target names for log filtering.
pub mod targets {
    /// Signal emission and blocking.
    pub const SIGNAL: &str = "autoform_core::signal";
    /// Type-to-widget resolution.
    pub const REGISTRY: &str = "autoform::registry";
    /// Widget construction and capability checks.
    pub const WIDGET: &str = "autoform::widget";
    /// Function gui construction and calling.
    pub const FUNCTION_GUI: &str = "autoform::function_gui";
    /// Gui-to-model binding.
    pub const BINDING: &str = "autoform::binding";
    /// Container state persistence.
    pub const PERSIST: &str = "autoform::persist";
}
