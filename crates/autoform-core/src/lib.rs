//! Core systems for autoform.
//!
//! This crate provides the foundations the form engine is built on:
//!
//! - **Signal/Slot System**: Type-safe change notification with ordered,
//!   introspectable connections
//! - **Property System**: Reactive values with change detection
//! - **Rate Limiting**: A wall-clock throttle gate for repeated calls
//!
//! Everything here is synchronous: there is no event loop in this crate.
//! Signals are emitted on the caller's thread, and "concurrency" in the
//! widget layer means reentrancy (a slot triggering another emission), not
//! parallelism.
//!
//! # Signal/Property Example
//!
//! ```
//! use autoform_core::{Property, Signal};
//!
//! // A reactive counter with change notification
//! struct Counter {
//!     value: Property<i32>,
//!     value_changed: Signal<i32>,
//! }
//!
//! impl Counter {
//!     fn new() -> Self {
//!         Self {
//!             value: Property::new(0),
//!             value_changed: Signal::new(),
//!         }
//!     }
//!
//!     fn increment(&self) {
//!         let new_value = self.value.get() + 1;
//!         if self.value.set(new_value) {
//!             self.value_changed.emit(new_value);
//!         }
//!     }
//! }
//!
//! let counter = Counter::new();
//! counter.value_changed.connect(|value| {
//!     println!("Counter is now {}", value);
//! });
//! counter.increment();
//! ```

mod debounce;
pub mod logging;
pub mod property;
pub mod signal;

pub use debounce::Throttle;
pub use property::Property;
pub use signal::{BlockGuard, ConnectionGuard, ConnectionId, Signal};
