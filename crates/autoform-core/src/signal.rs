//! Signal/slot system for autoform.
//!
//! Signals are the change-notification backbone of the widget layer: every
//! value widget carries a `changed` signal, containers re-emit child changes,
//! and the binding engine wires signals to model fields. Emission is always
//! synchronous and happens on the caller's thread; the GUI event loop is
//! owned by the backend toolkit and never enters this crate.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The main signal type for emitting notifications
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//! - [`BlockGuard`] - RAII guard that blocks emission for a scope
//!
//! # Ordering
//!
//! Slots are invoked in connection order (FIFO). A slot connected with
//! [`Signal::connect_before`] or [`Signal::connect_after`] is placed relative
//! to a named connection instead. The connection list is snapshotted when an
//! emission starts: a slot connected from inside a slot will not run during
//! the emission pass that is already underway.
//!
//! # Example
//!
//! ```
//! use autoform_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//!
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit("Hello, World!".to_string());
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via
    /// [`Signal::disconnect`]. The ID remains valid until the connection is
    /// explicitly disconnected or the signal is dropped.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Internal storage for a single connection.
struct Connection<Args> {
    slot: Slot<Args>,
    /// Optional name, used as the anchor for ordering hints.
    name: Option<String>,
}

struct Connections<Args> {
    slots: SlotMap<ConnectionId, Connection<Args>>,
    /// Invocation order. Every key in `slots` appears here exactly once.
    order: Vec<ConnectionId>,
}

impl<Args> Connections<Args> {
    fn insert_at(&mut self, index: usize, conn: Connection<Args>) -> ConnectionId {
        let id = self.slots.insert(conn);
        self.order.insert(index, id);
        id
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|id| {
            self.slots
                .get(*id)
                .and_then(|c| c.name.as_deref())
                .is_some_and(|n| n == name)
        })
    }
}

/// A type-safe signal with an ordered list of connected slots.
///
/// When a signal is emitted, connected slots are invoked synchronously, in
/// connection order, with a reference to the emitted arguments.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for
///   signals with no arguments.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync`; connections are protected by a mutex.
/// Slots always run on the emitting thread.
pub struct Signal<Args> {
    connections: Mutex<Connections<Args>>,
    /// Whether signal emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Connections {
                slots: SlotMap::with_key(),
                order: Vec::new(),
            }),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// The slot is appended to the invocation order and will be called after
    /// every previously connected slot. Returns a [`ConnectionId`] that can
    /// be used to disconnect it later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.push(slot, None)
    }

    /// Connect a slot under a name that ordering hints can refer to.
    ///
    /// Names are not required to be unique; hints anchor to the first
    /// connection with a matching name.
    pub fn connect_named<F>(&self, name: impl Into<String>, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.push(slot, Some(name.into()))
    }

    /// Connect a slot so that it runs immediately before the named connection.
    ///
    /// Falls back to appending if no connection with that name exists.
    pub fn connect_before<F>(&self, anchor: &str, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let mut conns = self.connections.lock();
        let index = conns.position_of(anchor).unwrap_or(conns.order.len());
        conns.insert_at(
            index,
            Connection {
                slot: Arc::new(slot),
                name: None,
            },
        )
    }

    /// Connect a slot so that it runs immediately after the named connection.
    ///
    /// Falls back to appending if no connection with that name exists.
    pub fn connect_after<F>(&self, anchor: &str, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let mut conns = self.connections.lock();
        let index = conns
            .position_of(anchor)
            .map(|i| i + 1)
            .unwrap_or(conns.order.len());
        conns.insert_at(
            index,
            Connection {
                slot: Arc::new(slot),
                name: None,
            },
        )
    }

    fn push<F>(&self, slot: F, name: Option<String>) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let mut conns = self.connections.lock();
        let index = conns.order.len();
        conns.insert_at(
            index,
            Connection {
                slot: Arc::new(slot),
                name,
            },
        )
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut conns = self.connections.lock();
        if conns.slots.remove(id).is_some() {
            conns.order.retain(|other| *other != id);
            true
        } else {
            false
        }
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        let mut conns = self.connections.lock();
        conns.slots.clear();
        conns.order.clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().order.len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` do nothing. Useful during
    /// initialization or programmatic updates that should not cascade.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Block emission for the lifetime of the returned guard.
    ///
    /// # Example
    ///
    /// ```
    /// use autoform_core::Signal;
    ///
    /// let signal = Signal::<i32>::new();
    /// signal.connect(|_| panic!("should not fire"));
    /// {
    ///     let _block = signal.blocked();
    ///     signal.emit(1);
    /// }
    /// ```
    pub fn blocked(&self) -> BlockGuard<'_, Args> {
        let was_blocked = self.is_blocked();
        self.set_blocked(true);
        BlockGuard {
            signal: self,
            was_blocked,
        }
    }

    /// Emit the signal, invoking all connected slots in connection order.
    ///
    /// Does nothing while the signal is blocked. The connection list is
    /// snapshotted before the first slot runs; slots may connect or
    /// disconnect freely without affecting the current pass, except that a
    /// slot disconnected mid-pass will be skipped if it has not yet run.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        // Snapshot under the lock, invoke outside it, so that slots can
        // re-enter this signal (connect, disconnect, even emit).
        let snapshot: Vec<(ConnectionId, Slot<Args>)> = {
            let conns = self.connections.lock();
            conns
                .order
                .iter()
                .filter_map(|id| conns.slots.get(*id).map(|c| (*id, c.slot.clone())))
                .collect()
        };
        tracing::trace!(
            target: targets::SIGNAL,
            connection_count = snapshot.len(),
            "emitting signal"
        );

        for (id, slot) in snapshot {
            let still_connected = self.connections.lock().slots.contains_key(id);
            if still_connected {
                slot(&args);
            }
        }
    }

    /// Connect a slot with automatic disconnection when the guard is dropped.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard { signal: self, id }
    }
}

// Slots are Send + Sync by construction, and connections sit behind a Mutex.
static_assertions::assert_impl_all!(Signal<i32>: Send, Sync);

/// A connection that disconnects itself when dropped.
///
/// Created via [`Signal::connect_scoped`]. The borrow ties the guard's
/// lifetime to the signal, so the dangling-pointer hazards of manual
/// disconnection do not arise.
pub struct ConnectionGuard<'a, Args: 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<'_, Args> {
    /// The underlying connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        let _ = self.signal.disconnect(self.id);
    }
}

/// Restores a signal's previous blocked state when dropped.
///
/// Created via [`Signal::blocked`]. Nested guards compose: the outermost
/// guard restores the original state.
pub struct BlockGuard<'a, Args: 'static> {
    signal: &'a Signal<Args>,
    was_blocked: bool,
}

impl<Args: 'static> Drop for BlockGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.set_blocked(self.was_blocked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_and_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(42);
        signal.emit(100);

        assert_eq!(*received.lock(), vec![42, 100]);
    }

    #[test]
    fn disconnect_stops_delivery() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let conn_id = signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        assert!(signal.disconnect(conn_id));
        assert!(!signal.disconnect(conn_id));
        signal.emit(2);

        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn blocked_signal_does_not_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        signal.set_blocked(true);
        signal.emit(2);
        signal.set_blocked(false);
        signal.emit(3);

        assert_eq!(*received.lock(), vec![1, 3]);
    }

    #[test]
    fn block_guard_restores_state() {
        let signal = Signal::<()>::new();
        {
            let _outer = signal.blocked();
            {
                let _inner = signal.blocked();
            }
            // Inner guard must not unblock what the outer guard blocked.
            assert!(signal.is_blocked());
        }
        assert!(!signal.is_blocked());
    }

    #[test]
    fn slots_run_in_connection_order() {
        let signal = Signal::<()>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let log = log.clone();
            signal.connect(move |_| log.lock().push(i));
        }

        signal.emit(());
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn ordering_hints_position_slots() {
        let signal = Signal::<()>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        signal.connect_named("first", move |_| l.lock().push("first"));
        let l = log.clone();
        signal.connect_named("last", move |_| l.lock().push("last"));

        let l = log.clone();
        signal.connect_before("last", move |_| l.lock().push("middle"));
        let l = log.clone();
        signal.connect_after("first", move |_| l.lock().push("second"));

        signal.emit(());
        assert_eq!(*log.lock(), vec!["first", "second", "middle", "last"]);
    }

    #[test]
    fn hint_with_unknown_anchor_appends() {
        let signal = Signal::<()>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        signal.connect(move |_| l.lock().push(1));
        let l = log.clone();
        signal.connect_before("no-such-name", move |_| l.lock().push(2));

        signal.emit(());
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[test]
    fn slot_connected_during_emission_is_deferred() {
        let signal = Arc::new(Signal::<()>::new());
        let count = Arc::new(Mutex::new(0usize));

        let sig = signal.clone();
        let count_clone = count.clone();
        signal.connect(move |_| {
            let count_inner = count_clone.clone();
            sig.connect(move |_| {
                *count_inner.lock() += 1;
            });
        });

        signal.emit(());
        assert_eq!(*count.lock(), 0, "new slot must not run in the same pass");
        signal.emit(());
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn slot_disconnected_during_emission_is_skipped() {
        let signal = Arc::new(Signal::<()>::new());
        let ran = Arc::new(AtomicBool::new(false));

        let id_cell: Arc<Mutex<Option<ConnectionId>>> = Arc::new(Mutex::new(None));
        let sig = signal.clone();
        let id_cell_clone = id_cell.clone();
        signal.connect(move |_| {
            if let Some(id) = *id_cell_clone.lock() {
                sig.disconnect(id);
            }
        });
        let ran_clone = ran.clone();
        let second = signal.connect(move |_| {
            ran_clone.store(true, Ordering::SeqCst);
        });
        *id_cell.lock() = Some(second);

        signal.emit(());
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn connection_guard_disconnects_on_drop() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        {
            let received_clone = received.clone();
            let _guard = signal.connect_scoped(move |&value| {
                received_clone.lock().push(value);
            });
            signal.emit(1);
        }

        signal.emit(2);
        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn multiple_connections_all_fire() {
        let signal = Signal::<String>::new();
        let count = Arc::new(Mutex::new(0));

        for _ in 0..3 {
            let count_clone = count.clone();
            signal.connect(move |_| {
                *count_clone.lock() += 1;
            });
        }

        assert_eq!(signal.connection_count(), 3);
        signal.emit("test".to_string());
        assert_eq!(*count.lock(), 3);

        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }
}
