//! Widget containers.
//!
//! A [`Container`] owns an ordered list of child widgets, bubbles their
//! value changes into one aggregate signal, and keeps per-child display
//! labels in sync. Children are addressed by position or by name, and names
//! are unique: inserting a second child under an existing name is rejected
//! at insert time rather than silently shadowing lookups.

use std::sync::Arc;

use autoform_core::logging::targets;
use autoform_core::{ConnectionId, Signal};
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::widget::{Orientation, Widget, WidgetKind};

struct ChildEntry {
    widget: Widget,
    /// The companion label widget, when labels are enabled for this child.
    label_widget: Option<Widget>,
    changed_conn: Option<ConnectionId>,
    label_conn: Option<ConnectionId>,
}

pub(crate) struct ContainerState {
    layout: Orientation,
    labels: bool,
    children: RwLock<Vec<ChildEntry>>,
    /// Emitted whenever any child's value changes.
    pub(crate) changed: Signal<()>,
}

/// An ordered, named collection of widgets with a layout direction.
#[derive(Clone)]
pub struct Container {
    widget: Widget,
    state: Arc<ContainerState>,
}

impl Container {
    pub fn new(layout: Orientation, labels: bool) -> Result<Self> {
        let widget = Widget::of_kind(WidgetKind::Container)?;
        let state = Arc::new(ContainerState {
            layout,
            labels,
            children: RwLock::new(Vec::new()),
            changed: Signal::new(),
        });
        *widget.inner.container.write() = Some(state.clone());
        Ok(Self { widget, state })
    }

    /// Recover the container interface from a widget handle, if the widget
    /// is one.
    pub fn from_widget(widget: &Widget) -> Option<Self> {
        let state = widget.inner.container.read().clone()?;
        Some(Self {
            widget: widget.clone(),
            state,
        })
    }

    /// The container as a plain widget, for nesting.
    pub fn as_widget(&self) -> &Widget {
        &self.widget
    }

    pub fn layout(&self) -> Orientation {
        self.state.layout
    }

    pub fn labels(&self) -> bool {
        self.state.labels
    }

    /// Fired after any child's value changes, with no payload; read current
    /// values from the children.
    pub fn changed(&self) -> &Signal<()> {
        &self.state.changed
    }

    pub fn len(&self) -> usize {
        self.state.children.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.children.read().is_empty()
    }

    pub fn margins(&self) -> (f32, f32, f32, f32) {
        match self.widget.native().as_container() {
            Some(c) => c.margins(),
            None => (0.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn set_margins(&self, margins: (f32, f32, f32, f32)) {
        if let Some(c) = self.widget.native().as_container() {
            c.set_margins(margins);
        }
    }

    // ========================================================================
    // Child management
    // ========================================================================

    pub fn push(&self, child: &Widget) -> Result<()> {
        self.insert(self.len(), child)
    }

    /// Insert `child` at `index`.
    ///
    /// Fails with [`Error::DuplicateName`] if a child with the same
    /// (non-empty) name already exists.
    pub fn insert(&self, index: usize, child: &Widget) -> Result<()> {
        let name = child.name();
        if !name.is_empty() && self.widget(&name).is_some() {
            return Err(Error::DuplicateName(name));
        }

        let label_widget = if self.wants_label(child) {
            let label = Widget::of_kind(WidgetKind::Label)?;
            label.set_text(&child.label())?;
            Some(label)
        } else {
            None
        };

        // Bubble child value changes into the container's aggregate signal.
        let changed_conn = if child.kind().has_value() {
            let weak = Arc::downgrade(&self.state);
            Some(child.changed().connect(move |_| {
                if let Some(state) = weak.upgrade() {
                    state.changed.emit(());
                }
            }))
        } else {
            None
        };

        // Keep the companion label's text following the child's label.
        let label_conn = label_widget.as_ref().map(|label| {
            let label = label.clone();
            let weak = Arc::downgrade(&self.state);
            child.label_changed().connect(move |text: &String| {
                if let Err(error) = label.set_text(text) {
                    tracing::warn!(
                        target: targets::WIDGET,
                        %error,
                        "failed to update child label"
                    );
                }
                if let Some(state) = weak.upgrade() {
                    unify_label_widths(&state);
                }
            })
        });

        {
            let mut children = self.state.children.write();
            let index = index.min(children.len());
            // Labels live in the backend layout too, so the backend slot
            // accounts for the label widgets of preceding children.
            let slot: usize = children[..index]
                .iter()
                .map(|e| if e.label_widget.is_some() { 2 } else { 1 })
                .sum();
            if let Some(backend) = self.widget.native().as_container() {
                let mut slot = slot;
                if let Some(label) = &label_widget {
                    backend.insert_child(slot, label.native().id());
                    slot += 1;
                }
                backend.insert_child(slot, child.native().id());
            }
            children.insert(
                index,
                ChildEntry {
                    widget: child.clone(),
                    label_widget,
                    changed_conn,
                    label_conn,
                },
            );
        }

        // Reparenting comes last: it can trigger choice resets that read
        // the container tree.
        child.native().set_parent(Some(self.widget.native().id()));

        unify_label_widths(&self.state);
        Ok(())
    }

    /// Remove and return the child named `name`.
    pub fn remove(&self, name: &str) -> Option<Widget> {
        let index = self.index_of(name)?;
        self.remove_at(index)
    }

    /// Remove and return the child at `index`.
    pub fn remove_at(&self, index: usize) -> Option<Widget> {
        let entry = {
            let mut children = self.state.children.write();
            if index >= children.len() {
                return None;
            }
            children.remove(index)
        };
        if let Some(conn) = entry.changed_conn {
            entry.widget.changed().disconnect(conn);
        }
        if let Some(conn) = entry.label_conn {
            entry.widget.label_changed().disconnect(conn);
        }
        if let Some(backend) = self.widget.native().as_container() {
            if let Some(label) = &entry.label_widget {
                backend.remove_child(label.native().id());
            }
            backend.remove_child(entry.widget.native().id());
        }
        entry.widget.native().set_parent(None);
        unify_label_widths(&self.state);
        Some(entry.widget)
    }

    pub fn get(&self, index: usize) -> Option<Widget> {
        self.state
            .children
            .read()
            .get(index)
            .map(|e| e.widget.clone())
    }

    /// Look a child up by name.
    pub fn widget(&self, name: &str) -> Option<Widget> {
        self.state
            .children
            .read()
            .iter()
            .find(|e| e.widget.name() == name)
            .map(|e| e.widget.clone())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.state
            .children
            .read()
            .iter()
            .position(|e| e.widget.name() == name)
    }

    /// Snapshot of the children, in layout order.
    pub fn children(&self) -> Vec<Widget> {
        self.state
            .children
            .read()
            .iter()
            .map(|e| e.widget.clone())
            .collect()
    }

    /// Re-derive choices on every categorical descendant, recursing into
    /// nested containers.
    pub fn reset_choices(&self) {
        for child in self.children() {
            if child.kind().is_categorical() {
                if let Err(error) = child.reset_choices() {
                    tracing::warn!(
                        target: targets::WIDGET,
                        name = %child.name(),
                        %error,
                        "failed to reset choices"
                    );
                }
            } else if let Some(nested) = Container::from_widget(&child) {
                nested.reset_choices();
            }
        }
    }

    /// Force label column recomputation; normally automatic on insert,
    /// removal and label changes.
    pub fn unify_label_widths(&self) {
        unify_label_widths(&self.state);
    }

    fn wants_label(&self, child: &Widget) -> bool {
        // Buttons caption themselves; placeholders are invisible.
        self.state.labels && !child.kind().is_button() && child.kind() != WidgetKind::Empty
    }

    // Visibility passthroughs applied to the whole subtree.

    pub fn show(&self) {
        self.widget.show();
    }

    pub fn hide(&self) {
        self.widget.hide();
    }

    pub fn visible(&self) -> bool {
        self.widget.visible()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.widget.set_enabled(enabled);
        for child in self.children() {
            child.set_enabled(enabled);
        }
    }

    pub fn close(&self) {
        self.widget.close();
    }
}

/// Give every label in a vertical, labeled container the width of the
/// widest rendered label, so the value column lines up.
fn unify_label_widths(state: &Arc<ContainerState>) {
    if state.layout != Orientation::Vertical || !state.labels {
        return;
    }
    let children = state.children.read();
    let mut widest: f32 = 0.0;
    for entry in children.iter() {
        if let Some(label) = &entry.label_widget {
            let width = label.native().text_width(&entry.widget.label());
            widest = widest.max(width);
        }
    }
    for entry in children.iter() {
        if let Some(label) = &entry.label_widget {
            label.set_min_width(widest);
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.children().iter().map(Widget::name).collect();
        f.debug_struct("Container")
            .field("layout", &self.state.layout)
            .field("children", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ChoicesSource;
    use crate::types::{EnumType, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn named(kind: WidgetKind, name: &str) -> Widget {
        let w = Widget::of_kind(kind).unwrap();
        w.set_name(name);
        w
    }

    #[test]
    fn children_are_ordered_and_named() {
        let c = Container::new(Orientation::Vertical, true).unwrap();
        c.push(&named(WidgetKind::SpinBox, "alpha")).unwrap();
        c.push(&named(WidgetKind::LineEdit, "beta")).unwrap();
        c.insert(0, &named(WidgetKind::CheckBox, "gamma")).unwrap();

        assert_eq!(c.len(), 3);
        assert_eq!(c.get(0).unwrap().name(), "gamma");
        assert_eq!(c.index_of("beta"), Some(2));
        assert!(c.widget("alpha").is_some());
        assert!(c.widget("delta").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected_at_insert() {
        let c = Container::new(Orientation::Vertical, true).unwrap();
        c.push(&named(WidgetKind::SpinBox, "x")).unwrap();
        let err = c.push(&named(WidgetKind::LineEdit, "x")).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(n) if n == "x"));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn child_changes_bubble_to_container() {
        let c = Container::new(Orientation::Vertical, true).unwrap();
        let spin = named(WidgetKind::SpinBox, "n");
        c.push(&spin).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        c.changed().connect(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        spin.set_value(Value::Int(7)).unwrap();
        spin.set_value(Value::Int(7)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_children_stop_bubbling() {
        let c = Container::new(Orientation::Vertical, true).unwrap();
        let spin = named(WidgetKind::SpinBox, "n");
        c.push(&spin).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        c.changed().connect(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let removed = c.remove("n").unwrap();
        assert!(removed.same(&spin));
        spin.set_value(Value::Int(1)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn reset_choices_recurses_into_nested_containers() {
        let outer = Container::new(Orientation::Vertical, true).unwrap();
        let inner = Container::new(Orientation::Horizontal, false).unwrap();
        inner.as_widget().set_name("inner");

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let combo = named(WidgetKind::ComboBox, "pick");
        combo
            .set_choices(ChoicesSource::func(move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                vec![("one".into(), Value::Int(1))]
            }))
            .unwrap();

        inner.push(&combo).unwrap();
        outer.push(inner.as_widget()).unwrap();

        let before = calls.load(Ordering::SeqCst);
        outer.reset_choices();
        assert_eq!(calls.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn labels_line_up_to_the_widest() {
        let c = Container::new(Orientation::Vertical, true).unwrap();
        let short = named(WidgetKind::SpinBox, "n");
        let long = named(WidgetKind::LineEdit, "a_much_longer_parameter");
        c.push(&short).unwrap();
        c.push(&long).unwrap();

        // Both labels share the width of the widest rendered label.
        let widths: Vec<f32> = c
            .state
            .children
            .read()
            .iter()
            .filter_map(|e| e.label_widget.as_ref().map(|l| l.native().min_width()))
            .collect();
        assert_eq!(widths.len(), 2);
        assert_eq!(widths[0], widths[1]);
        assert!(widths[0] > 0.0);
    }

    #[test]
    fn buttons_get_no_companion_label() {
        let c = Container::new(Orientation::Vertical, true).unwrap();
        let button = named(WidgetKind::PushButton, "go");
        c.push(&button).unwrap();
        assert!(c.state.children.read()[0].label_widget.is_none());
    }

    #[test]
    fn labels_join_the_backend_layout() {
        let c = Container::new(Orientation::Vertical, true).unwrap();
        c.push(&named(WidgetKind::SpinBox, "n")).unwrap();
        c.push(&named(WidgetKind::PushButton, "go")).unwrap();

        // Label + spin box, plus the unlabeled button.
        let backend = c.as_widget().native().as_container().unwrap();
        assert_eq!(backend.child_count(), 3);

        c.remove("n").unwrap();
        assert_eq!(backend.child_count(), 1);
    }

    #[test]
    fn reparenting_resets_categorical_choices() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let combo = named(WidgetKind::ComboBox, "pick");
        combo
            .set_choices(ChoicesSource::func(move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                EnumType::new("AB", ["a", "b"]).choices()
            }))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let c = Container::new(Orientation::Vertical, true).unwrap();
        c.push(&combo).unwrap();
        // Insertion reparents the child, which re-derives its choices.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
