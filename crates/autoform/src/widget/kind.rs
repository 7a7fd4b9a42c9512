//! The closed set of widget kinds and their capability classes.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Every widget kind the engine can produce.
///
/// Kinds are a flat enumeration rather than a type hierarchy; what a kind
/// can do is expressed by the capability predicates below and enforced
/// against the backend at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// A placeholder with no visual representation, hidden by default.
    Empty,
    Label,
    LineEdit,
    TextEdit,
    PasswordEdit,
    CheckBox,
    RadioButton,
    PushButton,
    SpinBox,
    FloatSpinBox,
    Slider,
    FloatSlider,
    ProgressBar,
    FileEdit,
    DateEdit,
    TimeEdit,
    DateTimeEdit,
    RangeEdit,
    SliceEdit,
    ListEdit,
    TupleEdit,
    ComboBox,
    RadioButtons,
    Select,
    Table,
    Container,
}

impl WidgetKind {
    /// The canonical name, as accepted by [`WidgetKind::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            WidgetKind::Empty => "EmptyWidget",
            WidgetKind::Label => "Label",
            WidgetKind::LineEdit => "LineEdit",
            WidgetKind::TextEdit => "TextEdit",
            WidgetKind::PasswordEdit => "PasswordEdit",
            WidgetKind::CheckBox => "CheckBox",
            WidgetKind::RadioButton => "RadioButton",
            WidgetKind::PushButton => "PushButton",
            WidgetKind::SpinBox => "SpinBox",
            WidgetKind::FloatSpinBox => "FloatSpinBox",
            WidgetKind::Slider => "Slider",
            WidgetKind::FloatSlider => "FloatSlider",
            WidgetKind::ProgressBar => "ProgressBar",
            WidgetKind::FileEdit => "FileEdit",
            WidgetKind::DateEdit => "DateEdit",
            WidgetKind::TimeEdit => "TimeEdit",
            WidgetKind::DateTimeEdit => "DateTimeEdit",
            WidgetKind::RangeEdit => "RangeEdit",
            WidgetKind::SliceEdit => "SliceEdit",
            WidgetKind::ListEdit => "ListEdit",
            WidgetKind::TupleEdit => "TupleEdit",
            WidgetKind::ComboBox => "ComboBox",
            WidgetKind::RadioButtons => "RadioButtons",
            WidgetKind::Select => "Select",
            WidgetKind::Table => "Table",
            WidgetKind::Container => "Container",
        }
    }

    /// Look a kind up by its canonical name.
    pub fn from_name(name: &str) -> Result<Self> {
        ALL_KINDS
            .iter()
            .copied()
            .find(|k| k.name() == name)
            .ok_or_else(|| Error::UnknownWidgetName(name.to_owned()))
    }

    /// Whether widgets of this kind carry a current value.
    pub fn has_value(self) -> bool {
        !matches!(
            self,
            WidgetKind::Empty | WidgetKind::Label | WidgetKind::Container
        )
    }

    /// Whether this kind edits a number inside a minimum/maximum/step range.
    pub fn is_ranged(self) -> bool {
        matches!(
            self,
            WidgetKind::SpinBox
                | WidgetKind::FloatSpinBox
                | WidgetKind::Slider
                | WidgetKind::FloatSlider
                | WidgetKind::ProgressBar
        )
    }

    /// Whether this kind selects from a set of named choices.
    pub fn is_categorical(self) -> bool {
        matches!(
            self,
            WidgetKind::ComboBox | WidgetKind::RadioButtons | WidgetKind::Select
        )
    }

    /// Whether selecting multiple choices at once is possible.
    pub fn allows_multiple(self) -> bool {
        matches!(self, WidgetKind::Select)
    }

    /// Momentary or single-toggle buttons. `CheckBox` is deliberately not in
    /// this class: it renders a boolean field, and participates in value
    /// binding like any other value widget.
    pub fn is_button(self) -> bool {
        matches!(self, WidgetKind::PushButton | WidgetKind::RadioButton)
    }

    /// Whether this kind displays a text caption of its own.
    pub fn has_text(self) -> bool {
        matches!(
            self,
            WidgetKind::Label
                | WidgetKind::PushButton
                | WidgetKind::RadioButton
                | WidgetKind::CheckBox
        )
    }

    pub fn is_container(self) -> bool {
        matches!(self, WidgetKind::Container)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const ALL_KINDS: &[WidgetKind] = &[
    WidgetKind::Empty,
    WidgetKind::Label,
    WidgetKind::LineEdit,
    WidgetKind::TextEdit,
    WidgetKind::PasswordEdit,
    WidgetKind::CheckBox,
    WidgetKind::RadioButton,
    WidgetKind::PushButton,
    WidgetKind::SpinBox,
    WidgetKind::FloatSpinBox,
    WidgetKind::Slider,
    WidgetKind::FloatSlider,
    WidgetKind::ProgressBar,
    WidgetKind::FileEdit,
    WidgetKind::DateEdit,
    WidgetKind::TimeEdit,
    WidgetKind::DateTimeEdit,
    WidgetKind::RangeEdit,
    WidgetKind::SliceEdit,
    WidgetKind::ListEdit,
    WidgetKind::TupleEdit,
    WidgetKind::ComboBox,
    WidgetKind::RadioButtons,
    WidgetKind::Select,
    WidgetKind::Table,
    WidgetKind::Container,
];

/// A widget request: either a concrete kind or a name to look up.
///
/// Names let options written as plain data (for example, parsed
/// configuration) request widgets without importing the kind enum; they are
/// resolved during the same resolution pass, so a bad name fails with
/// [`Error::UnknownWidgetName`] rather than silently falling through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetRef {
    Kind(WidgetKind),
    Name(String),
}

impl WidgetRef {
    pub fn resolve(&self) -> Result<WidgetKind> {
        match self {
            WidgetRef::Kind(k) => Ok(*k),
            WidgetRef::Name(n) => WidgetKind::from_name(n),
        }
    }
}

impl From<WidgetKind> for WidgetRef {
    fn from(k: WidgetKind) -> Self {
        WidgetRef::Kind(k)
    }
}

impl From<&str> for WidgetRef {
    fn from(n: &str) -> Self {
        WidgetRef::Name(n.to_owned())
    }
}

/// Layout direction for containers and sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    Horizontal,
    #[default]
    Vertical,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(Orientation::Horizontal),
            "vertical" => Ok(Orientation::Vertical),
            other => Err(format!(
                "{other:?} is not a valid orientation (expected \"horizontal\" or \"vertical\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_lookup_is_exact() {
        assert_eq!(
            WidgetKind::from_name("FloatSlider").unwrap(),
            WidgetKind::FloatSlider
        );
        assert!(matches!(
            WidgetKind::from_name("floatslider"),
            Err(Error::UnknownWidgetName(_))
        ));
    }

    #[test]
    fn capability_classes_do_not_overlap_unexpectedly() {
        for kind in ALL_KINDS.iter().copied() {
            if kind.is_ranged() || kind.is_categorical() {
                assert!(kind.has_value(), "{kind} should carry a value");
            }
            if kind.is_button() {
                assert!(kind.has_text(), "{kind} should have a caption");
            }
        }
    }

    #[test]
    fn checkbox_is_a_value_widget_not_a_button() {
        assert!(WidgetKind::CheckBox.has_value());
        assert!(!WidgetKind::CheckBox.is_button());
        assert!(WidgetKind::CheckBox.has_text());
    }

    #[test]
    fn widget_ref_resolution() {
        assert_eq!(
            WidgetRef::from("Slider").resolve().unwrap(),
            WidgetKind::Slider
        );
        assert_eq!(
            WidgetRef::Kind(WidgetKind::Table).resolve().unwrap(),
            WidgetKind::Table
        );
        assert!(WidgetRef::from("Sliderr").resolve().is_err());
    }
}
