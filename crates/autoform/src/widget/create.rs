//! Widget construction from a value, an annotation and options.

use autoform_core::logging::targets;

use crate::backend::BackendFactory;
use crate::error::Result;
use crate::field::UiField;
use crate::registry::{global_registry, TypeRegistry};
use crate::types::{TypeHint, Value};
use crate::widget::Widget;

/// Create a widget for one field using the global registry and the default
/// backend.
///
/// Resolution failure falls back to a hidden placeholder widget; use
/// [`create_widget_with`] to surface resolution errors instead.
pub fn create_widget(
    name: &str,
    value: Option<&Value>,
    annotation: Option<&TypeHint>,
    options: &UiField,
) -> Result<Widget> {
    create_widget_with(
        global_registry(),
        crate::backend::default_factory().as_ref(),
        name,
        value,
        annotation,
        options,
        false,
    )
}

/// The fully explicit form of [`create_widget`].
pub fn create_widget_with(
    registry: &TypeRegistry,
    factory: &dyn BackendFactory,
    name: &str,
    value: Option<&Value>,
    annotation: Option<&TypeHint>,
    options: &UiField,
    raise_on_unknown: bool,
) -> Result<Widget> {
    let (kind, resolved) =
        registry.get_widget_class(value, annotation, options, false, raise_on_unknown)?;
    tracing::debug!(
        target: targets::WIDGET,
        name,
        widget = %kind,
        "creating widget"
    );

    let widget = Widget::new(kind, factory.create(kind)?)?;
    widget.set_name(resolved.name.as_deref().unwrap_or(name));
    widget.set_annotation(annotation.cloned());
    apply_options(&widget, &resolved)?;

    // The initial value: an explicit value wins over a declared default.
    // Bound fields skip it, their gui state is shadowed anyway.
    if widget.bind().is_none() && kind.has_value() {
        if let Some(initial) = value.cloned().or_else(|| resolved.effective_default()) {
            widget.set_value(initial)?;
        }
    }

    Ok(widget)
}

fn apply_options(widget: &Widget, options: &UiField) -> Result<()> {
    let kind = widget.kind();

    if let Some(label) = &options.label {
        widget.set_label(label.clone());
    }
    if let Some(description) = &options.description {
        widget.set_tooltip(Some(description));
    }
    if let Some(nullable) = options.nullable {
        widget.set_nullable(nullable);
    }
    if let Some(gui_only) = options.gui_only {
        widget.set_gui_only(gui_only);
    }
    widget.set_bind(options.bind.clone());

    if kind.is_ranged() {
        // Exclusive bounds stand in for plain ones when only they are given.
        if let Some(minimum) = options.minimum.or(options.exclusive_minimum) {
            widget.set_minimum(minimum)?;
        }
        if let Some(maximum) = options.maximum.or(options.exclusive_maximum) {
            widget.set_maximum(maximum)?;
        }
        if let Some(step) = options.multiple_of {
            widget.set_step(step)?;
        }
    }

    if kind.is_categorical() {
        if let Some(choices) = &options.choices {
            widget.set_choices(choices.clone())?;
        }
    }

    if kind.has_text() {
        let caption = options.label.clone().unwrap_or_else(|| widget.label());
        widget.set_text(&caption)?;
    }

    if let Some(enabled) = options.enabled {
        widget.set_enabled(enabled);
    }
    if let Some(visible) = options.visible {
        widget.set_visible(visible);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackendFactory;
    use crate::field::{Bind, OptionValue};
    use crate::types::EnumType;
    use crate::widget::WidgetKind;

    fn create(
        name: &str,
        value: Option<Value>,
        annotation: Option<TypeHint>,
        options: UiField,
    ) -> Widget {
        create_widget_with(
            &TypeRegistry::new(),
            &MockBackendFactory::new(),
            name,
            value.as_ref(),
            annotation.as_ref(),
            &options,
            true,
        )
        .unwrap()
    }

    #[test]
    fn creates_and_seeds_a_spin_box() {
        let w = create("count", Some(Value::Int(3)), None, UiField::default());
        assert_eq!(w.kind(), WidgetKind::SpinBox);
        assert_eq!(w.name(), "count");
        assert_eq!(w.value().unwrap(), Value::Int(3));
    }

    #[test]
    fn range_options_are_applied_before_the_value() {
        let options = UiField::from_pairs([
            ("min", OptionValue::from(1)),
            ("max", OptionValue::from(5)),
            ("step", OptionValue::from(2)),
        ])
        .unwrap();
        let w = create("n", Some(Value::Int(3)), Some(TypeHint::Int), options);
        assert_eq!(w.minimum().unwrap(), 1.0);
        assert_eq!(w.maximum().unwrap(), 5.0);
        assert_eq!(w.step().unwrap(), 2.0);
        assert_eq!(w.value().unwrap(), Value::Int(3));
    }

    #[test]
    fn enum_annotation_seeds_choices_and_selection() {
        let mode = EnumType::new("Mode", ["fast", "slow"]);
        let fast = mode.member("fast").unwrap();
        let w = create(
            "mode",
            Some(fast.clone()),
            Some(TypeHint::Enum(mode)),
            UiField::default(),
        );
        assert_eq!(w.kind(), WidgetKind::ComboBox);
        assert_eq!(w.choices().unwrap().len(), 2);
        assert_eq!(w.value().unwrap(), fast);
    }

    #[test]
    fn bound_fields_skip_the_initial_value() {
        let options = UiField::new().with_bind(Bind::Value(Value::Int(42)));
        let w = create("n", Some(Value::Int(1)), Some(TypeHint::Int), options);
        assert_eq!(w.value().unwrap(), Value::Int(42));
        // Gui state keeps the backend default, untouched by the seed value.
        assert_eq!(
            w.native().as_value().map(|v| v.value()),
            Some(Value::Int(0))
        );
    }

    #[test]
    fn empty_placeholder_is_hidden() {
        let w = create_widget_with(
            &TypeRegistry::new(),
            &MockBackendFactory::new(),
            "ghost",
            None,
            None,
            &UiField::default(),
            false,
        )
        .unwrap();
        assert_eq!(w.kind(), WidgetKind::Empty);
        assert!(!w.visible());
    }

    #[test]
    fn label_and_tooltip_options_apply() {
        let options = UiField::from_pairs([
            ("label", OptionValue::from("Frames")),
            ("tooltip", OptionValue::from("how many frames")),
        ])
        .unwrap();
        let w = create("frame_count", None, Some(TypeHint::Int), options);
        assert_eq!(w.label(), "Frames");
        assert_eq!(w.tooltip().as_deref(), Some("how many frames"));
    }

    #[test]
    fn button_caption_comes_from_the_label() {
        let options = UiField::new().with_widget(WidgetKind::PushButton);
        let w = create("run_it", None, None, options);
        assert_eq!(w.text().unwrap(), "run it");
    }
}
