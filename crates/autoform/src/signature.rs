//! The signature/container bridge.
//!
//! [`MagicSignature`] is a declarative description of a callable's
//! parameters. It converts to a [`Container`] of widgets (one per
//! parameter) and back; the round trip preserves names, annotations and
//! defaults. Converting back reorders parameters only when required:
//! widgets can be rearranged freely in the gui, but a signature must not
//! place a defaulted parameter before a required one, so the reverse
//! direction stably sorts required parameters first when that rule would
//! otherwise break.

use crate::backend::BackendFactory;
use crate::error::{Error, Result};
use crate::field::UiField;
use crate::registry::TypeRegistry;
use crate::types::{TypeHint, Value};
use crate::widget::{create_widget_with, Container, Orientation};

/// How a parameter may be supplied at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterKind {
    PositionalOnly,
    #[default]
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

/// One parameter of a [`MagicSignature`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub default: Option<Value>,
    pub annotation: Option<TypeHint>,
    pub options: UiField,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::default(),
            default: None,
            annotation: None,
            options: UiField::default(),
        }
    }

    pub fn kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn annotation(mut self, annotation: TypeHint) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn options(mut self, options: UiField) -> Self {
        self.options = options;
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A callable's parameter list plus its return annotation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MagicSignature {
    parameters: Vec<Parameter>,
    return_annotation: Option<TypeHint>,
}

impl MagicSignature {
    pub fn builder() -> SignatureBuilder {
        SignatureBuilder {
            signature: MagicSignature::default(),
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn return_annotation(&self) -> Option<&TypeHint> {
        self.return_annotation.as_ref()
    }

    /// Merge per-parameter gui options into the signature.
    ///
    /// Option keys must name actual parameters; unknown keys are an error
    /// rather than a silent no-op. Supplied options win over options the
    /// parameters already carry.
    pub fn with_gui_options(mut self, gui_options: &[(String, UiField)]) -> Result<Self> {
        let unknown: Vec<String> = gui_options
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| self.parameter(name).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(Error::UnknownParameters { keys: unknown });
        }
        for (name, options) in gui_options {
            if let Some(param) = self.parameters.iter_mut().find(|p| p.name == *name) {
                param.options = param.options.merged_with(options);
            }
        }
        Ok(self)
    }

    /// Build one widget per parameter, in order, inside a fresh container.
    ///
    /// Unresolvable parameters become hidden placeholders; they still
    /// occupy their slot and can be satisfied with a bound value or a call
    /// override.
    pub fn to_container(
        &self,
        registry: &TypeRegistry,
        factory: &dyn BackendFactory,
        layout: Orientation,
        labels: bool,
    ) -> Result<Container> {
        let container = Container::new(layout, labels)?;
        for param in &self.parameters {
            let widget = create_widget_with(
                registry,
                factory,
                &param.name,
                param.default.as_ref(),
                param.annotation.as_ref(),
                &param.options,
                false,
            )?;
            widget.set_param_kind(param.kind);
            container.push(&widget)?;
        }
        Ok(container)
    }

    /// Recover a signature from a container's current state.
    ///
    /// Gui-only and unnamed widgets are skipped. Parameters are stably
    /// reordered (required first) only when a defaulted parameter would
    /// otherwise precede a required one.
    pub fn from_container(container: &Container) -> Self {
        let mut parameters: Vec<Parameter> = container
            .children()
            .into_iter()
            .filter(|w| !w.gui_only() && !w.name().is_empty())
            .map(|w| Parameter {
                name: w.name(),
                kind: w.param_kind(),
                default: w.value().ok(),
                annotation: w.annotation(),
                options: UiField::default(),
            })
            .collect();

        let violates = parameters
            .windows(2)
            .any(|pair| pair[0].default.is_some() && pair[1].default.is_none());
        if violates {
            parameters.sort_by_key(|p| p.default.is_some());
        }

        Self {
            parameters,
            return_annotation: None,
        }
    }

    pub fn with_return_annotation(mut self, annotation: Option<TypeHint>) -> Self {
        self.return_annotation = annotation;
        self
    }
}

impl Container {
    /// The signature this container currently represents.
    pub fn to_signature(&self) -> MagicSignature {
        MagicSignature::from_container(self)
    }
}

/// Builds a [`MagicSignature`] parameter by parameter.
pub struct SignatureBuilder {
    signature: MagicSignature,
}

impl SignatureBuilder {
    pub fn param(mut self, parameter: Parameter) -> Self {
        self.signature.parameters.push(parameter);
        self
    }

    pub fn returns(mut self, annotation: TypeHint) -> Self {
        self.signature.return_annotation = Some(annotation);
        self
    }

    /// Finish, validating that parameter names are unique.
    pub fn build(self) -> Result<MagicSignature> {
        for (i, param) in self.signature.parameters.iter().enumerate() {
            if self.signature.parameters[..i]
                .iter()
                .any(|p| p.name == param.name)
            {
                return Err(Error::DuplicateName(param.name.clone()));
            }
        }
        Ok(self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackendFactory;
    use crate::field::OptionValue;
    use crate::widget::WidgetKind;

    fn simple_signature() -> MagicSignature {
        MagicSignature::builder()
            .param(Parameter::new("count").annotation(TypeHint::Int).default(3))
            .param(Parameter::new("message").annotation(TypeHint::Str))
            .param(Parameter::new("verbose").annotation(TypeHint::Bool).default(false))
            .returns(TypeHint::Str)
            .build()
            .unwrap()
    }

    fn to_container(sig: &MagicSignature) -> Container {
        sig.to_container(
            &TypeRegistry::new(),
            &MockBackendFactory::new(),
            Orientation::Vertical,
            true,
        )
        .unwrap()
    }

    #[test]
    fn container_mirrors_the_signature() {
        let sig = simple_signature();
        let container = to_container(&sig);

        assert_eq!(container.len(), 3);
        let count = container.widget("count").unwrap();
        assert_eq!(count.kind(), WidgetKind::SpinBox);
        assert_eq!(count.value().unwrap(), Value::Int(3));
        assert_eq!(
            container.widget("message").unwrap().kind(),
            WidgetKind::LineEdit
        );
        assert_eq!(
            container.widget("verbose").unwrap().kind(),
            WidgetKind::CheckBox
        );
    }

    #[test]
    fn round_trip_preserves_names_annotations_defaults() {
        let sig = simple_signature();
        let container = to_container(&sig);
        let back = container.to_signature();

        let names: Vec<&str> = back.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["count", "message", "verbose"]);
        assert_eq!(back.parameter("count").unwrap().default, Some(Value::Int(3)));
        assert_eq!(
            back.parameter("count").unwrap().annotation,
            Some(TypeHint::Int)
        );
        assert_eq!(
            back.parameter("message").unwrap().default,
            Some(Value::Str(String::new()))
        );
    }

    #[test]
    fn gui_options_must_name_real_parameters() {
        let sig = simple_signature();
        let err = sig
            .clone()
            .with_gui_options(&[("mesage".into(), UiField::default())])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownParameters { keys } if keys == ["mesage"]));

        let options = UiField::from_pairs([("widget_type", OptionValue::from("Slider"))]).unwrap();
        let sig = sig.with_gui_options(&[("count".into(), options)]).unwrap();
        let container = to_container(&sig);
        assert_eq!(container.widget("count").unwrap().kind(), WidgetKind::Slider);
    }

    #[test]
    fn unresolvable_parameter_becomes_hidden_placeholder() {
        let sig = MagicSignature::builder()
            .param(Parameter::new("mystery"))
            .build()
            .unwrap();
        let container = to_container(&sig);
        let w = container.widget("mystery").unwrap();
        assert_eq!(w.kind(), WidgetKind::Empty);
        assert!(!w.visible());
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let err = MagicSignature::builder()
            .param(Parameter::new("x"))
            .param(Parameter::new("x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName(n) if n == "x"));
    }

    #[test]
    fn reorder_happens_only_when_needed() {
        // A container whose widgets were rearranged: a defaulted widget now
        // precedes the required placeholder.
        let container = Container::new(Orientation::Vertical, true).unwrap();

        let defaulted = crate::widget::Widget::of_kind(WidgetKind::SpinBox).unwrap();
        defaulted.set_name("b");
        defaulted.set_value(Value::Int(1)).unwrap();
        container.push(&defaulted).unwrap();

        let required = crate::widget::Widget::of_kind(WidgetKind::Empty).unwrap();
        required.set_name("a");
        container.push(&required).unwrap();

        let sig = container.to_signature();
        let names: Vec<&str> = sig.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"], "required parameter moved first");

        // No violation, no reorder: original order kept even though it is
        // not alphabetical.
        let ordered = Container::new(Orientation::Vertical, true).unwrap();
        let z = crate::widget::Widget::of_kind(WidgetKind::SpinBox).unwrap();
        z.set_name("z");
        z.set_value(Value::Int(1)).unwrap();
        let y = crate::widget::Widget::of_kind(WidgetKind::SpinBox).unwrap();
        y.set_name("y");
        y.set_value(Value::Int(2)).unwrap();
        ordered.push(&z).unwrap();
        ordered.push(&y).unwrap();
        let names: Vec<String> = ordered
            .to_signature()
            .parameters()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, ["z", "y"]);
    }

    #[test]
    fn gui_only_widgets_are_not_parameters() {
        let sig = simple_signature();
        let container = to_container(&sig);

        let button = crate::widget::Widget::of_kind(WidgetKind::PushButton).unwrap();
        button.set_name("call_button");
        button.set_gui_only(true);
        container.push(&button).unwrap();

        assert_eq!(container.to_signature().parameters().len(), 3);
    }
}
