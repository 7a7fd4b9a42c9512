//! End-to-end workflows through the public API: signature to gui to call,
//! registrations reaching built guis, and model binding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use autoform::backend::MockBackendFactory;
use autoform::binding::{bind_gui_to_instance, unbind_gui_from_instance, GuiModel};
use autoform::field::{ChoicesSource, OptionValue, UiField};
use autoform::function_gui::{arg, CallArgs, FunctionGuiBuilder};
use autoform::registry::{Registration, TypeRegistry};
use autoform::signature::{MagicSignature, Parameter};
use autoform::types::{CustomType, EnumType, TypeHint, Value};
use autoform::widget::{create_widget_with, Orientation, WidgetKind};

fn local_registry() -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::new())
}

#[test]
fn test_signature_to_gui_to_call() {
    let signature = MagicSignature::builder()
        .param(Parameter::new("base").annotation(TypeHint::Int).default(10))
        .param(Parameter::new("exponent").annotation(TypeHint::Int).default(2))
        .returns(TypeHint::Int)
        .build()
        .unwrap();

    let gui = FunctionGuiBuilder::new(
        "power",
        signature,
        |args: &CallArgs| {
            let base = arg(args, "base").and_then(Value::as_i64).unwrap_or(0);
            let exp = arg(args, "exponent").and_then(Value::as_i64).unwrap_or(0) as u32;
            Value::Int(base.pow(exp))
        },
    )
    .registry(local_registry())
    .build()
    .unwrap();

    assert_eq!(gui.call(&[]).unwrap(), Value::Int(100));

    gui.widget("base").unwrap().set_value(Value::Int(3)).unwrap();
    gui.widget("exponent").unwrap().set_value(Value::Int(4)).unwrap();
    assert_eq!(gui.call(&[]).unwrap(), Value::Int(81));

    // The gui still knows what signature it represents.
    let back = gui.signature();
    assert_eq!(back.parameter("base").unwrap().default, Some(Value::Int(3)));
    assert_eq!(back.return_annotation(), Some(&TypeHint::Int));
}

#[test]
fn test_registration_reaches_built_guis() {
    let registry = local_registry();
    let options = UiField::from_pairs([
        ("min", OptionValue::from(0)),
        ("max", OptionValue::from(100)),
    ])
    .unwrap();
    registry
        .register(
            &TypeHint::Int,
            Registration::widget(WidgetKind::Slider).with_options(options),
        )
        .unwrap();

    let signature = MagicSignature::builder()
        .param(Parameter::new("volume").annotation(TypeHint::Int).default(50))
        .build()
        .unwrap();
    let gui = FunctionGuiBuilder::new("mix", signature, |_| Value::Null)
        .registry(registry)
        .build()
        .unwrap();

    let volume = gui.widget("volume").unwrap();
    assert_eq!(volume.kind(), WidgetKind::Slider);
    assert_eq!(volume.minimum().unwrap(), 0.0);
    assert_eq!(volume.maximum().unwrap(), 100.0);
    assert_eq!(volume.value().unwrap(), Value::Int(50));
}

#[test]
fn test_scoped_registration_is_undone_on_drop() {
    let registry = TypeRegistry::new();
    let factory = MockBackendFactory::new();
    let animal = TypeHint::Custom(CustomType::new("Animal"));

    {
        let _guard = registry
            .register_scoped(&animal, Registration::widget(WidgetKind::LineEdit))
            .unwrap();
        let (kind, _) = registry
            .get_widget_class(None, Some(&animal), &UiField::default(), false, true)
            .unwrap();
        assert_eq!(kind, WidgetKind::LineEdit);
    }

    // Outside the scope the type is unknown again.
    let err = registry
        .get_widget_class(None, Some(&animal), &UiField::default(), false, true)
        .unwrap_err();
    assert!(err.to_string().contains("Animal"));

    // And without raising, it degrades to a hidden placeholder widget.
    let w = create_widget_with(
        &registry,
        &factory,
        "pet",
        None,
        Some(&animal),
        &UiField::default(),
        false,
    )
    .unwrap();
    assert_eq!(w.kind(), WidgetKind::Empty);
    assert!(!w.visible());
}

#[test]
fn test_enum_parameter_drives_choices() {
    let color = EnumType::new("Color", ["red", "green", "blue"]);
    let green = color.member("green").unwrap();

    let signature = MagicSignature::builder()
        .param(
            Parameter::new("color")
                .annotation(TypeHint::Enum(color.clone()))
                .default(green.clone()),
        )
        .build()
        .unwrap();
    let gui = FunctionGuiBuilder::new("paint", signature, |args: &CallArgs| {
        arg(args, "color").cloned().unwrap_or(Value::Null)
    })
    .registry(local_registry())
    .build()
    .unwrap();

    let widget = gui.widget("color").unwrap();
    assert_eq!(widget.kind(), WidgetKind::ComboBox);
    assert_eq!(
        widget.choices().unwrap(),
        vec![
            color.member("red").unwrap(),
            green.clone(),
            color.member("blue").unwrap(),
        ]
    );
    assert_eq!(gui.call(&[]).unwrap(), green);

    widget.set_value(color.member("blue").unwrap()).unwrap();
    assert_eq!(gui.call(&[]).unwrap(), color.member("blue").unwrap());
}

#[test]
fn test_auto_call_gui_recomputes_on_edits() {
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    let signature = MagicSignature::builder()
        .param(Parameter::new("x").annotation(TypeHint::Int).default(0))
        .build()
        .unwrap();
    let gui = FunctionGuiBuilder::new(
        "track",
        signature,
        move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Value::Null
        },
    )
    .registry(local_registry())
    .auto_call(true)
    .build()
    .unwrap();

    gui.widget("x").unwrap().set_value(Value::Int(1)).unwrap();
    gui.widget("x").unwrap().set_value(Value::Int(2)).unwrap();
    // Unchanged value, no call.
    gui.widget("x").unwrap().set_value(Value::Int(2)).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_model_gui_round_trip() {
    let model = GuiModel::new(vec![
        UiField::named("threshold")
            .with_type(TypeHint::Float)
            .with_default(0.5),
        UiField::named("label")
            .with_type(TypeHint::Str)
            .with_default("sample"),
    ])
    .unwrap();

    let gui = model
        .build_widget(&TypeRegistry::new(), &MockBackendFactory::new())
        .unwrap();
    bind_gui_to_instance(&gui, &model, true);

    // Widget edit lands in the model.
    gui.widget("threshold")
        .unwrap()
        .set_value(Value::Float(0.9))
        .unwrap();
    assert_eq!(model.get("threshold"), Some(Value::Float(0.9)));

    // Model write lands in the widget.
    assert!(model.set("label", Value::from("renamed")));
    assert_eq!(
        gui.widget("label").unwrap().value().unwrap(),
        Value::from("renamed")
    );

    // After unbinding the two sides drift independently.
    unbind_gui_from_instance(&gui, &model);
    model.set("threshold", Value::Float(0.1));
    assert_eq!(
        gui.widget("threshold").unwrap().value().unwrap(),
        Value::Float(0.9)
    );
}

#[test]
fn test_container_edits_survive_signature_round_trip() {
    let signature = MagicSignature::builder()
        .param(Parameter::new("first").annotation(TypeHint::Str).default("a"))
        .param(Parameter::new("second").annotation(TypeHint::Int).default(1))
        .build()
        .unwrap();
    let container = signature
        .to_container(
            &TypeRegistry::new(),
            &MockBackendFactory::new(),
            Orientation::Vertical,
            true,
        )
        .unwrap();

    container
        .widget("second")
        .unwrap()
        .set_value(Value::Int(7))
        .unwrap();
    let moved = container.remove("first").unwrap();
    container.push(&moved).unwrap();

    let back = container.to_signature();
    let names: Vec<String> = back.parameters().iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, ["second", "first"], "gui order is preserved");
    assert_eq!(back.parameter("second").unwrap().default, Some(Value::Int(7)));
}

#[test]
fn test_choice_widgets_from_explicit_sources() {
    let factory = MockBackendFactory::new();
    let registry = TypeRegistry::new();

    let options = UiField::new().with_choices(ChoicesSource::Values(vec![
        Value::from("low"),
        Value::from("high"),
    ]));
    let single = create_widget_with(
        &registry, &factory, "level", None, None, &options, true,
    )
    .unwrap();
    assert_eq!(single.kind(), WidgetKind::ComboBox);
    // The first choice becomes the selection.
    assert_eq!(single.value().unwrap(), Value::from("low"));

    let rejected = single.set_value(Value::from("medium")).unwrap_err();
    assert!(rejected.to_string().contains("medium"));

    let mut multi_options = options;
    multi_options.allow_multiple = Some(true);
    let multi = create_widget_with(
        &registry, &factory, "levels", None, None, &multi_options, true,
    )
    .unwrap();
    assert_eq!(multi.kind(), WidgetKind::Select);
    multi
        .set_value(Value::List(vec![Value::from("low"), Value::from("high")]))
        .unwrap();
    assert_eq!(
        multi.value().unwrap(),
        Value::List(vec![Value::from("low"), Value::from("high")])
    );
}

#[test]
fn test_result_widget_and_return_callback_together() {
    let registry = local_registry();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    registry
        .register(
            &TypeHint::Str,
            Registration::return_callback(move |_, value, _| {
                seen_clone.lock().unwrap().push(value.clone());
            }),
        )
        .unwrap();

    let signature = MagicSignature::builder()
        .param(Parameter::new("name").annotation(TypeHint::Str).default("world"))
        .returns(TypeHint::Str)
        .build()
        .unwrap();
    let gui = FunctionGuiBuilder::new(
        "greet",
        signature,
        |args: &CallArgs| {
            let name = arg(args, "name").and_then(Value::as_str).unwrap_or_default();
            Value::Str(format!("hello {name}"))
        },
    )
    .registry(registry)
    .result_widget(true)
    .build()
    .unwrap();

    gui.call(&[]).unwrap();
    assert_eq!(
        gui.result_widget().unwrap().value().unwrap(),
        Value::from("hello world")
    );
    assert_eq!(*seen.lock().unwrap(), vec![Value::from("hello world")]);
}
