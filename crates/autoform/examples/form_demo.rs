//! Drives a function gui against the headless mock backend: builds the
//! form from a signature, edits widgets, and calls the function.
//!
//! Run with `RUST_LOG=autoform=trace` to watch the resolution and signal
//! traces.

use autoform::function_gui::{arg, CallArgs, FunctionGuiBuilder};
use autoform::signature::{MagicSignature, Parameter};
use autoform::types::{TypeHint, Value};

fn main() -> Result<(), autoform::Error> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let signature = MagicSignature::builder()
        .param(Parameter::new("width").annotation(TypeHint::Int).default(4))
        .param(Parameter::new("height").annotation(TypeHint::Int).default(5))
        .returns(TypeHint::Int)
        .build()?;

    let gui = FunctionGuiBuilder::new("area", signature, |args: &CallArgs| {
        let w = arg(args, "width").and_then(Value::as_i64).unwrap_or(0);
        let h = arg(args, "height").and_then(Value::as_i64).unwrap_or(0);
        Value::Int(w * h)
    })
    .build()?;

    println!("defaults: area = {}", gui.call(&[])?);

    gui.widget("width").unwrap().set_value(Value::Int(10))?;
    gui.widget("height").unwrap().set_value(Value::Int(3))?;
    println!("after edits: area = {}", gui.call(&[])?);

    for child in gui.container().children() {
        println!("  {} = {:?}", child.name(), child.value().ok());
    }
    Ok(())
}
