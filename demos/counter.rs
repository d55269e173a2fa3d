//! Two consumers sharing one counter store

use serde_json::{json, Value};
use shared_store::registry::Registry;
use shared_store::{Action, Binding, Model, Provider};

fn main() {
    println!("=== Shared counter ===\n");

    let registry = Registry::new();
    let model = Model::new("counter", json!({ "count": 0, "label": "clicks" }))
        .action(
            "increment",
            Action::sync(|by, state| {
                let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
                let by = by.as_i64().unwrap_or(1);
                state.insert("count".to_string(), json!(count + by));
                Ok(())
            }),
        )
        .action(
            "rename",
            Action::sync(|label, state| {
                state.insert("label".to_string(), label);
                Ok(())
            }),
        );
    let provider = Provider::mount(&registry, vec![model]).expect("valid model");

    // Each consumer only hears about the field it selects
    let count = Binding::new(
        &registry,
        "counter",
        |state| state["count"].clone(),
        |count| println!("   [count view] re-render with {}", count),
    )
    .expect("counter is mounted");
    let _label = Binding::new(
        &registry,
        "counter",
        |state| state["label"].clone(),
        |label| println!("   [label view] re-render with {}", label),
    )
    .expect("counter is mounted");

    println!("1. Incrementing twice");
    let _ = count.dispatch("increment", json!(1)).expect("known action");
    let _ = count.dispatch("increment", json!(2)).expect("known action");

    println!("\n2. Renaming (only the label view wakes up)");
    let _ = count.dispatch("rename", json!("taps")).expect("known action");

    println!("\n3. Renaming to the same label (nobody wakes up)");
    let _ = count.dispatch("rename", json!("taps")).expect("known action");

    println!("\nFinal count: {}", count.value());

    provider.unmount();
    println!("Mounted after unmount: {:?}", registry.names());
}
