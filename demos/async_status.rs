//! Tracking an asynchronous action through its status record

use serde_json::json;
use shared_store::registry::Registry;
use shared_store::{bind_status, Action, ActionError, Binding, Model, Provider};
use std::time::Duration;

#[tokio::main]
async fn main() {
    println!("=== Async action status ===\n");

    let registry = Registry::new();
    let model = Model::new("profile", json!({ "name": null }))
        .action(
            "load",
            Action::future(|name, draft| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                draft.set("name", name);
                Ok(())
            }),
        )
        .action(
            "save",
            Action::future(|_, _| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(ActionError::new("server rejected the profile"))
            }),
        );
    let _provider = Provider::mount(&registry, vec![model]).expect("valid model");

    let _load_status = bind_status(&registry, "profile/load", |status| {
        println!("   [load status] {:?}", status);
    })
    .expect("status store is mounted");
    let save_status = bind_status(&registry, "profile/save", |status| {
        println!("   [save status] {:?}", status);
    })
    .expect("status store is mounted");
    let name = Binding::new(
        &registry,
        "profile",
        |state| state["name"].clone(),
        |name| println!("   [profile view] name is now {}", name),
    )
    .expect("profile is mounted");

    println!("1. Loading");
    name.dispatch("load", json!("Ada")).expect("known action").await;

    println!("\n2. Saving (fails)");
    name.dispatch("save", json!(null)).expect("known action").await;

    println!("\nLast save error: {:?}", save_status.value().error);
}
