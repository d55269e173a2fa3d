//! # Shared Store
//!
//! Named, shared state containers that independent consumers read and update
//! through named actions.
//!
//! ## Stores (the engine)
//!
//! - [`Model`] - a named state object plus the [`Action`]s that may change it
//! - [`Store`] - owns one model's live state, runs dispatched actions and
//!   notifies subscribers
//! - [`registry::Registry`] - finds stores by model name
//!
//! ## Status tracking
//!
//! Every asynchronous action dispatch is tracked in a reserved store named
//! [`STATUS_MODEL_NAME`], keyed by `"model/action"`, as a [`Status`] record
//! with `pending` and `error` fields.
//!
//! ## Bindings (the consumer side)
//!
//! - [`Provider`] - mounts a list of models into a registry and unmounts them on drop
//! - [`Binding`] - caches a selected value and calls back only when it changes
//!   under [`loose_equal`]
//!
//! ```
//! use serde_json::json;
//! use shared_store::registry::Registry;
//! use shared_store::{use_store_with, Action, Model, Provider};
//!
//! Registry::scope(|| {
//!     let _provider = Provider::mount_current(vec![Model::new("modelA", json!({ "a": 0 })).action(
//!         "addA",
//!         Action::sync(|value, state| {
//!             state.insert("a".to_string(), value);
//!             Ok(())
//!         }),
//!     )])
//!     .unwrap();
//!
//!     let a = use_store_with("modelA", |state| state["a"].clone(), |_| {}).unwrap();
//!     let _ = a.dispatch("addA", json!(1)).unwrap();
//!     assert_eq!(a.value(), json!(1));
//! });
//! ```

pub mod binding;
pub mod error;
pub mod registry;
pub mod status;
pub mod store;
pub mod utils;

// Re-export main types for convenience
pub use binding::{bind_status, use_status, use_store, use_store_with, Binding, Dispatcher, Provider};
pub use error::{ActionError, StoreError};
pub use status::{Status, ABANDONED_ERROR, STATUS_MODEL_NAME};
pub use store::{Action, Dispatch, Draft, Model, State, Store, Subscription};
pub use utils::loose_equal;
