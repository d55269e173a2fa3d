//! Stores: one model's live state, its actions and its subscribers.
//!
//! A [`Model`] describes a named unit of state and the [`Action`]s allowed to
//! change it. A [`Store`] owns that state at runtime, runs dispatched actions
//! and notifies its subscribers.

mod action;
mod model;
mod store;

pub use action::{Action, BoxFuture, Draft};
pub use model::{check_models, Model};
pub use store::{Dispatch, Listener, Store, Subscription};

/// The live key-value state of a store.
pub type State = serde_json::Map<String, serde_json::Value>;
