//! Name-to-store registry.
//!
//! Consumers find stores by model name without being handed a reference, so
//! every mounted store lives in a [`Registry`] together with its
//! [`StoreContext`] handle.

mod registry;

pub use registry::{Registry, StoreContext};
