//! Consumer-side bindings and the provider that mounts stores for them.

mod binding;
mod provider;

pub use binding::{bind_status, use_status, use_store, use_store_with, Binding, Dispatcher};
pub use provider::Provider;
