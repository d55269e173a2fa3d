//! Automatic pending/error tracking for asynchronous actions.
//!
//! Every provider mounts one extra store under [`STATUS_MODEL_NAME`]. Its
//! state maps `"model/action"` keys to [`Status`] records.

mod status;

pub(crate) use status::{ensure_status, mark_pending, read_status, settle};
pub use status::{
    check_status_key, status_key, status_model, Status, ABANDONED_ERROR, STATUS_MODEL_NAME,
};
