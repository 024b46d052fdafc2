// error.rs
//
// Errors surfaced by the animator. Request-time validation failures are
// reported before any state changes; listener failures abort the step that
// dispatched them.

use thiserror::Error;

use crate::api::types::{FieldPath, HostHandle};

/// Everything that can go wrong when driving animations.
#[derive(Error, Debug)]
pub enum AnimatorError {
    /// The handle was never registered, was unregistered, or its host was dropped.
    #[error("unknown or dropped host {0:?}")]
    UnknownHost(HostHandle),

    /// The target names a leaf the host does not have, or one that is not numeric.
    #[error("host {host:?} has no numeric field `{field}`")]
    MissingField { host: HostHandle, field: FieldPath },

    /// A target leaf is NaN or infinite.
    #[error("target for `{field}` is not finite: {value}")]
    InvalidTarget { field: FieldPath, value: f64 },

    /// Tween durations must be finite and non-negative.
    #[error("tween duration must be a non-negative number, got {0}")]
    InvalidDuration(f64),

    /// A subscribed listener returned an error during dispatch.
    #[error("listener failed: {0:#}")]
    Listener(anyhow::Error),

    #[error("invalid animator config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnimatorError>;
