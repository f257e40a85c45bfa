//! Error types for the motion engine.
//!
//! None of these errors are fatal. Every operation that returns one has
//! already logged a warning and left its state untouched, so callers are
//! free to ignore the result.

use thiserror::Error;

use crate::behaviour::TransitionPhase;

/// Errors reported by the driver, the modal state machine and config loading.
#[derive(Debug, Error)]
pub enum MotionError {
    /// A target was registered after the driver was torn down.
    #[error("driver has been destroyed; registration of `{0}` ignored")]
    DriverDestroyed(String),

    /// `open` was called while another modal occupies the single slot.
    #[error("cannot open modal: `{active}` is {phase}")]
    ModalBusy {
        /// Id of the modal currently holding the slot.
        active: String,
        /// Phase of that modal when the request arrived.
        phase: TransitionPhase,
    },

    /// `close` was called from a phase other than `open`.
    #[error("cannot close modal while {phase}")]
    InvalidClose {
        /// Phase at the time of the request.
        phase: TransitionPhase,
    },

    /// A transition-completion waiter was dropped before it fired.
    #[error("transition wait was cancelled")]
    TransitionCancelled,

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration parsed but holds out-of-range values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MotionError>;
