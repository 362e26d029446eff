//! # Escrow Error Types
//!
//! Structured error hierarchy for the escrow core. State machine rejections
//! name the operation, the current status, and the status it requires, so a
//! caller can report the failure without inspecting logs.
//!
//! Every error is a local validation failure detected before any mutation:
//! a failed operation leaves the escrow record exactly as it was.

use thiserror::Error;

use crate::escrow::EscrowStatus;

/// Errors arising from escrow operations.
#[derive(Error, Debug)]
pub enum EscrowError {
    /// No escrow exists under the given identifier.
    #[error("escrow {id} not found")]
    NotFound {
        /// The identifier that failed to resolve.
        id: String,
    },

    /// Operation attempted from a status that does not permit it.
    #[error("cannot {operation} in status {current}: requires {required}")]
    InvalidTransition {
        /// The attempted operation (e.g. "seller-confirm", "arbitrate").
        operation: &'static str,
        /// The escrow's status at the time of the attempt.
        current: EscrowStatus,
        /// The status the operation requires.
        required: EscrowStatus,
    },

    /// Malformed caller input, e.g. a winner outside {buyer, seller}.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid monetary amount string.
    #[error("invalid amount: \"{0}\"")]
    InvalidAmount(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = EscrowError::NotFound {
            id: "escrow:1234".to_string(),
        };
        assert!(format!("{err}").contains("escrow:1234"));
    }

    #[test]
    fn invalid_transition_display_names_both_statuses() {
        let err = EscrowError::InvalidTransition {
            operation: "buyer-confirm",
            current: EscrowStatus::Created,
            required: EscrowStatus::Pending,
        };
        let msg = format!("{err}");
        assert!(msg.contains("buyer-confirm"));
        assert!(msg.contains("CREATED"));
        assert!(msg.contains("PENDING"));
    }

    #[test]
    fn invalid_argument_display() {
        let err = EscrowError::InvalidArgument("winner must be buyer|seller".to_string());
        assert!(format!("{err}").contains("buyer|seller"));
    }

    #[test]
    fn invalid_amount_display() {
        let err = EscrowError::InvalidAmount("NaN".to_string());
        assert!(format!("{err}").contains("NaN"));
    }
}
