//! Error types for the action lifecycle and reconciliation

use crate::action::TransactionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an async operation failed
///
/// Carried as the payload of `Failed` actions, so it is `Clone` and serializable
/// rather than wrapping source errors. Covers both failures reported by the
/// external call and failures while preparing it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchError {
    /// The request could not be built from the command
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A URL template placeholder had no matching payload field
    #[error("Parameters missing when binding variables to url template {template}: {missing:?}")]
    MissingPathVariable {
        /// The template being bound
        template: String,
        /// Placeholders left unbound
        missing: Vec<String>,
    },

    /// The command payload could not be serialized
    #[error("Failed to serialize payload: {0}")]
    Serialization(String),

    /// The call never produced a response (connection refused, reset, ...)
    #[error("Transport failed: {0}")]
    Transport(String),

    /// The remote answered with a non-success status
    #[error("Remote returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The remote answered with a body we cannot interpret
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The response body did not match the command's response type
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// No answer within the configured timeout (milliseconds)
    #[error("Call timed out after {0} ms")]
    Timeout(u64),
}

impl DispatchError {
    /// Whether the failure happened before any call was made
    #[must_use]
    pub const fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::MissingPathVariable { .. } | Self::Serialization(_)
        )
    }
}

/// Protocol violations detected by the reconciler
///
/// These indicate a caller bug (duplicate resolution, id collision, or actions
/// fed to the reconciler without going through the lifecycle dispatcher), not an
/// operation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A resolution arrived for a transaction that is not pending
    #[error("No pending transaction {transaction_id} for {phase} action {kind}")]
    UnknownTransaction {
        /// The unmatched transaction
        transaction_id: TransactionId,
        /// Kind of the offending action
        kind: &'static str,
        /// Phase of the offending action
        phase: &'static str,
    },

    /// A start arrived for a transaction that is already pending
    #[error("Transaction {transaction_id} is already pending ({kind})")]
    DuplicateTransaction {
        /// The colliding transaction
        transaction_id: TransactionId,
        /// Kind of the offending action
        kind: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_errors_are_classified() {
        assert!(DispatchError::InvalidRequest("bad".into()).is_construction_error());
        assert!(DispatchError::Serialization("bad".into()).is_construction_error());
        assert!(
            DispatchError::MissingPathVariable {
                template: "/todos/{id}".into(),
                missing: vec!["id".into()],
            }
            .is_construction_error()
        );
        assert!(!DispatchError::Timeout(10).is_construction_error());
        assert!(
            !DispatchError::Status {
                status: 500,
                body: String::new()
            }
            .is_construction_error()
        );
    }

    #[test]
    fn reconcile_error_messages_name_the_transaction() {
        let error = ReconcileError::UnknownTransaction {
            transaction_id: TransactionId::new(9),
            kind: "ADD",
            phase: "succeeded",
        };
        assert_eq!(
            error.to_string(),
            "No pending transaction txn-9 for succeeded action ADD"
        );
    }
}
