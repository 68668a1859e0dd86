//! Domain-specific errors for the escrow store.
//!
//! Contains error variants for common failure cases like:
//! - Stored data that is not JSON or does not match the escrow shape
//! - Rejected create input (missing fields, non-positive amount)
//! - Status transitions without an active escrow or to an unknown status
//! - Failures of the underlying storage medium
//!
//! Every variant is `Clone` so the last failure can be kept in the
//! observable [`EscrowState`](crate::EscrowState).

use rust_decimal::Decimal;
use thiserror::Error;

use crate::dto::EscrowStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid escrow data format")]
    InvalidFormat,

    #[error("Invalid escrow data structure: {0}")]
    InvalidStructure(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Amount must be a positive number")]
    InvalidAmount,

    #[error("Amount {0} has more precision than can be stored")]
    AmountPrecision(Decimal),

    #[error("No active escrow transaction")]
    NoActiveEscrow,

    #[error("Invalid escrow status: {0}")]
    InvalidStatus(String),

    #[error("Cannot move escrow from {from} to {to}")]
    TransitionNotAllowed {
        from: EscrowStatus,
        to: EscrowStatus,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to serialize escrow: {0}")]
    Serialization(String),
}

/// Failures of a [`Storage`](crate::Storage) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded ({needed} bytes needed, quota is {quota})")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_names() {
        let err = Error::MissingFields(vec!["buyerId", "amount"]);
        assert_eq!(err.to_string(), "Missing required fields: buyerId, amount");
    }

    #[test]
    fn test_storage_error_converts() {
        let err: Error = StorageError::Unavailable("disabled".into()).into();
        assert_eq!(err.to_string(), "Storage error: storage unavailable: disabled");
    }

    #[test]
    fn test_transition_message_uses_wire_names() {
        let err = Error::TransitionNotAllowed {
            from: EscrowStatus::Refunded,
            to: EscrowStatus::InEscrow,
        };
        assert_eq!(err.to_string(), "Cannot move escrow from refunded to in_escrow");
    }
}
