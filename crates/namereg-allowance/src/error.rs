//! Error types for the allowance service.

use thiserror::Error;

/// Errors that can occur during allowance operations.
#[derive(Debug, Error)]
pub enum AllowanceError {
    /// Caller may not issue or revoke grants.
    #[error("not the allowance administrator: {0}")]
    NotAdministrator(String),

    /// Caller holds no usable waiver unit.
    #[error("no allowance remaining for {0}")]
    NoAllowance(String),

    /// Grant not found.
    #[error("grant not found: {0}")]
    GrantNotFound(String),

    /// Grant has already been revoked.
    #[error("grant already revoked: {0}")]
    GrantRevoked(String),

    /// Invalid grant payload.
    #[error("invalid grant payload: {0}")]
    InvalidGrant(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for allowance operations.
pub type Result<T> = std::result::Result<T, AllowanceError>;
