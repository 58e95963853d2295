//! Error types for the registry.

use namereg_allowance::AllowanceError;
use namereg_core::{Amount, CommitmentHash, Label, Timestamp, ValidationError};
use namereg_store::StoreError;
use thiserror::Error;

use crate::treasury::PayoutError;

/// Broad classes of registry failure.
///
/// Every class is final for the operation that raised it: nothing is
/// retried and nothing the operation touched survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad label or duration. Checked before any state is read.
    Validation,
    /// Missing, premature or stale commitment.
    Protocol,
    /// Name taken, not held by the caller, or in the wrong lifecycle state.
    Availability,
    /// Insufficient payment, failed refund or withdrawal, stray payment.
    Payment,
    /// Overflowing expiry, fee or counter.
    Arithmetic,
    /// The event journal or a collaborator outside the registry failed.
    Infrastructure,
}

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid label: {0}")]
    InvalidLabel(ValidationError),

    #[error("invalid duration {duration}: must be within 1..={max}")]
    InvalidDuration { duration: u32, max: u32 },

    #[error("cannot transfer to the current holder")]
    InvalidRecipient,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no commitment {0}")]
    NoCommitment(CommitmentHash),

    #[error("commitment {hash} is too fresh: usable from {usable_at}")]
    TooFresh {
        hash: CommitmentHash,
        usable_at: Timestamp,
    },

    #[error("commitment {hash} expired at {expired_at}")]
    CommitmentExpired {
        hash: CommitmentHash,
        expired_at: Timestamp,
    },

    #[error("name {0} is taken")]
    DomainTaken(Label),

    #[error("registering too fast: next registration allowed at sequence {next_allowed}")]
    TooFast { next_allowed: u64 },

    #[error("name {0} is not registered")]
    NameNotFound(Label),

    #[error("caller does not hold {0}")]
    NotHolder(Label),

    #[error("name {0} has expired")]
    NameExpired(Label),

    #[error("grace period for {0} is over; renewal is closed")]
    RenewalClosed(Label),

    #[error("{0} is in its grace period; only the holder may renew")]
    GraceRestricted(Label),

    #[error("{label} is not burnable until {burnable_at:?}")]
    NotBurnable {
        label: Label,
        /// `None` when the burn time is past the end of the clock.
        burnable_at: Option<Timestamp>,
    },

    #[error("insufficient payment: required {required}, offered {offered}")]
    InsufficientPayment { required: Amount, offered: Amount },

    #[error("refund failed: {0}")]
    RefundFailed(PayoutError),

    #[error("withdrawal failed: {0}")]
    WithdrawalFailed(PayoutError),

    #[error("nothing to withdraw")]
    NothingToWithdraw,

    #[error("caller is not the registry administrator")]
    NotAdministrator,

    #[error("direct payment of {0} rejected: value is only accepted by register and renew")]
    DirectPaymentRejected(Amount),

    #[error("allowance consume failed: {0}")]
    AllowanceConsumeFailed(AllowanceError),

    #[error("expiry overflow")]
    ExpiryOverflow,

    #[error("fee overflow")]
    FeeOverflow,

    #[error("token id space exhausted")]
    TokenSpaceExhausted,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("event journal conflict at sequence {seq}")]
    JournalConflict { seq: u64 },
}

impl RegistryError {
    /// The taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InvalidLabel(_)
            | RegistryError::InvalidDuration { .. }
            | RegistryError::InvalidRecipient
            | RegistryError::InvalidConfig(_) => ErrorKind::Validation,

            RegistryError::NoCommitment(_)
            | RegistryError::TooFresh { .. }
            | RegistryError::CommitmentExpired { .. }
            | RegistryError::TooFast { .. } => ErrorKind::Protocol,

            RegistryError::DomainTaken(_)
            | RegistryError::NameNotFound(_)
            | RegistryError::NotHolder(_)
            | RegistryError::NameExpired(_)
            | RegistryError::RenewalClosed(_)
            | RegistryError::GraceRestricted(_)
            | RegistryError::NotBurnable { .. }
            | RegistryError::NotAdministrator => ErrorKind::Availability,

            RegistryError::InsufficientPayment { .. }
            | RegistryError::RefundFailed(_)
            | RegistryError::WithdrawalFailed(_)
            | RegistryError::NothingToWithdraw
            | RegistryError::DirectPaymentRejected(_)
            | RegistryError::AllowanceConsumeFailed(_) => ErrorKind::Payment,

            RegistryError::ExpiryOverflow
            | RegistryError::FeeOverflow
            | RegistryError::TokenSpaceExhausted => ErrorKind::Arithmetic,

            RegistryError::Store(_) | RegistryError::JournalConflict { .. } => {
                ErrorKind::Infrastructure
            }
        }
    }
}

impl From<ValidationError> for RegistryError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidDuration { duration, max } => {
                RegistryError::InvalidDuration { duration, max }
            }
            ValidationError::FeeOverflow => RegistryError::FeeOverflow,
            ValidationError::InvalidConfig(reason) => RegistryError::InvalidConfig(reason),
            other => RegistryError::InvalidLabel(other),
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
