//! Error taxonomy and the public messages each failure maps to
//!
//! Callers never see error codes. Every failure is turned into one of two
//! fixed response bodies, and read-side store failures are reported exactly
//! like a missing secret (see [`ShareError::conceal`]).

use thiserror::Error;

/// Body returned when a secret is missing, expired, already read or the key
/// does not match.
pub const SECRET_UNAVAILABLE_MESSAGE: &str =
    "EITHER SECRET IS EXPIRED, ALREADY READ OR INCORRECT SECRET KEY";

/// Body returned for every other failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "INTERNAL ERROR. PLEASE TRY AGAIN";

/// Failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The write body was not a valid secret submission
    MalformedRequest,
    /// The store rejected or failed an operation
    StoreFailure,
    /// Not found, expired, wrong key, or another reader got there first
    SecretUnavailable,
    /// A stored item could not be decoded into a secret
    CorruptRecord,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRequest => "MalformedRequest",
            Self::StoreFailure => "StoreFailure",
            Self::SecretUnavailable => "SecretUnavailable",
            Self::CorruptRecord => "CorruptRecord",
        }
    }

    /// The response body a caller receives for this class of failure
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::SecretUnavailable => SECRET_UNAVAILABLE_MESSAGE,
            Self::MalformedRequest | Self::StoreFailure | Self::CorruptRecord => {
                INTERNAL_ERROR_MESSAGE
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service error. `message` is internal detail for logs only.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ShareError {
    pub code: ErrorCode,
    pub message: String,
}

impl ShareError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedRequest, message)
    }

    pub fn store_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreFailure, message)
    }

    pub fn secret_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SecretUnavailable, message)
    }

    pub fn corrupt_record(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CorruptRecord, message)
    }

    /// Existence concealment: a store failure on the read path must look the
    /// same as a missing secret, so it is reclassified as `SecretUnavailable`.
    /// Other codes pass through unchanged.
    #[must_use]
    pub fn conceal(self) -> Self {
        match self.code {
            ErrorCode::StoreFailure => Self {
                code: ErrorCode::SecretUnavailable,
                message: self.message,
            },
            _ => self,
        }
    }

    pub fn public_message(&self) -> &'static str {
        self.code.public_message()
    }
}
