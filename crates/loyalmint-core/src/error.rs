//! Core error types for loyalmint-core.
//!
//! Every failure an action can hit maps onto one [`ErrorKind`]. Callers match
//! on the kind instead of inspecting message strings.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed classification of action failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected before any external call. Never retried.
    PreconditionFailure,
    /// Signing or submission to the external ledger failed.
    ExternalSubmissionFailure,
    /// Reading the authoritative balance failed.
    ExternalReadFailure,
}

/// Reasons an action is rejected before it reaches the external ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionFailure {
    #[error("Please connect your wallet first")]
    WalletNotConnected,

    #[error("Connected wallet cannot sign operations")]
    SigningUnavailable,

    #[error("Insufficient points: need {required}, have {available}")]
    InsufficientPoints { required: u64, available: u64 },

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Malformed recipient address: {0}")]
    MalformedRecipient(String),

    #[error("Another action is in progress, try again")]
    ActionInProgress,

    #[error("Unknown reward: {0}")]
    UnknownReward(String),
}

/// Core error type for loyalmint-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Precondition checks failed
    #[error("{0}")]
    Precondition(#[from] PreconditionFailure),

    /// Signing, submission or confirmation failed
    #[error("Transaction failed: {message}")]
    Submission { message: String },

    /// Balance read failed
    #[error("Failed to fetch points balance: {message}")]
    Read { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn submission(message: impl Into<String>) -> Self {
        CoreError::Submission {
            message: message.into(),
        }
    }

    pub fn read(message: impl Into<String>) -> Self {
        CoreError::Read {
            message: message.into(),
        }
    }

    /// Classify this error. Local faults (config, IO) never reach the
    /// external ledger, so they count as precondition failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Precondition(_)
            | CoreError::Config(_)
            | CoreError::Io(_)
            | CoreError::Json(_) => ErrorKind::PreconditionFailure,
            CoreError::Submission { .. } => ErrorKind::ExternalSubmissionFailure,
            CoreError::Read { .. } => ErrorKind::ExternalReadFailure,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home/config directory could not be prepared
    #[error("Config directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Failure surfaced to the display surface after an action ends in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl ActionFailure {
    pub fn from_error(err: &CoreError, at: DateTime<Utc>) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            at,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_classify_as_precondition() {
        let err: CoreError = PreconditionFailure::ActionInProgress.into();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailure);
        assert_eq!(err.to_string(), "Another action is in progress, try again");
    }

    #[test]
    fn external_errors_keep_their_kind() {
        assert_eq!(
            CoreError::submission("blockhash not found").kind(),
            ErrorKind::ExternalSubmissionFailure
        );
        assert_eq!(CoreError::read("timeout").kind(), ErrorKind::ExternalReadFailure);
    }

    #[test]
    fn action_failure_carries_message() {
        let err: CoreError = PreconditionFailure::InsufficientPoints {
            required: 200,
            available: 150,
        }
        .into();
        let failure = ActionFailure::from_error(&err, Utc::now());
        assert_eq!(failure.kind, ErrorKind::PreconditionFailure);
        assert_eq!(failure.message, "Insufficient points: need 200, have 150");
    }
}
