//! Custom error types for deferral.
//!
//! Combinators never raise these: a combinator reports through its own
//! [`Deferred`](crate::Deferred), with the caller's error type. This module
//! covers the layers around the core, namely configuration, scheduling
//! selection and outcome scripts.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for deferral operations
#[derive(Error, Debug)]
pub enum DeferralError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    // =========================================================================
    // Scheduling Errors
    // =========================================================================
    /// Tick scheduling requested without a reactor
    #[error("Scheduling mode '{mode}' requires a reactor, but none is available")]
    ReactorUnavailable { mode: String },

    // =========================================================================
    // Script Errors
    // =========================================================================
    /// Outcome script entry could not be parsed
    #[error("Invalid outcome '{input}': {reason}")]
    InvalidOutcome { input: String, reason: String },

    /// Scripted generator ran out of outcomes
    #[error("Generator exhausted after {attempts} attempts")]
    GeneratorExhausted { attempts: usize },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DeferralError {
    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid outcome error
    pub fn invalid_outcome(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOutcome {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error came from user-supplied input
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::InvalidOutcome { .. }
                | Self::ReactorUnavailable { .. }
        )
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidOutcome { .. } => 2,
            Self::ReactorUnavailable { .. } => 3,
            Self::Config { .. } => 7,
            _ => 1,
        }
    }
}

/// Type alias for deferral results
pub type Result<T> = std::result::Result<T, DeferralError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeferralError::GeneratorExhausted { attempts: 3 };
        assert_eq!(err.to_string(), "Generator exhausted after 3 attempts");

        let err = DeferralError::ReactorUnavailable {
            mode: "next-tick".into(),
        };
        assert!(err.to_string().contains("next-tick"));
    }

    #[test]
    fn test_is_usage_error() {
        let path = PathBuf::from("deferral.json");
        assert!(DeferralError::config_with_path("bad", path).is_usage_error());
        assert!(DeferralError::invalid_outcome("ok", "missing value").is_usage_error());
        assert!(!DeferralError::GeneratorExhausted { attempts: 1 }.is_usage_error());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DeferralError::invalid_outcome("x", "y").exit_code(), 2);
        assert_eq!(
            DeferralError::ReactorUnavailable {
                mode: "next-tick".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(
            DeferralError::config_with_path("test", PathBuf::from("x.json")).exit_code(),
            7
        );
        assert_eq!(DeferralError::GeneratorExhausted { attempts: 0 }.exit_code(), 1);
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/test/deferral.json");
        let err = DeferralError::config_with_path("failed to parse", path.clone());
        if let DeferralError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_invalid_outcome_fields() {
        let err = DeferralError::invalid_outcome("maybe:1", "unknown kind");
        if let DeferralError::InvalidOutcome { input, reason } = err {
            assert_eq!(input, "maybe:1");
            assert_eq!(reason, "unknown kind");
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: DeferralError = io_err.into();
        assert!(matches!(err, DeferralError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
