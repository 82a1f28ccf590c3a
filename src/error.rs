// The #[error] attribute from thiserror uses struct fields via string interpolation,
// but Rust's unused_assignments lint doesn't recognize this.
#![allow(unused_assignments)]

//! Fanout Error Types with Error Codes
//!
//! Error code ranges:
//! - FANOUT-000-009: Engine misuse (invalid bound)
//! - FANOUT-010-019: Operation failures (error, panic)
//! - FANOUT-020-029: Cancellation
//! - FANOUT-030-039: Engine invariants
//! - FANOUT-040-049: Configuration errors
//!
//! Two types live here:
//! - [`FanoutError`]: non-generic, raised before or around a traversal
//! - [`TraverseError`]: what a traversal returns, generic over the
//!   operation's own error type

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FanoutError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Engine misuse and configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FanoutError {
    // ═══════════════════════════════════════════
    // ENGINE MISUSE (000-009)
    // ═══════════════════════════════════════════
    #[error("[FANOUT-001] Invalid concurrency bound: {bound} (must be at least 1)")]
    InvalidBound { bound: usize },

    // ═══════════════════════════════════════════
    // ENGINE INVARIANTS (030-039)
    // ═══════════════════════════════════════════
    #[error("[FANOUT-030] Result collector incomplete: {missing} of {expected} slots empty")]
    IncompleteResults { missing: usize, expected: usize },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[FANOUT-040] Invalid config value for '{key}': {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("[FANOUT-041] Config error: {reason}")]
    ConfigError { reason: String },
}

impl FanoutError {
    /// Get the error code (e.g., "FANOUT-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidBound { .. } => "FANOUT-001",
            Self::IncompleteResults { .. } => "FANOUT-030",
            Self::InvalidConfig { .. } => "FANOUT-040",
            Self::ConfigError { .. } => "FANOUT-041",
        }
    }
}

impl FixSuggestion for FanoutError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            FanoutError::InvalidBound { .. } => {
                Some("Use Bound::Unbounded or a bound of at least 1")
            }
            FanoutError::IncompleteResults { .. } => {
                Some("This is an engine bug: every succeeded task must fill its slot")
            }
            FanoutError::InvalidConfig { .. } => {
                Some("Use a positive integer or \"unbounded\" for max_concurrency")
            }
            FanoutError::ConfigError { .. } => Some("Check TOML syntax and file permissions"),
        }
    }
}

/// Error returned by a traversal.
///
/// Only the first failure observed in wall-clock time is surfaced; failures
/// from sibling operations that lose the race are dropped.
#[derive(Error, Debug)]
pub enum TraverseError<E> {
    // ═══════════════════════════════════════════
    // OPERATION FAILURES (010-019)
    // ═══════════════════════════════════════════
    #[error("[FANOUT-010] Operation at index {index} failed: {error}")]
    Operation {
        index: usize,
        #[source]
        error: E,
    },

    #[error("[FANOUT-011] Operation at index {index} panicked: {message}")]
    Panicked { index: usize, message: String },

    // ═══════════════════════════════════════════
    // CANCELLATION (020-029)
    // ═══════════════════════════════════════════
    #[error("[FANOUT-020] Traversal cancelled before all operations completed")]
    Cancelled,

    #[error(transparent)]
    Engine(#[from] FanoutError),
}

impl<E> TraverseError<E> {
    /// Get the error code (e.g., "FANOUT-010")
    pub fn code(&self) -> &'static str {
        match self {
            Self::Operation { .. } => "FANOUT-010",
            Self::Panicked { .. } => "FANOUT-011",
            Self::Cancelled => "FANOUT-020",
            Self::Engine(e) => e.code(),
        }
    }

    /// Input position of the operation that failed, if any
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Operation { index, .. } | Self::Panicked { index, .. } => Some(*index),
            Self::Cancelled | Self::Engine(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Unwrap the caller's own error, discarding the index.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl<E> FixSuggestion for TraverseError<E> {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            TraverseError::Operation { .. } => None,
            TraverseError::Panicked { .. } => {
                Some("Return an error from the operation instead of panicking")
            }
            TraverseError::Cancelled => {
                Some("The parent cancellation token fired; check the caller's timeout")
            }
            TraverseError::Engine(e) => e.fix_suggestion(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_bound_code_and_display() {
        let err = FanoutError::InvalidBound { bound: 0 };
        assert_eq!(err.code(), "FANOUT-001");
        let msg = err.to_string();
        assert!(msg.contains("[FANOUT-001]"));
        assert!(msg.contains("0"));
        assert!(err.fix_suggestion().unwrap().contains("Bound::Unbounded"));
    }

    #[test]
    fn test_config_errors_have_codes() {
        let err = FanoutError::InvalidConfig {
            key: "max_concurrency".to_string(),
            reason: "not a number".to_string(),
        };
        assert_eq!(err.code(), "FANOUT-040");
        assert!(err.to_string().contains("max_concurrency"));

        let err = FanoutError::ConfigError {
            reason: "bad toml".to_string(),
        };
        assert_eq!(err.code(), "FANOUT-041");
        assert!(err.fix_suggestion().is_some());
    }

    #[test]
    fn test_operation_error_keeps_index_and_source() {
        let err: TraverseError<std::io::Error> = TraverseError::Operation {
            index: 4,
            error: std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
        };
        assert_eq!(err.code(), "FANOUT-010");
        assert_eq!(err.index(), Some(4));
        assert!(err.to_string().contains("index 4"));
        assert!(err.to_string().contains("disk gone"));
        assert!(std::error::Error::source(&err).is_some());

        let inner = err.into_operation_error().unwrap();
        assert_eq!(inner.to_string(), "disk gone");
    }

    #[test]
    fn test_panicked_error() {
        let err: TraverseError<String> = TraverseError::Panicked {
            index: 2,
            message: "boom".to_string(),
        };
        assert_eq!(err.code(), "FANOUT-011");
        assert_eq!(err.index(), Some(2));
        assert!(!err.is_cancelled());
        assert!(err.into_operation_error().is_none());
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err: TraverseError<String> = FanoutError::InvalidBound { bound: 0 }.into();
        assert_eq!(err.code(), "FANOUT-001");
        assert_eq!(err.index(), None);
        assert!(err.to_string().starts_with("[FANOUT-001]"));
    }

    #[test]
    fn test_cancelled_error() {
        let err: TraverseError<String> = TraverseError::Cancelled;
        assert!(err.is_cancelled());
        assert_eq!(err.code(), "FANOUT-020");
        assert!(err.fix_suggestion().unwrap().contains("timeout"));
    }
}
