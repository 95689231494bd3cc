//! Error handling and error types for distributed layout planning.
//!
//! Every failure of a size query or plan construction is reported as a
//! [`DistError`] value. Nothing in this crate aborts the process, and no
//! error path performs communication, so a request that fails on one
//! process fails identically on every process given identical inputs.

use std::io;
use thiserror::Error;

use crate::core::types::{BlockKind, Extent};

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum DistError {
    /// Malformed shape, batch count or block hints
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Valid shape whose block count exceeds the process count
    #[error("Infeasible distribution: {kind} layout needs {required} blocks but only {available} processes are available")]
    InfeasibleDistribution {
        kind: BlockKind,
        required: Extent,
        available: usize,
    },

    /// One-dimensional radix search found no usable factorization
    #[error("No valid radix for a one-dimensional transform of size {n} over {num_processes} processes")]
    NoValidRadix { n: Extent, num_processes: usize },

    /// The planner found no applicable algorithm
    #[error("Planner produced no plan for {family} problem")]
    PlannerDeclined { family: &'static str },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// TOML parsing errors
    #[error("TOML parse error: {source}")]
    TomlDe {
        #[from]
        source: toml::de::Error,
    },

    /// TOML serialization errors
    #[error("TOML serialization error: {source}")]
    TomlSer {
        #[from]
        source: toml::ser::Error,
    },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results using DistError
pub type Result<T> = std::result::Result<T, DistError>;

impl DistError {
    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        DistError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an infeasible distribution error
    pub fn infeasible(kind: BlockKind, required: Extent, available: usize) -> Self {
        DistError::InfeasibleDistribution {
            kind,
            required,
            available,
        }
    }

    /// Create a radix failure error
    pub fn no_valid_radix(n: Extent, num_processes: usize) -> Self {
        DistError::NoValidRadix { n, num_processes }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        DistError::Config {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        DistError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        DistError::Internal {
            message: message.into(),
        }
    }

    /// True for failures caused by the process count rather than a malformed request.
    ///
    /// Callers may retry such requests with different block hints or a
    /// different group size.
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            DistError::InfeasibleDistribution { .. }
                | DistError::NoValidRadix { .. }
                | DistError::PlannerDeclined { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            DistError::InvalidRequest { .. } => "invalid_request",
            DistError::InfeasibleDistribution { .. } => "infeasible_distribution",
            DistError::NoValidRadix { .. } => "no_valid_radix",
            DistError::PlannerDeclined { .. } => "planner_declined",
            DistError::InvalidParameter { .. } => "invalid_parameter",
            DistError::Config { .. } => "config",
            DistError::IO { .. } => "io",
            DistError::Json { .. } => "json",
            DistError::TomlDe { .. } | DistError::TomlSer { .. } => "toml",
            DistError::Internal { .. } => "internal",
        }
    }
}

/// Convenience macro for invalid request errors
#[macro_export]
macro_rules! request_error {
    ($msg:expr) => {
        $crate::core::error::DistError::invalid_request($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::DistError::invalid_request(format!($fmt, $($arg)*))
    };
}

/// Return early with an error when a condition does not hold
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DistError::invalid_request("negative extent");
        assert_eq!(err.category(), "invalid_request");
        assert!(!err.is_infeasible());

        let err = DistError::infeasible(BlockKind::Output, 8, 4);
        assert_eq!(err.category(), "infeasible_distribution");
        assert!(err.is_infeasible());
    }

    #[test]
    fn test_error_macros() {
        let err = request_error!("rank must be positive");
        assert!(matches!(err, DistError::InvalidRequest { .. }));

        let err = request_error!("dimension {} has extent {}", 2, -1);
        assert!(err.to_string().contains("dimension 2 has extent -1"));
    }

    #[test]
    fn test_error_display() {
        let err = DistError::no_valid_radix(17, 4);
        let message = err.to_string();
        assert!(message.contains("17"));
        assert!(message.contains("4 processes"));

        let err = DistError::infeasible(BlockKind::Input, 6, 2);
        assert!(err.to_string().contains("input layout needs 6 blocks"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: DistError = io_err.into();
        assert!(matches!(err, DistError::IO { .. }));
        assert_eq!(err.category(), "io");
    }
}
