//! Unified error handling for the freshet crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`FreshetErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use freshet::error::{Error, ErrorCategory, FreshetErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Will retry next cycle ({}): {}", err.category(), err);
//!     } else {
//!         eprintln!("Fatal error: {}", err);
//!     }
//! }
//! ```

use std::fmt;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::filter::FilterError;
pub use crate::utils::error::{SourceError, StoreError};

/// Common trait for all freshet error types
///
/// This trait provides a unified interface for error handling across
/// all modules, enabling consistent error processing strategies.
pub trait FreshetErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later refresh may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Fetch errors (transport, status, timeout)
    Network,
    /// Feed decoding errors
    Parsing,
    /// Store errors
    Storage,
    /// Filter rule compilation errors
    Filter,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Filter => "filter",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the freshet crate
///
/// This enum wraps all domain-specific errors, providing a single error type
/// that can be used across module boundaries while preserving the detailed
/// error information.
#[derive(Error, Debug)]
pub enum Error {
    /// Filter rule text failed to compile
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Store lookups and writes
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Feed fetch and parse
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Configuration values rejected by validation
    #[error("Config error: {0}")]
    Config(String),

    /// Failure raised by a custom [`Refresh`](crate::worker::Refresh) implementation
    #[error("{0}")]
    Other(String),
}

impl FreshetErrorTrait for StoreError {
    fn is_recoverable(&self) -> bool {
        StoreError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

impl FreshetErrorTrait for SourceError {
    fn is_recoverable(&self) -> bool {
        SourceError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Parse { .. } => ErrorCategory::Parsing,
            _ => ErrorCategory::Network,
        }
    }
}

impl FreshetErrorTrait for FilterError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Filter
    }
}

impl FreshetErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Filter(_) => false,
            Self::Store(e) => e.is_recoverable(),
            Self::Source(e) => e.is_recoverable(),
            Self::Config(_) => false,
            Self::Other(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Filter(e) => FreshetErrorTrait::category(e),
            Self::Store(e) => FreshetErrorTrait::category(e),
            Self::Source(e) => FreshetErrorTrait::category(e),
            Self::Config(_) => ErrorCategory::Config,
            Self::Other(_) => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other(context.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
