//! Error types for the filter module

use std::fmt;

use thiserror::Error;

/// Result type for filter construction
pub type FilterResult<T> = Result<T, FilterError>;

/// Which configuration a rule set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleScope {
    User,
    Feed,
    Category,
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Feed => write!(f, "feed"),
            Self::Category => write!(f, "category"),
        }
    }
}

/// Whether a rule set removes matches or keeps them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Block,
    Keep,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Keep => write!(f, "keep"),
        }
    }
}

/// A single rule line that could not be compiled
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// Line has no `field=pattern` separator
    #[error("missing '=' separator in {0:?}")]
    MissingSeparator(String),

    /// Field name is not recognized
    #[error("unknown field {0:?}")]
    UnknownField(String),

    /// Regular expression failed to compile
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Date pattern is neither `future` nor `<op>:<value>`
    #[error("invalid date pattern {0:?}")]
    InvalidDatePattern(String),
}

/// Rule text that failed to compile, located by rule set and line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid {scope} {kind} rule on line {line}: {source}")]
    InvalidRule {
        scope: RuleScope,
        kind: RuleKind,
        line: usize,
        #[source]
        source: RuleError,
    },
}

impl FilterError {
    /// Line number (1-based) of the offending rule
    pub fn line(&self) -> usize {
        match self {
            Self::InvalidRule { line, .. } => *line,
        }
    }

    /// Rule set the offending rule belongs to
    pub fn scope(&self) -> RuleScope {
        match self {
            Self::InvalidRule { scope, .. } => *scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_display() {
        let err = FilterError::InvalidRule {
            scope: RuleScope::Feed,
            kind: RuleKind::Block,
            line: 3,
            source: RuleError::UnknownField("Unknown".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Invalid feed block rule on line 3: unknown field \"Unknown\""
        );
        assert_eq!(err.line(), 3);
        assert_eq!(err.scope(), RuleScope::Feed);
    }
}
