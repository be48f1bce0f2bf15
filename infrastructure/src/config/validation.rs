//! Configuration issues
//!
//! Loading never fails on a questionable value: every problem becomes a
//! [`ConfigIssue`] and the value falls back to its default. Callers decide
//! whether to print warnings or abort on errors.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A string field holds a value outside its known set.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A field holds a value that fails validation.
    InvalidValue { field: String },
    /// A field needed by the selected option is not set.
    MissingValue { field: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },

    #[error("moderated strategy needs a moderator: set strategy.moderated.moderator or add a participant with the moderator role")]
    MissingModerator,
}

impl ConfigValidationError {
    /// First error-severity issue, if any.
    pub fn from_issues(issues: &[ConfigIssue]) -> Option<Self> {
        issues.iter().find(|i| i.is_error()).map(|issue| {
            let field = match &issue.code {
                ConfigIssueCode::InvalidEnumValue { field, .. }
                | ConfigIssueCode::InvalidValue { field }
                | ConfigIssueCode::MissingValue { field } => field.clone(),
            };
            ConfigValidationError::Invalid {
                field,
                message: issue.message.clone(),
            }
        })
    }
}
