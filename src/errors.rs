//! Shared error types for cwefix.
//!
//! The engine never aborts a whole run on a single file: read and write
//! failures, parse failures, member conflicts and import conflicts are
//! turned into [`Diagnostic`](crate::diagnostics::Diagnostic)s by the
//! orchestrator and the runner. This type covers the failures that do propagate with `?`.

use crate::synthesis::NameConflict;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error code for reports and programmatic handling.
///
/// - E001-E009: I/O and filesystem errors
/// - E010-E019: Parse errors
/// - E020-E029: Configuration and rule table errors
/// - E030-E039: Rewrite conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    /// I/O error - generic
    pub const IO_GENERIC: ErrorCode = ErrorCode("E001");
    /// I/O error - source file could not be read or decoded
    pub const IO_READ: ErrorCode = ErrorCode("E002");
    /// I/O error - rewritten source could not be written
    pub const IO_WRITE: ErrorCode = ErrorCode("E003");

    /// Parse error - syntax error
    pub const PARSE_SYNTAX: ErrorCode = ErrorCode("E010");
    /// Parse error - parser could not be initialised
    pub const PARSE_PARSER: ErrorCode = ErrorCode("E011");

    /// Config error - invalid configuration file
    pub const CONFIG_INVALID: ErrorCode = ErrorCode("E020");
    /// Config error - invalid rule table
    pub const CONFIG_RULES: ErrorCode = ErrorCode("E021");
    /// Config error - member or import template does not parse
    pub const CONFIG_TEMPLATE: ErrorCode = ErrorCode("E022");

    /// Rewrite error - synthesized member collides with an existing one
    pub const REWRITE_NAME_CONFLICT: ErrorCode = ErrorCode("E030");
    /// Rewrite error - required import name already bound
    pub const REWRITE_IMPORT_CONFLICT: ErrorCode = ErrorCode("E031");
    /// Rewrite error - call site cannot receive synthesized members
    pub const REWRITE_UNSUPPORTED_HOST: ErrorCode = ErrorCode("E032");

    /// Get the error code string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Main error type for cwefix operations
#[derive(Debug, Error)]
pub enum Error {
    /// Source text could not be turned into a syntax tree
    #[error("Syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// The tree-sitter parser failed to initialise or gave up
    #[error("Parser error: {0}")]
    Parser(String),

    /// Synthesized member collides with an incompatible existing member
    #[error(transparent)]
    NameConflict(#[from] NameConflict),

    /// Rule table failed validation
    #[error("Rule table error: {0}")]
    RuleTable(String),

    /// A member or import template does not produce the expected syntax
    #[error("Template error in rule `{rule}`: {message}")]
    Template { rule: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File system related errors
    #[error("File system error: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// Create a file system error with path context
    pub fn file_system(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source),
        }
    }

    /// Create a syntax error at a 1-based position
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a template error for a rule
    pub fn template(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }

    /// Stable code used in reports.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Syntax { .. } => ErrorCode::PARSE_SYNTAX,
            Self::Parser(_) => ErrorCode::PARSE_PARSER,
            Self::NameConflict(_) => ErrorCode::REWRITE_NAME_CONFLICT,
            Self::RuleTable(_) => ErrorCode::CONFIG_RULES,
            Self::Template { .. } => ErrorCode::CONFIG_TEMPLATE,
            Self::Configuration(_) | Self::Toml(_) | Self::Pattern(_) => {
                ErrorCode::CONFIG_INVALID
            }
            Self::FileSystem { .. } | Self::Io(_) | Self::Json(_) | Self::WithContext { .. } => {
                ErrorCode::IO_GENERIC
            }
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
