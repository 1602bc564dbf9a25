//! Non-fatal conditions reported while transforming a unit.

use crate::errors::ErrorCode;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The unit could not be parsed and was skipped.
    SyntaxError,
    /// A synthesized member collides with an incompatible existing member.
    NameConflict,
    /// A required import is already bound to another type.
    ImportConflict,
    /// Matching calls sit in a type that cannot receive static members.
    UnsupportedHost,
    /// A rule template failed to produce a member for this host.
    TemplateError,
    /// The file could not be read or is not UTF-8.
    Unreadable,
    /// The rewritten file could not be written back.
    WriteFailed,
}

impl DiagnosticKind {
    #[must_use]
    pub fn code(self) -> ErrorCode {
        match self {
            Self::SyntaxError => ErrorCode::PARSE_SYNTAX,
            Self::NameConflict => ErrorCode::REWRITE_NAME_CONFLICT,
            Self::ImportConflict => ErrorCode::REWRITE_IMPORT_CONFLICT,
            Self::UnsupportedHost => ErrorCode::REWRITE_UNSUPPORTED_HOST,
            Self::TemplateError => ErrorCode::CONFIG_TEMPLATE,
            Self::Unreadable => ErrorCode::IO_READ,
            Self::WriteFailed => ErrorCode::IO_WRITE,
        }
    }

    /// Whether the diagnostic needs manual follow-up and should fail the run.
    #[must_use]
    pub fn needs_attention(self) -> bool {
        matches!(
            self,
            Self::SyntaxError
                | Self::NameConflict
                | Self::ImportConflict
                | Self::TemplateError
                | Self::Unreadable
                | Self::WriteFailed
        )
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SyntaxError => "syntax error",
            Self::NameConflict => "name conflict",
            Self::ImportConflict => "import conflict",
            Self::UnsupportedHost => "unsupported host",
            Self::TemplateError => "template error",
            Self::Unreadable => "unreadable file",
            Self::WriteFailed => "write failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Type declaration the diagnostic is about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            path: None,
            line: None,
            type_name: None,
            message: message.into(),
        }
    }

    pub fn at_path(mut self, path: Option<&Path>) -> Self {
        self.path = path.map(Path::to_path_buf);
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn in_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.kind.label())?;
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, " at {}:{}", path.display(), line)?,
            (Some(path), None) => write!(f, " in {}", path.display())?,
            (None, Some(line)) => write!(f, " at line {}", line)?,
            (None, None) => {}
        }
        if let Some(type_name) = &self.type_name {
            write!(f, " ({})", type_name)?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let diag = Diagnostic::new(DiagnosticKind::NameConflict, "helper already declared")
            .at_path(Some(Path::new("src/RandomUtil.java")))
            .at_line(12)
            .in_type("RandomUtil");
        assert_eq!(
            diag.to_string(),
            "[E030] name conflict at src/RandomUtil.java:12 (RandomUtil): helper already declared"
        );
    }

    #[test]
    fn test_needs_attention() {
        assert!(DiagnosticKind::NameConflict.needs_attention());
        assert!(DiagnosticKind::ImportConflict.needs_attention());
        assert!(DiagnosticKind::Unreadable.needs_attention());
        assert!(!DiagnosticKind::UnsupportedHost.needs_attention());
        assert_eq!(DiagnosticKind::Unreadable.code().as_str(), "E002");
    }

    #[test]
    fn test_serializes_snake_case_kind() {
        let diag = Diagnostic::new(DiagnosticKind::ImportConflict, "x");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["kind"], "import_conflict");
        assert_eq!(json["code"], "E031");
        assert!(json.get("path").is_none());
    }
}
