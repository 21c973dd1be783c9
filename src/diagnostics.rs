use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::graph::node::ByteRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// What went wrong. Only `FatalIo` keeps a file's symbols out of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// The file parsed with recoverable syntax errors, or could not be parsed at all.
    ParseError,
    /// A declaration was skipped, e.g. because its name could not be determined.
    ExtractionWarning,
    /// A reference site bound to more than one candidate.
    ResolutionAmbiguity,
    /// A reference site bound to nothing and now targets an External placeholder.
    UnresolvedReference,
    /// The file could not be read.
    FatalIo,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::ParseError => "parse-error",
            DiagnosticKind::ExtractionWarning => "extraction-warning",
            DiagnosticKind::ResolutionAmbiguity => "resolution-ambiguity",
            DiagnosticKind::UnresolvedReference => "unresolved-reference",
            DiagnosticKind::FatalIo => "fatal-io",
        }
    }

    /// Severity this kind is reported with.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::FatalIo => Severity::Error,
            DiagnosticKind::ParseError
            | DiagnosticKind::ExtractionWarning
            | DiagnosticKind::ResolutionAmbiguity => Severity::Warning,
            DiagnosticKind::UnresolvedReference => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub message: String,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub range: Option<ByteRange>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: kind.severity(),
            kind,
            range: None,
        }
    }

    pub fn with_range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.as_str(), self.path.display())?;
        if let Some(range) = self.range {
            write!(f, "@{}..{}", range.start, range.end)?;
        }
        write!(f, ": {} [{}]", self.message, self.kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_range_and_kind() {
        let d = Diagnostic::new(DiagnosticKind::ParseError, "a.py", "2 syntax errors")
            .with_range(ByteRange::new(3, 9));
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.to_string(), "warning: a.py@3..9: 2 syntax errors [parse-error]");
    }

    #[test]
    fn test_fatal_io_is_error() {
        let d = Diagnostic::new(DiagnosticKind::FatalIo, "x", "denied");
        assert_eq!(d.severity, Severity::Error);
        assert!(d.range.is_none());
    }
}
