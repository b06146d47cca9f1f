use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Errors returned by the fallible host-facing APIs.
///
/// The scanner itself never fails; everything it finds wrong with its input is
/// reported as a [`Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// I/O error (e.g., reading a source or settings file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Settings document is not valid JSON
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Advisory conditions found while scanning
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// `//` comment runs to end of buffer
    #[error("single line comment is not ended with newline")]
    UnterminatedLineComment,
    /// `/*` comment has no `*/`
    #[error("multi line comment is not ended with `*/`")]
    UnterminatedBlockComment,
    /// `"` literal has no closing quote
    #[error("string is not ended with `\"`")]
    UnterminatedString,
    /// Include target not found locally or in any search directory
    #[error("can't find include file `{0}`")]
    IncludeNotFound(String),
    /// Include target exists but could not be read
    #[error("can't open `{path}`: {reason}")]
    IncludeUnreadable {
        /// Resolved path
        path: PathBuf,
        /// I/O error text
        reason: String,
    },
    /// Include target is already being scanned further up the chain
    #[error("include cycle detected at `{0}`")]
    IncludeCycle(PathBuf),
    /// Include chain is deeper than the configured limit
    #[error("include depth limit of {0} exceeded")]
    IncludeDepthExceeded(usize),
    /// Top-level buffer ended inside an excluded conditional branch
    #[error("conditional block is not closed with `endif`")]
    UnterminatedConditional,
}

/// A located [`DiagnosticKind`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// What went wrong
    #[serde(flatten)]
    pub kind: DiagnosticKind,
    /// Included file the condition was found in, `None` for the top-level buffer
    pub file: Option<PathBuf>,
    /// Byte offset into that file
    pub offset: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}@{}: {}", file.display(), self.offset, self.kind),
            None => write!(f, "@{}: {}", self.offset, self.kind),
        }
    }
}
