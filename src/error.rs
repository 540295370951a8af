//! Error types.
//!
//! Lexer problems travel as [`Diagnostic`]s; everything a [`Navigator`]
//! can raise is an [`Error`].
//!
//! [`Navigator`]: crate::Navigator

use std::fmt;
use thiserror::Error;

/// Errors raised while navigating a document.
#[derive(Debug, Error)]
pub enum Error {
    /// The source was malformed (or unreadable) and parsing stopped.
    #[error(transparent)]
    Parse(#[from] Diagnostic),

    /// The source file could not be opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker thread could not be started.
    #[error("failed to spawn parsing worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread panicked.
    #[error("parsing worker panicked")]
    WorkerPanicked,

    /// The worker broke the request/reply discipline.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl Error {
    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// The diagnostic behind a parse error, if this is one.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Error::Parse(d) => Some(d),
            _ => None,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// How bad a reported problem is.
///
/// Every severity ends navigation; only the first diagnostic of a document
/// is ever delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        })
    }
}

/// What kind of problem a diagnostic describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Markup is not well-formed.
    Syntax,
    /// Undefined entity or bad character reference.
    Entity,
    /// Bytes could not be decoded, or the declared encoding is unsupported.
    Encoding,
    /// Questionable XML declaration.
    Declaration,
    /// The source could not be read.
    Io,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Syntax => "syntax",
            Category::Entity => "entity",
            Category::Encoding => "encoding",
            Category::Declaration => "declaration",
            Category::Io => "io",
        })
    }
}

/// Location in the (decoded) source. Lines and columns are 1-based,
/// columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub offset: u64,
    pub line: u64,
    pub column: u64,
}

impl Position {
    /// Start of input.
    pub const START: Position = Position {
        offset: 0,
        line: 1,
        column: 1,
    };
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A problem reported by the lexer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{severity} ({category}) at {position}: {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub position: Position,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        category: Category,
        message: impl Into<String>,
        position: Position,
    ) -> Self {
        Diagnostic {
            severity,
            category,
            message: message.into(),
            position,
        }
    }

    /// Shorthand for a fatal diagnostic.
    pub fn fatal(category: Category, message: impl Into<String>, position: Position) -> Self {
        Self::new(Severity::Fatal, category, message, position)
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::fatal(
            Category::Syntax,
            "mismatched tag",
            Position {
                offset: 12,
                line: 2,
                column: 5,
            },
        );
        assert_eq!(
            d.to_string(),
            "FATAL (syntax) at line 2, column 5: mismatched tag"
        );
    }

    #[test]
    fn test_parse_error_exposes_diagnostic() {
        let d = Diagnostic::new(Severity::Warning, Category::Declaration, "odd", Position::START);
        let err = Error::from(d.clone());
        assert_eq!(err.diagnostic(), Some(&d));
        assert_eq!(err.to_string(), d.to_string());
        assert!(Error::WorkerPanicked.diagnostic().is_none());
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }
}
