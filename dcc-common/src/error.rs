//! Error handling for the DCPU-16 C compiler
//!
//! Hard errors abort the compilation pass immediately and propagate as
//! [`CompilerError`] values. Non-fatal findings (implicit declarations,
//! truncating stores, wrapped constants) are collected as [`Diagnostic`]s
//! and never stop compilation.

use crate::source_loc::SourceSpan;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal compilation error. The pass stops at the first one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("{span}: undefined identifier '{name}'")]
    UndefinedIdentifier { name: String, span: SourceSpan },

    #[error("{span}: redeclaration of '{name}' as a different type")]
    RedeclarationConflict { name: String, span: SourceSpan },

    #[error("{span}: type mismatch: {message}")]
    TypeMismatch { message: String, span: SourceSpan },

    #[error("{span}: integer constant {value} out of range: {message}")]
    RangeOverflow {
        value: i64,
        message: String,
        span: SourceSpan,
    },

    #[error("{span}: unsupported construct: {message}")]
    UnsupportedConstruct { message: String, span: SourceSpan },

    #[error("internal compiler error: {message}")]
    Internal { message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::Io {
            message: err.to_string(),
        }
    }
}

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A non-fatal diagnostic with location and severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: SourceSpan,
}

impl Diagnostic {
    pub fn warning(message: String, span: SourceSpan) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
        }
    }

    pub fn note(message: String, span: SourceSpan) -> Self {
        Self {
            severity: Severity::Note,
            message,
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.span, self.severity, self.message)
    }
}

/// Collector for non-fatal diagnostics emitted during a pass
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReporter {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning diagnostic
    pub fn warning(&mut self, message: String, span: SourceSpan) {
        self.diagnostics.push(Diagnostic::warning(message, span));
    }

    /// Record a note diagnostic
    pub fn note(&mut self, message: String, span: SourceSpan) {
        self.diagnostics.push(Diagnostic::note(message, span));
    }

    /// All diagnostics, in emission order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
