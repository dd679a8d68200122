//! DCPU-16 C Compiler - Common Types and Utilities
//!
//! This crate contains the shared types used across all components of the
//! compiler: source locations for diagnostics, the fatal error type, and
//! the non-fatal diagnostic reporter.

pub mod error;
pub mod source_loc;

pub use error::{CompilerError, Diagnostic, DiagnosticReporter, Severity};
pub use source_loc::{SourceLocation, SourceSpan};
