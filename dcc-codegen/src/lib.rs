//! DCPU-16 C Compiler - Code Generation Core
//!
//! This crate lowers the typed AST to DCPU-16 assembly text. It contains:
//!
//! - The type system (word-sized integral types, struct/union layout)
//! - The per-function stack-frame allocator
//! - The constant folder for static initializers
//! - The node-by-node code generator and its instruction model
//! - The compiler context that drives the single top-to-bottom pass

pub mod asm;
pub mod compiler;
pub mod fold;
pub mod scope;
pub mod section;
pub mod types;

mod codegen;

pub use compiler::{Compiler, ENTRY_SECTION};
pub use section::{Section, Sections};

/// Compile a translation unit to assembly text with a fresh compiler.
/// Use [`Compiler`] directly to inspect warnings afterwards.
pub fn compile(unit: &dcc_ast::TranslationUnit) -> Result<String, dcc_common::CompilerError> {
    Compiler::new().compile(unit)
}
