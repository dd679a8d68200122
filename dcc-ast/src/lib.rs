//! Abstract syntax tree contract for the DCPU-16 C compiler
//!
//! The parser lives in an external frontend; this crate defines the typed
//! tree it hands over. Every node carries a [`SourceSpan`] so later phases
//! can point diagnostics back at the source. The types are serde-
//! serializable, and the driver accepts a [`TranslationUnit`] as JSON.

use dcc_common::SourceSpan;
use serde::{Deserialize, Serialize};

/// A whole compilation unit: the ordered top-level entities of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub items: Vec<Item>,
    pub span: SourceSpan,
}

/// A top-level entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Function(FunctionDef),
    Declaration(Declaration),
}

/// A function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub return_type: TypeSpecifier,
    pub params: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub span: SourceSpan,
}

/// A named function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeSpecifier,
    pub span: SourceSpan,
}

/// A type as written in the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSpecifier {
    pub kind: TypeSpecifierKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeSpecifierKind {
    Void,

    /// An integer type: `long` selects the two-word width, `unsigned`
    /// the unsigned variant.
    Integer { long: bool, unsigned: bool },
}

/// A statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// An expression evaluated for its effect
    Expression(Expression),

    /// A braced block of statements
    Compound(Vec<Statement>),

    /// `return;` or `return expr;`
    Return(Option<Expression>),

    /// A variable declaration, one or more declarators
    Declaration(Declaration),
}

/// A declaration: one type specifier applied to one or more declarators.
/// Appears both at file scope (globals) and inside function bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub specifier: TypeSpecifier,
    pub declarators: Vec<Declarator>,
    pub span: SourceSpan,
}

/// One declared name with its optional initializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expression>,
    pub span: SourceSpan,
}

/// An expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// An integer literal with the suffix text as written (`"L"`, `"u"`,
    /// `"UL"`, ...), if any
    IntLiteral {
        value: i64,
        suffix: Option<String>,
    },

    /// A reference to a named variable or function
    Identifier(String),

    /// Unary arithmetic negation
    Negate(Box<Expression>),

    /// Binary addition
    Add(Box<Expression>, Box<Expression>),

    /// A function call
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },

    /// Assignment; the target must be an lvalue
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
    },
}
