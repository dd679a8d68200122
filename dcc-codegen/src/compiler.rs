//! The compilation context
//!
//! [`Compiler`] owns everything one pass mutates: the global symbol table,
//! the section map, the built-in type-name table, the diagnostic reporter,
//! and the single active [`Scope`]. Node handlers receive it explicitly;
//! there is no ambient state.

use crate::scope::{Local, Scope};
use crate::section::Sections;
use crate::types::{self, Type};
use dcc_ast::{Expression, ExpressionKind, TranslationUnit, TypeSpecifier, TypeSpecifierKind};
use dcc_common::{CompilerError, Diagnostic, DiagnosticReporter, SourceSpan};
use log::{debug, warn};
use std::collections::HashMap;

/// The section rendered first in the final assembly
pub const ENTRY_SECTION: &str = "_main";

/// Owns all state of one compilation pass
pub struct Compiler {
    pub(crate) symbols: HashMap<String, Type>,
    pub(crate) sections: Sections,
    pub(crate) types: HashMap<String, Type>,
    pub(crate) scope: Option<Scope>,
    pub(crate) diagnostics: DiagnosticReporter,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            sections: Sections::new(),
            types: types::builtins(),
            scope: None,
            diagnostics: DiagnosticReporter::new(),
        }
    }

    /// Compile a translation unit to assembly text. The first hard error
    /// aborts the pass; warnings accumulate in [`Self::diagnostics`].
    pub fn compile(&mut self, unit: &TranslationUnit) -> Result<String, CompilerError> {
        debug!("compiling translation unit ({} items)", unit.items.len());
        self.compile_unit(unit)?;
        Ok(self.sections.render(ENTRY_SECTION))
    }

    /// Non-fatal diagnostics collected so far, in emission order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    /// The type a source-level type specifier denotes. An integer
    /// specifier that misses the built-in table indicates a frontend/core
    /// mismatch, not a user error.
    pub fn ast_type(&self, spec: &TypeSpecifier) -> Result<Type, CompilerError> {
        match &spec.kind {
            TypeSpecifierKind::Void => Ok(Type::Void),
            TypeSpecifierKind::Integer { long, unsigned } => {
                let base = if *long { "long" } else { "int" };
                let name = if *unsigned {
                    format!("unsigned {}", base)
                } else {
                    base.to_string()
                };
                self.types
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| CompilerError::Internal {
                        message: format!("unknown built-in type '{}'", name),
                    })
            }
        }
    }

    /// The static type of an expression
    pub fn expression_type(&self, expr: &Expression) -> Result<Type, CompilerError> {
        match &expr.kind {
            ExpressionKind::IntLiteral { suffix, .. } => {
                let suffix = suffix.as_deref().unwrap_or("").to_ascii_lowercase();
                let mut ty = if suffix.contains('l') {
                    types::INT32
                } else {
                    types::INT16
                };
                if suffix.contains('u') {
                    ty = ty.as_unsigned();
                }
                Ok(Type::Integral(ty))
            }
            ExpressionKind::Identifier(name) => {
                self.resolve(name)
                    .ok_or_else(|| CompilerError::UndefinedIdentifier {
                        name: name.clone(),
                        span: expr.span.clone(),
                    })
            }
            ExpressionKind::Negate(inner) => self.expression_type(inner),
            ExpressionKind::Add(lhs, rhs) => {
                let left = self.expression_type(lhs)?;
                let right = self.expression_type(rhs)?;
                Ok(if right.size() > left.size() { right } else { left })
            }
            ExpressionKind::Call { callee, .. } => {
                if let ExpressionKind::Identifier(name) = &callee.kind {
                    if self.resolve(name).is_none() {
                        // not declared yet; an implicit declaration returns int
                        return Ok(Type::Integral(types::INT16));
                    }
                }
                match self.expression_type(callee)? {
                    Type::Function(func) => Ok(func.ret.as_ref().clone()),
                    _ => Ok(Type::Integral(types::INT16)),
                }
            }
            ExpressionKind::Assign { target, .. } => self.expression_type(target),
        }
    }

    /// Resolve a name against the active scope, then the global symbols
    pub(crate) fn resolve(&self, name: &str) -> Option<Type> {
        if let Some(scope) = &self.scope {
            if let Some(local) = scope.lookup(name) {
                return Some(local.ty.clone());
            }
        }
        self.symbols.get(name).cloned()
    }

    /// Run `f` with `scope` installed as the one active scope. The scope
    /// is torn down on every exit path; it never outlives the body.
    pub fn with_scope<R>(
        &mut self,
        scope: Scope,
        f: impl FnOnce(&mut Self) -> Result<R, CompilerError>,
    ) -> Result<R, CompilerError> {
        self.scope = Some(scope);
        let result = f(self);
        self.scope = None;
        result
    }

    /// Acquire `count` temporaries, run `f`, and release them on every
    /// exit path so an error deep in expression compilation cannot leak
    /// frame slots.
    pub fn with_temps<R>(
        &mut self,
        count: usize,
        f: impl FnOnce(&mut Self, &[Local]) -> Result<R, CompilerError>,
    ) -> Result<R, CompilerError> {
        let mut temps = Vec::with_capacity(count);
        for _ in 0..count {
            temps.push(self.scope_mut()?.acquire_temp());
        }
        let result = f(self, &temps);
        if let Some(scope) = self.scope.as_mut() {
            for temp in temps.into_iter().rev() {
                scope.release_temp(temp);
            }
        }
        result
    }

    pub(crate) fn scope(&self) -> Result<&Scope, CompilerError> {
        self.scope.as_ref().ok_or_else(|| CompilerError::Internal {
            message: "no active scope".to_string(),
        })
    }

    pub(crate) fn scope_mut(&mut self) -> Result<&mut Scope, CompilerError> {
        self.scope.as_mut().ok_or_else(|| CompilerError::Internal {
            message: "no active scope".to_string(),
        })
    }

    /// Record a non-fatal warning and mirror it to the log
    pub(crate) fn warn(&mut self, span: &SourceSpan, message: impl Into<String>) {
        let message = message.into();
        warn!("{}: {}", span, message);
        self.diagnostics.warning(message, span.clone());
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{INT16, INT32, UINT16, UINT32};

    fn span() -> SourceSpan {
        SourceSpan::dummy()
    }

    fn literal(value: i64, suffix: Option<&str>) -> Expression {
        Expression {
            kind: ExpressionKind::IntLiteral {
                value,
                suffix: suffix.map(str::to_string),
            },
            span: span(),
        }
    }

    #[test]
    fn test_literal_types_follow_suffix() {
        let compiler = Compiler::new();
        let cases = [
            (None, INT16),
            (Some("l"), INT32),
            (Some("L"), INT32),
            (Some("u"), UINT16),
            (Some("UL"), UINT32),
            (Some("lu"), UINT32),
        ];
        for (suffix, expected) in cases {
            let ty = compiler.expression_type(&literal(1, suffix)).unwrap();
            assert_eq!(ty, Type::Integral(expected), "suffix {:?}", suffix);
        }
    }

    #[test]
    fn test_negation_passes_operand_type_through() {
        let compiler = Compiler::new();
        let negated = Expression {
            kind: ExpressionKind::Negate(Box::new(literal(5, Some("L")))),
            span: span(),
        };
        assert_eq!(
            compiler.expression_type(&negated).unwrap(),
            Type::Integral(INT32)
        );
    }

    #[test]
    fn test_addition_takes_wider_operand_type() {
        let compiler = Compiler::new();
        let sum = Expression {
            kind: ExpressionKind::Add(
                Box::new(literal(1, None)),
                Box::new(literal(2, Some("L"))),
            ),
            span: span(),
        };
        assert_eq!(
            compiler.expression_type(&sum).unwrap(),
            Type::Integral(INT32)
        );
    }

    #[test]
    fn test_undefined_identifier() {
        let compiler = Compiler::new();
        let expr = Expression {
            kind: ExpressionKind::Identifier("nowhere".to_string()),
            span: span(),
        };
        let err = compiler.expression_type(&expr).unwrap_err();
        assert!(matches!(
            err,
            CompilerError::UndefinedIdentifier { name, .. } if name == "nowhere"
        ));
    }

    #[test]
    fn test_ast_type_builtin_lookup() {
        let compiler = Compiler::new();
        let spec = |long, unsigned| TypeSpecifier {
            kind: TypeSpecifierKind::Integer { long, unsigned },
            span: span(),
        };
        assert_eq!(
            compiler.ast_type(&spec(false, false)).unwrap(),
            Type::Integral(INT16)
        );
        assert_eq!(
            compiler.ast_type(&spec(true, false)).unwrap(),
            Type::Integral(INT32)
        );
        assert_eq!(
            compiler.ast_type(&spec(true, true)).unwrap(),
            Type::Integral(UINT32)
        );
        let void = TypeSpecifier {
            kind: TypeSpecifierKind::Void,
            span: span(),
        };
        assert_eq!(compiler.ast_type(&void).unwrap(), Type::Void);
    }

    #[test]
    fn test_with_scope_tears_down_on_error() {
        let mut compiler = Compiler::new();
        let scope = Scope::new("f", "_f".to_string(), Type::Integral(INT16));
        let result: Result<(), CompilerError> = compiler.with_scope(scope, |_| {
            Err(CompilerError::Internal {
                message: "boom".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(compiler.scope.is_none());
    }

    #[test]
    fn test_with_temps_releases_on_error() {
        let mut compiler = Compiler::new();
        let scope = Scope::new("f", "_f".to_string(), Type::Integral(INT16));
        compiler.with_scope(scope, |cc| {
            let failed: Result<(), CompilerError> = cc.with_temps(2, |_, temps| {
                assert_eq!(temps.len(), 2);
                Err(CompilerError::Internal {
                    message: "boom".to_string(),
                })
            });
            assert!(failed.is_err());

            // both slots must be back on the free-list
            let first = cc.scope_mut()?.acquire_temp();
            assert_eq!(first.offset, 1);
            Ok(())
        })
        .unwrap();
    }
}
