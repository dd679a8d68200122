//! The node compiler
//!
//! One method per AST node kind, dispatched by exhaustive match. Results
//! of expressions land in `A` (one-word) or `A`/`B` low/high (two-word).
//! Storage comes from the active scope; every emitted line goes through
//! the typed instruction layer into the function's section.

use crate::asm::{Inst, Operand, Reg};
use crate::compiler::Compiler;
use crate::fold;
use crate::scope::{Local, Scope};
use crate::types::{self, FunctionType, Integral, Type};
use dcc_ast::{
    Declaration, Expression, ExpressionKind, FunctionDef, Item, Statement, StatementKind,
    TranslationUnit,
};
use dcc_common::{CompilerError, SourceSpan};
use log::debug;

/// Statement-position identifier that compiles to a machine trap
pub(crate) const HALT_INTRINSIC: &str = "__halt";

/// Trap target: inside the interrupt vector area, no legal opcode there
const TRAP_ADDR: u16 = 0xFFF0;

/// Prefix a source identifier so it cannot collide with a mnemonic or a
/// register name
pub(crate) fn mangle(name: &str) -> String {
    format!("_{}", name)
}

/// Label of word `word` of a multi-word global
pub(crate) fn word_label(label: &str, word: u16) -> String {
    format!("{}.{}", label, word)
}

/// Frame reference to word `word` of a slot. Locals sit below `Z`
/// (the displacement wraps mod 2^16), parameters above it.
fn slot_ref(local: &Local, word: u16) -> Operand {
    let disp = if local.offset < 0 {
        -local.offset + i32::from(word)
    } else {
        -(local.offset + i32::from(word))
    };
    Operand::Frame(disp.rem_euclid(65536) as u16)
}

/// Split a value into its machine words, low word first
fn split_words(value: i64, ty: Integral) -> Vec<u16> {
    (0..ty.size)
        .map(|word| ((value >> (16 * u32::from(word))) & 0xFFFF) as u16)
        .collect()
}

impl Compiler {
    pub(crate) fn compile_unit(&mut self, unit: &TranslationUnit) -> Result<(), CompilerError> {
        for item in &unit.items {
            match item {
                Item::Function(func) => self.compile_function(func)?,
                Item::Declaration(decl) => self.compile_global(decl)?,
            }
        }
        Ok(())
    }

    fn emit(&mut self, inst: Inst) -> Result<(), CompilerError> {
        let section = self.scope()?.section().to_string();
        self.sections.get_or_insert(&section).push(inst.to_string());
        Ok(())
    }

    fn compile_function(&mut self, func: &FunctionDef) -> Result<(), CompilerError> {
        let ret = self.ast_type(&func.return_type)?;
        let mut params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            params.push(self.ast_type(&param.ty)?);
        }
        let ty = Type::Function(FunctionType::new(ret.clone(), params.clone()));
        if let Some(existing) = self.symbols.get(&func.name) {
            if *existing != ty {
                return Err(CompilerError::RedeclarationConflict {
                    name: func.name.clone(),
                    span: func.span.clone(),
                });
            }
        }
        self.symbols.insert(func.name.clone(), ty);

        debug!("compiling function '{}'", func.name);
        let scope = Scope::new(&func.name, mangle(&func.name), ret);
        self.with_scope(scope, |cc| {
            // the last-pushed argument sits just past the saved Z and the
            // return address, so the first parameter starts at -2
            let mut offset = -2;
            for (param, ty) in func.params.iter().zip(params) {
                let size = i32::from(ty.size());
                cc.scope_mut()?
                    .bind_param(&param.name, ty, offset, &param.span)?;
                offset -= size;
            }
            cc.emit(Inst::Set(Operand::Push, Operand::Reg(Reg::Z)))?;
            cc.emit(Inst::Set(Operand::Reg(Reg::Z), Operand::Reg(Reg::Sp)))?;
            for stmt in &func.body {
                cc.compile_statement(stmt)?;
            }
            Ok(())
        })
    }

    fn compile_statement(&mut self, stmt: &Statement) -> Result<(), CompilerError> {
        match &stmt.kind {
            StatementKind::Expression(expr) => self.compile_expression_statement(expr),
            StatementKind::Compound(stmts) => {
                for stmt in stmts {
                    self.compile_statement(stmt)?;
                }
                Ok(())
            }
            StatementKind::Return(value) => self.compile_return(value.as_ref(), &stmt.span),
            StatementKind::Declaration(decl) => self.compile_local_declaration(decl),
        }
    }

    fn compile_expression_statement(&mut self, expr: &Expression) -> Result<(), CompilerError> {
        if let ExpressionKind::Identifier(name) = &expr.kind {
            if name == HALT_INTRINSIC {
                return self.emit(Inst::Set(Operand::Reg(Reg::Pc), Operand::Addr(TRAP_ADDR)));
            }
        }
        self.compile_expr(expr)
    }

    fn compile_return(
        &mut self,
        value: Option<&Expression>,
        span: &SourceSpan,
    ) -> Result<(), CompilerError> {
        let return_type = self.scope()?.return_type().clone();
        match (&return_type, value) {
            (Type::Void, Some(_)) => {
                return Err(CompilerError::TypeMismatch {
                    message: "returning a value from a void function".to_string(),
                    span: span.clone(),
                });
            }
            (Type::Void, None) => {}
            (_, None) => {
                return Err(CompilerError::TypeMismatch {
                    message: "returning no value from a non-void function".to_string(),
                    span: span.clone(),
                });
            }
            // results land in A (one word) or A/B (two words), which is
            // the return-value convention
            (_, Some(expr)) => self.compile_expr(expr)?,
        }
        self.emit(Inst::Set(Operand::Reg(Reg::Sp), Operand::Reg(Reg::Z)))?;
        self.emit(Inst::Set(Operand::Reg(Reg::Z), Operand::Pop))?;
        self.emit(Inst::Set(Operand::Reg(Reg::Pc), Operand::Pop))
    }

    fn compile_expr(&mut self, expr: &Expression) -> Result<(), CompilerError> {
        match &expr.kind {
            ExpressionKind::IntLiteral { value, .. } => self.compile_int_literal(*value, expr),
            ExpressionKind::Identifier(name) => self.compile_variable(name, expr),
            ExpressionKind::Negate(inner) => self.compile_negate(inner, expr),
            ExpressionKind::Add(lhs, rhs) => self.compile_add(lhs, rhs, expr),
            ExpressionKind::Call { callee, arguments } => self.compile_call(callee, arguments),
            ExpressionKind::Assign { target, value } => self.compile_assign(target, value, expr),
        }
    }

    fn compile_int_literal(&mut self, value: i64, expr: &Expression) -> Result<(), CompilerError> {
        let ty = self.integral_type(expr)?;
        self.check_range(value, ty, &expr.span)?;
        self.load_constant(value, ty)
    }

    fn compile_variable(&mut self, name: &str, expr: &Expression) -> Result<(), CompilerError> {
        let size = self.expression_type(expr)?.size();
        if let Some(local) = self.scope()?.lookup(name).cloned() {
            self.emit(Inst::Set(Operand::Reg(Reg::A), slot_ref(&local, 0)))?;
            if size > 1 {
                self.emit(Inst::Set(Operand::Reg(Reg::B), slot_ref(&local, 1)))?;
            }
        } else {
            let label = mangle(name);
            self.emit(Inst::Set(Operand::Reg(Reg::A), Operand::Mem(label.clone())))?;
            if size > 1 {
                self.emit(Inst::Set(
                    Operand::Reg(Reg::B),
                    Operand::Mem(word_label(&label, 1)),
                ))?;
            }
        }
        Ok(())
    }

    fn compile_negate(
        &mut self,
        inner: &Expression,
        expr: &Expression,
    ) -> Result<(), CompilerError> {
        if let ExpressionKind::IntLiteral { value, .. } = &inner.kind {
            // fold the sign into the constant and load it directly
            let ty = self.integral_type(expr)?;
            let negated = value
                .checked_neg()
                .ok_or_else(|| CompilerError::RangeOverflow {
                    value: *value,
                    message: "negation is not representable".to_string(),
                    span: expr.span.clone(),
                })?;
            self.check_range(negated, ty, &expr.span)?;
            return self.load_constant(negated, ty);
        }

        let ty = self.expression_type(inner)?.as_integral().ok_or_else(|| {
            CompilerError::TypeMismatch {
                message: "negation can't be performed on this operand type".to_string(),
                span: expr.span.clone(),
            }
        })?;
        self.compile_expr(inner)?;
        // two's complement: complement every word, then add one with the
        // carry flowing through O
        self.emit(Inst::Xor(Operand::Reg(Reg::A), Operand::Imm(65535)))?;
        if ty.size > 1 {
            self.emit(Inst::Xor(Operand::Reg(Reg::B), Operand::Imm(65535)))?;
        }
        self.emit(Inst::Add(Operand::Reg(Reg::A), Operand::Imm(1)))?;
        if ty.size > 1 {
            self.emit(Inst::Add(Operand::Reg(Reg::B), Operand::Reg(Reg::O)))?;
        }
        Ok(())
    }

    fn compile_add(
        &mut self,
        lhs: &Expression,
        rhs: &Expression,
        expr: &Expression,
    ) -> Result<(), CompilerError> {
        let mismatch = |span: &SourceSpan| CompilerError::TypeMismatch {
            message: "addition can't be performed on these operand types".to_string(),
            span: span.clone(),
        };
        let left = self
            .expression_type(lhs)?
            .as_integral()
            .ok_or_else(|| mismatch(&expr.span))?;
        let right = self
            .expression_type(rhs)?
            .as_integral()
            .ok_or_else(|| mismatch(&expr.span))?;

        if left.size > 1 || right.size > 1 {
            // two-word addition: stage the left operand in temporaries,
            // add high words first, then the low words; ADD sets O, so
            // the final ADD B, O folds the low-word carry into the high
            // word
            self.compile_expr(lhs)?;
            if left.size == 1 {
                // zero extend
                self.emit(Inst::Set(Operand::Reg(Reg::B), Operand::Imm(0)))?;
            }
            self.with_temps(2, |cc, temps| {
                let (low, high) = (&temps[0], &temps[1]);
                cc.emit(Inst::Set(slot_ref(low, 0), Operand::Reg(Reg::A)))?;
                cc.emit(Inst::Set(slot_ref(high, 0), Operand::Reg(Reg::B)))?;
                cc.compile_expr(rhs)?;
                if right.size == 1 {
                    // zero extend
                    cc.emit(Inst::Set(Operand::Reg(Reg::B), Operand::Imm(0)))?;
                }
                cc.emit(Inst::Add(Operand::Reg(Reg::B), slot_ref(high, 0)))?;
                cc.emit(Inst::Add(Operand::Reg(Reg::A), slot_ref(low, 0)))?;
                cc.emit(Inst::Add(Operand::Reg(Reg::B), Operand::Reg(Reg::O)))
            })
        } else {
            // one-word addition: hold the left operand while the right
            // evaluates
            self.compile_expr(lhs)?;
            self.with_temps(1, |cc, temps| {
                cc.emit(Inst::Set(slot_ref(&temps[0], 0), Operand::Reg(Reg::A)))?;
                cc.compile_expr(rhs)?;
                cc.emit(Inst::Add(Operand::Reg(Reg::A), slot_ref(&temps[0], 0)))
            })
        }
    }

    fn compile_call(
        &mut self,
        callee: &Expression,
        arguments: &[Expression],
    ) -> Result<(), CompilerError> {
        if let ExpressionKind::Identifier(name) = &callee.kind {
            if self.scope()?.lookup(name).is_none() && !self.symbols.contains_key(name) {
                self.warn(
                    &callee.span,
                    format!("implicit declaration of function '{}'", name),
                );
                let ty = FunctionType::new(
                    Type::Integral(types::INT16),
                    vec![Type::Integral(types::INT16); arguments.len()],
                );
                self.symbols.insert(name.clone(), Type::Function(ty));
            }
        }

        // pushed in reverse textual order, so the first argument ends up
        // nearest the callee's frame pointer
        for arg in arguments.iter().rev() {
            self.compile_expr(arg)?;
            self.emit(Inst::Set(Operand::Push, Operand::Reg(Reg::A)))?;
        }

        let direct = match &callee.kind {
            ExpressionKind::Identifier(name) => {
                if self.scope()?.lookup(name).is_none() {
                    Some(mangle(name))
                } else {
                    None
                }
            }
            _ => None,
        };
        match direct {
            Some(label) => self.emit(Inst::Jsr(Operand::Label(label)))?,
            None => {
                self.compile_expr(callee)?;
                self.emit(Inst::Jsr(Operand::Indirect(Reg::A)))?;
            }
        }

        // caller cleanup
        if !arguments.is_empty() {
            self.emit(Inst::Add(
                Operand::Reg(Reg::Sp),
                Operand::Imm(arguments.len() as u16),
            ))?;
        }
        Ok(())
    }

    fn compile_assign(
        &mut self,
        target: &Expression,
        value: &Expression,
        expr: &Expression,
    ) -> Result<(), CompilerError> {
        let name = match &target.kind {
            ExpressionKind::Identifier(name) => name.clone(),
            _ => {
                return Err(CompilerError::UnsupportedConstruct {
                    message: "assignment target must be a plain identifier".to_string(),
                    span: target.span.clone(),
                });
            }
        };
        let target_ty = self.expression_type(target)?;
        let value_ty = self.expression_type(value)?;
        let (Some(target_int), Some(value_int)) = (target_ty.as_integral(), value_ty.as_integral())
        else {
            return Err(CompilerError::TypeMismatch {
                message: "assignment requires integral operands".to_string(),
                span: expr.span.clone(),
            });
        };

        self.compile_expr(value)?;
        self.store_word(&name, 0, Operand::Reg(Reg::A))?;
        match (target_int.size, value_int.size) {
            (2, 2) => self.store_word(&name, 1, Operand::Reg(Reg::B))?,
            (2, 1) => {
                // widening store zero-fills the high word; signed sources
                // are not sign-extended
                self.store_word(&name, 1, Operand::Imm(0))?;
            }
            (1, 2) => {
                self.warn(
                    &expr.span,
                    format!("value truncated in assignment to '{}'", name),
                );
            }
            _ => {}
        }
        Ok(())
    }

    fn compile_local_declaration(&mut self, decl: &Declaration) -> Result<(), CompilerError> {
        let base = self.ast_type(&decl.specifier)?;
        let Some(int) = base.as_integral() else {
            return Err(CompilerError::TypeMismatch {
                message: "cannot declare a variable of void type".to_string(),
                span: decl.specifier.span.clone(),
            });
        };
        for declarator in &decl.declarators {
            let local =
                self.scope_mut()?
                    .declare(&declarator.name, base.clone(), &declarator.span)?;
            let Some(init) = &declarator.init else {
                continue;
            };
            match fold::fold(init) {
                Some(value) => {
                    let words = self.split_constant(value, int, &declarator.span);
                    for (word, imm) in words.iter().enumerate() {
                        self.emit(Inst::Set(
                            slot_ref(&local, word as u16),
                            Operand::Imm(*imm),
                        ))?;
                    }
                }
                None => {
                    self.warn(
                        &declarator.span,
                        format!(
                            "initializer for '{}' is not a constant expression; no code emitted",
                            declarator.name
                        ),
                    );
                }
            }
        }
        Ok(())
    }

    fn compile_global(&mut self, decl: &Declaration) -> Result<(), CompilerError> {
        let base = self.ast_type(&decl.specifier)?;
        let Some(int) = base.as_integral() else {
            return Err(CompilerError::UnsupportedConstruct {
                message: "only integral globals are supported".to_string(),
                span: decl.specifier.span.clone(),
            });
        };
        for declarator in &decl.declarators {
            if self.symbols.contains_key(&declarator.name) {
                return Err(CompilerError::RedeclarationConflict {
                    name: declarator.name.clone(),
                    span: declarator.span.clone(),
                });
            }
            self.symbols.insert(declarator.name.clone(), base.clone());

            let value = match &declarator.init {
                None => 0,
                Some(init) => {
                    fold::fold(init).ok_or_else(|| CompilerError::UnsupportedConstruct {
                        message: format!(
                            "initializer for global '{}' is not a constant expression",
                            declarator.name
                        ),
                        span: init.span.clone(),
                    })?
                }
            };

            debug!("emitting global '{}' ({} words)", declarator.name, int.size);
            let words = self.split_constant(value, int, &declarator.span);
            let label = mangle(&declarator.name);
            for (word, imm) in words.iter().enumerate() {
                let name = if word == 0 {
                    label.clone()
                } else {
                    word_label(&label, word as u16)
                };
                self.sections
                    .get_or_insert(&name)
                    .push(Inst::Dat(*imm).to_string());
            }
        }
        Ok(())
    }

    /// Store into word `word` of a named local or global
    fn store_word(&mut self, name: &str, word: u16, src: Operand) -> Result<(), CompilerError> {
        if let Some(local) = self.scope()?.lookup(name).cloned() {
            self.emit(Inst::Set(slot_ref(&local, word), src))
        } else {
            let label = mangle(name);
            let label = if word == 0 {
                label
            } else {
                word_label(&label, word)
            };
            self.emit(Inst::Set(Operand::Mem(label), src))
        }
    }

    /// Load a constant into A (and B for a two-word type)
    fn load_constant(&mut self, value: i64, ty: Integral) -> Result<(), CompilerError> {
        let words = split_words(value, ty);
        self.emit(Inst::Set(Operand::Reg(Reg::A), Operand::Imm(words[0])))?;
        if let Some(high) = words.get(1) {
            self.emit(Inst::Set(Operand::Reg(Reg::B), Operand::Imm(*high)))?;
        }
        Ok(())
    }

    /// Split a folded constant into words, warning when it wraps
    fn split_constant(&mut self, value: i64, ty: Integral, span: &SourceSpan) -> Vec<u16> {
        if value < ty.min_value() || value > ty.max_value() {
            self.warn(
                span,
                format!("constant {} overflows {}; value wrapped", value, ty),
            );
        }
        split_words(value, ty)
    }

    fn check_range(
        &self,
        value: i64,
        ty: Integral,
        span: &SourceSpan,
    ) -> Result<(), CompilerError> {
        if value > ty.max_value() {
            return Err(CompilerError::RangeOverflow {
                value,
                message: format!("maximum for {} is {}", ty, ty.max_value()),
                span: span.clone(),
            });
        }
        if value < ty.min_value() {
            return Err(CompilerError::RangeOverflow {
                value,
                message: format!("minimum for {} is {}", ty, ty.min_value()),
                span: span.clone(),
            });
        }
        Ok(())
    }

    /// The expression's type, which must be integral
    fn integral_type(&self, expr: &Expression) -> Result<Integral, CompilerError> {
        self.expression_type(expr)?
            .as_integral()
            .ok_or_else(|| CompilerError::Internal {
                message: "expected an integral expression type".to_string(),
            })
    }
}
