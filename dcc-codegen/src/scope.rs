//! Per-function stack-frame allocation
//!
//! Exactly one [`Scope`] is active while a function body compiles. All
//! addressing is relative to the frame pointer `Z`: parameters sit at
//! negative offsets (the last-pushed argument closest to the saved frame
//! pointer), locals and expression temporaries at positive offsets growing
//! from slot 1. Released temporaries go onto a LIFO free-list and are
//! reused before the frame grows.

use crate::types::{Type, INT32};
use dcc_common::{CompilerError, SourceSpan};
use std::collections::HashMap;

/// A frame slot bound to a name
#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    pub ty: Type,
    /// Frame-pointer-relative offset in words; negative for parameters
    pub offset: i32,
}

/// The activation-record allocator for one function
#[derive(Debug)]
pub struct Scope {
    function: String,
    section: String,
    return_type: Type,
    locals: HashMap<String, Local>,
    free_temps: Vec<Local>,
    size: i32,
}

impl Scope {
    pub fn new(function: &str, section: String, return_type: Type) -> Self {
        Self {
            function: function.to_string(),
            section,
            return_type,
            locals: HashMap::new(),
            free_temps: Vec::new(),
            size: 1,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// Name of the section this function's code is emitted into
    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    /// Words allocated so far, counting from slot 1
    pub fn frame_size(&self) -> i32 {
        self.size
    }

    pub fn lookup(&self, name: &str) -> Option<&Local> {
        self.locals.get(name)
    }

    /// Allocate a slot for a new local at the current frame offset
    pub fn declare(
        &mut self,
        name: &str,
        ty: Type,
        span: &SourceSpan,
    ) -> Result<Local, CompilerError> {
        let local = Local {
            name: name.to_string(),
            offset: self.size,
            ty,
        };
        self.size += local.ty.size() as i32;
        self.insert(local.clone(), span)?;
        Ok(local)
    }

    /// Bind a parameter name to its caller-assigned negative offset
    pub fn bind_param(
        &mut self,
        name: &str,
        ty: Type,
        offset: i32,
        span: &SourceSpan,
    ) -> Result<(), CompilerError> {
        self.insert(
            Local {
                name: name.to_string(),
                ty,
                offset,
            },
            span,
        )
    }

    fn insert(&mut self, local: Local, span: &SourceSpan) -> Result<(), CompilerError> {
        if self.locals.contains_key(&local.name) {
            return Err(CompilerError::RedeclarationConflict {
                name: local.name,
                span: span.clone(),
            });
        }
        self.locals.insert(local.name.clone(), local);
        Ok(())
    }

    /// Take a two-word temporary slot, reusing a released one if possible
    pub fn acquire_temp(&mut self) -> Local {
        if let Some(temp) = self.free_temps.pop() {
            return temp;
        }
        let temp = Local {
            name: format!("__temp{}", self.size),
            ty: Type::Integral(INT32),
            offset: self.size,
        };
        self.size += temp.ty.size() as i32;
        temp
    }

    /// Return a temporary to the free-list for reuse
    pub fn release_temp(&mut self, temp: Local) {
        self.free_temps.push(temp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{INT16, INT32};

    fn scope() -> Scope {
        Scope::new("f", "_f".to_string(), Type::Integral(INT16))
    }

    fn span() -> SourceSpan {
        SourceSpan::dummy()
    }

    #[test]
    fn test_local_offsets_increase_without_overlap() {
        let mut scope = scope();
        let a = scope.declare("a", Type::Integral(INT16), &span()).unwrap();
        let b = scope.declare("b", Type::Integral(INT32), &span()).unwrap();
        let c = scope.declare("c", Type::Integral(INT16), &span()).unwrap();

        assert_eq!(a.offset, 1);
        assert_eq!(b.offset, 2);
        assert_eq!(c.offset, 4);
        assert_eq!(scope.frame_size(), 5);
    }

    #[test]
    fn test_redeclaration_rejected() {
        let mut scope = scope();
        scope.declare("x", Type::Integral(INT16), &span()).unwrap();
        let err = scope
            .declare("x", Type::Integral(INT32), &span())
            .unwrap_err();
        assert!(matches!(
            err,
            CompilerError::RedeclarationConflict { name, .. } if name == "x"
        ));
    }

    #[test]
    fn test_param_binding_negative_offsets() {
        let mut scope = scope();
        scope
            .bind_param("a", Type::Integral(INT16), -2, &span())
            .unwrap();
        scope
            .bind_param("b", Type::Integral(INT32), -3, &span())
            .unwrap();

        assert_eq!(scope.lookup("a").unwrap().offset, -2);
        assert_eq!(scope.lookup("b").unwrap().offset, -3);
        assert_eq!(scope.frame_size(), 1);
    }

    #[test]
    fn test_temp_reuse_is_lifo() {
        let mut scope = scope();
        let first = scope.acquire_temp();
        assert_eq!(first.offset, 1);
        assert_eq!(scope.frame_size(), 3);

        scope.release_temp(first);
        let again = scope.acquire_temp();
        assert_eq!(again.offset, 1);
        assert_eq!(scope.frame_size(), 3);
    }

    #[test]
    fn test_temps_do_not_collide_with_later_locals() {
        let mut scope = scope();
        let temp = scope.acquire_temp();
        let local = scope.declare("x", Type::Integral(INT16), &span()).unwrap();
        assert_eq!(temp.offset, 1);
        assert_eq!(local.offset, 3);
    }
}
