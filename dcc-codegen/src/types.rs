//! The compiler's type system
//!
//! All sizes are measured in 16-bit machine words. Integral types are one
//! or two words; `struct` members are laid out at prefix-sum offsets while
//! `union` members all overlap at offset 0. Every query here is pure.

use std::collections::HashMap;
use std::fmt;

/// A C type as seen by the code generator
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Integral(Integral),
    Struct(StructType),
    Union(UnionType),
    Function(FunctionType),
}

impl Type {
    /// Size in machine words. A function value is a one-word code address.
    pub fn size(&self) -> u16 {
        match self {
            Type::Void => 0,
            Type::Integral(int) => int.size,
            Type::Struct(s) => s.size(),
            Type::Union(u) => u.size(),
            Type::Function(_) => 1,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Integral(_))
    }

    pub fn as_integral(&self) -> Option<Integral> {
        match self {
            Type::Integral(int) => Some(*int),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Integral(int) => write!(f, "{}", int),
            Type::Struct(_) => write!(f, "struct"),
            Type::Union(_) => write!(f, "union"),
            Type::Function(func) => {
                write!(f, "{} (", func.ret)?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// An integer type, one or two words wide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Integral {
    /// Width in words, 1 or 2
    pub size: u16,
    pub signed: bool,
}

/// One-word signed integer (`char`, `short`, `int`)
pub const INT16: Integral = Integral::new(1, true);
/// Two-word signed integer (`long`)
pub const INT32: Integral = Integral::new(2, true);
/// One-word unsigned integer
pub const UINT16: Integral = Integral::new(1, false);
/// Two-word unsigned integer
pub const UINT32: Integral = Integral::new(2, false);

impl Integral {
    pub const fn new(size: u16, signed: bool) -> Self {
        assert!(size == 1 || size == 2);
        Self { size, signed }
    }

    pub fn bits(&self) -> u32 {
        16 * self.size as u32
    }

    /// Smallest representable value (two's complement when signed)
    pub fn min_value(&self) -> i64 {
        if self.signed {
            -(1i64 << (self.bits() - 1))
        } else {
            0
        }
    }

    /// Largest representable value
    pub fn max_value(&self) -> i64 {
        if self.signed {
            (1i64 << (self.bits() - 1)) - 1
        } else {
            (1i64 << self.bits()) - 1
        }
    }

    /// The same-size signed type; identity on signed types
    pub fn as_signed(self) -> Self {
        Self {
            signed: true,
            ..self
        }
    }

    /// The same-size unsigned type; identity on unsigned types
    pub fn as_unsigned(self) -> Self {
        Self {
            signed: false,
            ..self
        }
    }
}

impl fmt::Display for Integral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.size, self.signed) {
            (1, true) => write!(f, "int"),
            (1, false) => write!(f, "unsigned int"),
            (2, true) => write!(f, "long"),
            (2, false) => write!(f, "unsigned long"),
            _ => write!(f, "{}-bit integer", self.bits()),
        }
    }
}

/// A struct type: ordered members at prefix-sum offsets
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    members: Vec<(String, Type)>,
}

impl StructType {
    pub fn new(members: Vec<(String, Type)>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[(String, Type)] {
        &self.members
    }

    /// Total size: the sum of all member sizes
    pub fn size(&self) -> u16 {
        self.members.iter().map(|(_, ty)| ty.size()).sum()
    }

    /// Offset of a member: the sum of the sizes of the members before it
    pub fn offset_of(&self, member: &str) -> Option<u16> {
        let mut offset = 0;
        for (name, ty) in &self.members {
            if name == member {
                return Some(offset);
            }
            offset += ty.size();
        }
        None
    }

    pub fn type_of(&self, member: &str) -> Option<&Type> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, ty)| ty)
    }
}

/// A union type: every member overlaps at offset 0
#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    members: Vec<(String, Type)>,
}

impl UnionType {
    pub fn new(members: Vec<(String, Type)>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[(String, Type)] {
        &self.members
    }

    /// Total size: the largest member size
    pub fn size(&self) -> u16 {
        self.members
            .iter()
            .map(|(_, ty)| ty.size())
            .max()
            .unwrap_or(0)
    }

    /// Every union member lives at offset 0
    pub fn offset_of(&self, member: &str) -> Option<u16> {
        self.type_of(member).map(|_| 0)
    }

    pub fn type_of(&self, member: &str) -> Option<&Type> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, ty)| ty)
    }
}

/// A function type
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub ret: Box<Type>,
    pub params: Vec<Type>,
}

impl FunctionType {
    pub fn new(ret: Type, params: Vec<Type>) -> Self {
        Self {
            ret: Box::new(ret),
            params,
        }
    }
}

/// The built-in type-name table: `char`/`short`/`int` are one word,
/// `long` is two, and each has an `unsigned` variant.
pub fn builtins() -> HashMap<String, Type> {
    let mut table = HashMap::new();
    for (name, ty) in [
        ("char", INT16),
        ("short", INT16),
        ("int", INT16),
        ("long", INT32),
    ] {
        table.insert(name.to_string(), Type::Integral(ty));
        table.insert(format!("unsigned {}", name), Type::Integral(ty.as_unsigned()));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_ranges() {
        assert_eq!(INT16.min_value(), -32768);
        assert_eq!(INT16.max_value(), 32767);
        assert_eq!(UINT16.min_value(), 0);
        assert_eq!(UINT16.max_value(), 65535);
        assert_eq!(INT32.min_value(), -2147483648);
        assert_eq!(INT32.max_value(), 2147483647);
        assert_eq!(UINT32.max_value(), 4294967295);
    }

    #[test]
    fn test_range_cardinality_and_zero() {
        for ty in [INT16, UINT16, INT32, UINT32] {
            let count = ty.max_value() - ty.min_value() + 1;
            assert_eq!(count, 1i64 << ty.bits());
            assert!(ty.min_value() <= 0 && 0 <= ty.max_value());
        }
    }

    #[test]
    fn test_signedness_conversion_preserves_size() {
        assert_eq!(INT32.as_unsigned().size, 2);
        assert_eq!(UINT16.as_signed().size, 1);
        assert_eq!(UINT32.as_signed(), INT32);
    }

    #[test]
    fn test_signedness_conversion_idempotent() {
        assert_eq!(INT16.as_signed(), INT16);
        assert_eq!(UINT16.as_unsigned(), UINT16);
        assert_eq!(INT32.as_unsigned().as_unsigned(), UINT32);
        assert_eq!(UINT32.as_signed().as_signed(), INT32);
    }

    #[test]
    fn test_struct_layout() {
        let s = StructType::new(vec![
            ("a".to_string(), Type::Integral(INT16)),
            ("b".to_string(), Type::Integral(INT32)),
            ("c".to_string(), Type::Integral(INT16)),
        ]);
        assert_eq!(s.offset_of("a"), Some(0));
        assert_eq!(s.offset_of("b"), Some(1));
        assert_eq!(s.offset_of("c"), Some(3));
        assert_eq!(s.offset_of("missing"), None);
        assert_eq!(s.size(), 4);
    }

    #[test]
    fn test_union_layout() {
        let u = UnionType::new(vec![
            ("a".to_string(), Type::Integral(INT16)),
            ("b".to_string(), Type::Integral(INT32)),
            ("c".to_string(), Type::Integral(INT16)),
        ]);
        assert_eq!(u.offset_of("a"), Some(0));
        assert_eq!(u.offset_of("b"), Some(0));
        assert_eq!(u.offset_of("c"), Some(0));
        assert_eq!(u.size(), 2);
    }

    #[test]
    fn test_builtin_table() {
        let table = builtins();
        assert_eq!(table.get("char"), Some(&Type::Integral(INT16)));
        assert_eq!(table.get("short"), Some(&Type::Integral(INT16)));
        assert_eq!(table.get("int"), Some(&Type::Integral(INT16)));
        assert_eq!(table.get("long"), Some(&Type::Integral(INT32)));
        assert_eq!(table.get("unsigned int"), Some(&Type::Integral(UINT16)));
        assert_eq!(table.get("unsigned long"), Some(&Type::Integral(UINT32)));
    }

    #[test]
    fn test_type_sizes() {
        assert_eq!(Type::Void.size(), 0);
        assert_eq!(Type::Integral(INT32).size(), 2);
        let func = Type::Function(FunctionType::new(Type::Integral(INT16), vec![]));
        assert_eq!(func.size(), 1);
    }
}
