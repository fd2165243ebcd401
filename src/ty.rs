//! Type model.
//!
//! The four primitives form a closed set compared by value. Arrays are
//! structural: two array types are equal when their element types and sizes are.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Char,
    Int,
    Float,
    /// `size` elements of type `of`.
    Array { of: Box<Type>, size: usize },
}

impl Type {
    pub fn array(of: Type, size: usize) -> Self {
        Type::Array { of: Box::new(of), size }
    }

    /// Looks up a basic type by its keyword.
    pub fn from_keyword(name: &str) -> Option<Type> {
        match name {
            "bool" => Some(Type::Bool),
            "char" => Some(Type::Char),
            "int" => Some(Type::Int),
            "float" => Some(Type::Float),
            _ => None,
        }
    }

    /// Storage size in bytes, saturating at `usize::MAX`.
    pub fn width(&self) -> usize {
        self.checked_width().unwrap_or(usize::MAX)
    }

    /// Storage size in bytes, or `None` when it overflows `usize`.
    pub fn checked_width(&self) -> Option<usize> {
        match self {
            Type::Bool | Type::Char => Some(1),
            Type::Int => Some(4),
            Type::Float => Some(8),
            Type::Array { of, size } => of.checked_width()?.checked_mul(*size),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.rank().is_some()
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Char | Type::Int)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Element type of an array, `None` for anything else.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array { of, .. } => Some(of),
            _ => None,
        }
    }

    // char < int < float
    fn rank(&self) -> Option<u8> {
        match self {
            Type::Char => Some(0),
            Type::Int => Some(1),
            Type::Float => Some(2),
            Type::Bool | Type::Array { .. } => None,
        }
    }

    /// Numeric promotion: the wider of two numeric types, or `None` when either
    /// operand is not numeric.
    pub fn max(t1: &Type, t2: &Type) -> Option<Type> {
        let (r1, r2) = (t1.rank()?, t2.rank()?);
        Some(if r1 >= r2 { t1.clone() } else { t2.clone() })
    }

    /// Whether a value of type `value` may be stored into a location of type `self`.
    pub fn accepts(&self, value: &Type) -> bool {
        (self.is_numeric() && value.is_numeric()) || (*self == Type::Bool && *value == Type::Bool)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Char => f.write_str("char"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::Array { .. } => {
                // dimensions print outermost first: int[2][3]
                let mut dims = Vec::new();
                let mut base = self;
                while let Type::Array { of, size } = base {
                    dims.push(*size);
                    base = of;
                }
                write!(f, "{}", base)?;
                for d in dims {
                    write!(f, "[{}]", d)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMERIC: [Type; 3] = [Type::Char, Type::Int, Type::Float];

    #[test]
    fn max_is_commutative_and_picks_higher_rank() {
        for (i, a) in NUMERIC.iter().enumerate() {
            for (j, b) in NUMERIC.iter().enumerate() {
                let expected = NUMERIC[i.max(j)].clone();
                assert_eq!(Type::max(a, b), Some(expected.clone()));
                assert_eq!(Type::max(b, a), Some(expected));
            }
        }
    }

    #[test]
    fn max_with_bool_has_no_common_type() {
        let all = [Type::Bool, Type::Char, Type::Int, Type::Float];
        for t in &all {
            assert_eq!(Type::max(&Type::Bool, t), None);
            assert_eq!(Type::max(t, &Type::Bool), None);
        }
        assert_eq!(Type::max(&Type::array(Type::Int, 2), &Type::Int), None);
    }

    #[test]
    fn primitive_widths() {
        assert_eq!(Type::Bool.width(), 1);
        assert_eq!(Type::Char.width(), 1);
        assert_eq!(Type::Int.width(), 4);
        assert_eq!(Type::Float.width(), 8);
    }

    #[test]
    fn arrays_are_structural() {
        let a = Type::array(Type::array(Type::Int, 3), 2);
        assert_eq!(a.width(), 24);
        assert_eq!(a, Type::array(Type::array(Type::Int, 3), 2));
        assert_ne!(a, Type::array(Type::array(Type::Int, 2), 3));
        assert_eq!(a.element(), Some(&Type::array(Type::Int, 3)));
        assert_eq!(a.to_string(), "int[2][3]");
        assert!(!a.is_numeric());
    }

    #[test]
    fn huge_arrays_have_no_width() {
        let huge = Type::array(Type::Int, usize::MAX / 2);
        assert_eq!(huge.checked_width(), None);
        assert_eq!(huge.width(), usize::MAX);
        assert_eq!(Type::array(Type::Char, usize::MAX).checked_width(), Some(usize::MAX));
    }

    #[test]
    fn assignability() {
        assert!(Type::Int.accepts(&Type::Float));
        assert!(Type::Char.accepts(&Type::Int));
        assert!(Type::Bool.accepts(&Type::Bool));
        assert!(!Type::Bool.accepts(&Type::Int));
        assert!(!Type::Int.accepts(&Type::Bool));
        assert!(!Type::array(Type::Int, 2).accepts(&Type::array(Type::Int, 2)));
    }
}
