use super::super::semantics::SemanticError;

/**
The types which a value can have in Mica.  This covers the two scalar
types along with fixed and open arrays over them, the `Proc` type used
as the "returns nothing" return type, and the `Func` wrapper which is
the type of a function identifier when one is named outside of a call.
 */
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Int,
    Char,
    Array(Box<Type>, ArraySize),
    Proc,
    Func(Box<Type>),
}

/// The outermost dimension of an array type.  `Open` only ever appears
/// on the outermost dimension of a by-reference parameter (`char[]`);
/// the parser fixes the representation at its boundary so no sentinel
/// values travel through the tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArraySize {
    Fixed(u32),
    Open,
}

impl Type {
    pub fn array(elem: Type, size: ArraySize) -> Type {
        Type::Array(Box::new(elem), size)
    }

    /// Structural type equality with the open-dimension rule: two array
    /// types match when either side's outermost dimension is open; all
    /// deeper dimensions must match exactly.  This is what makes a
    /// `char[5]` argument acceptable for a `char[]` parameter.
    pub fn matches(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Array(le, ls), Type::Array(re, rs)) => {
                let size_ok = match (ls, rs) {
                    (ArraySize::Open, _) | (_, ArraySize::Open) => true,
                    (ArraySize::Fixed(l), ArraySize::Fixed(r)) => l == r,
                };
                size_ok && le == re
            }
            _ => self == other,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Int | Type::Char)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(..))
    }

    /// The element type of an array, one dimension in.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(elem, _) => Some(elem),
            _ => None,
        }
    }

    /// The scalar type at the innermost element position.
    pub fn scalar(&self) -> &Type {
        match self {
            Type::Array(elem, _) => elem.scalar(),
            t => t,
        }
    }

    /// Total number of scalar elements a value of this type occupies.
    /// Only defined for scalars and fully fixed arrays; open arrays have
    /// no storage of their own.
    pub fn element_count(&self) -> Option<u32> {
        match self {
            Type::Int | Type::Char => Some(1),
            Type::Array(elem, ArraySize::Fixed(n)) => {
                elem.element_count().map(|c| c.checked_mul(*n)).flatten()
            }
            Type::Array(_, ArraySize::Open) => None,
            Type::Proc | Type::Func(_) => None,
        }
    }

    /// Checks that no dimension of this type is declared as zero.
    pub fn check_dims(&self, name: &str, line: u32) -> Result<(), SemanticError> {
        match self {
            Type::Array(elem, size) => {
                if *size == ArraySize::Fixed(0) {
                    Err(SemanticError::zero_array_dim(line, name))
                } else {
                    elem.check_dims(name, line)
                }
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Char => f.write_str("char"),
            Type::Array(..) => {
                f.write_fmt(format_args!("{}{}", self.scalar(), DimChain(self)))
            }
            Type::Proc => f.write_str("proc"),
            Type::Func(ret) => f.write_fmt(format_args!("function returning {}", ret)),
        }
    }
}

/// Renders the dimension chain of an array type outermost-first, the way
/// it is written in source (`int[2][3]`, `char[]`).
struct DimChain<'a>(&'a Type);

impl<'a> std::fmt::Display for DimChain<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ty = self.0;
        while let Type::Array(elem, size) = ty {
            match size {
                ArraySize::Fixed(n) => f.write_fmt(format_args!("[{}]", n))?,
                ArraySize::Open => f.write_str("[]")?,
            }
            ty = elem;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_equality() {
        assert!(Type::Int.matches(&Type::Int));
        assert!(Type::Char.matches(&Type::Char));
        assert!(!Type::Int.matches(&Type::Char));
        assert!(!Type::Int.matches(&Type::Proc));
    }

    #[test]
    fn open_dimension_matches_any_fixed() {
        let open = Type::array(Type::Char, ArraySize::Open);
        let five = Type::array(Type::Char, ArraySize::Fixed(5));
        let nine = Type::array(Type::Char, ArraySize::Fixed(9));

        assert!(open.matches(&five));
        assert!(five.matches(&open));
        assert!(open.matches(&nine));
        assert!(!five.matches(&nine));

        let ints = Type::array(Type::Int, ArraySize::Fixed(5));
        assert!(!open.matches(&ints));
    }

    #[test]
    fn inner_dimensions_must_match_exactly() {
        // int[][3] vs int[7][3] match; int[][3] vs int[7][4] do not.
        let inner3 = Type::array(Type::Int, ArraySize::Fixed(3));
        let inner4 = Type::array(Type::Int, ArraySize::Fixed(4));
        let open3 = Type::array(inner3.clone(), ArraySize::Open);
        let fixed3 = Type::array(inner3, ArraySize::Fixed(7));
        let fixed4 = Type::array(inner4, ArraySize::Fixed(7));

        assert!(open3.matches(&fixed3));
        assert!(!open3.matches(&fixed4));
    }

    #[test]
    fn element_counts() {
        let m = Type::array(
            Type::array(Type::Int, ArraySize::Fixed(3)),
            ArraySize::Fixed(2),
        );
        assert_eq!(m.element_count(), Some(6));
        assert_eq!(Type::Char.element_count(), Some(1));
        assert_eq!(
            Type::array(Type::Char, ArraySize::Open).element_count(),
            None
        );
    }

    #[test]
    fn display_renders_source_syntax() {
        let m = Type::array(
            Type::array(Type::Int, ArraySize::Fixed(3)),
            ArraySize::Fixed(2),
        );
        assert_eq!(format!("{}", m), "int[2][3]");
        assert_eq!(
            format!("{}", Type::array(Type::Char, ArraySize::Open)),
            "char[]"
        );
    }
}
