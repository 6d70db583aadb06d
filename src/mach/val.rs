use crate::lang::token::Word;

/// Static type of a variable, parameter or expression.
/// The byte value is what instructions carry as a type operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Type {
    Int = 0,
    Str = 1,
    Bool = 2,
    Float = 3,
    Func = 4,
    Arr = 5,
    Unknown = 6,
}

impl Type {
    pub fn from_byte(byte: u8) -> Type {
        use Type::*;
        match byte {
            0 => Int,
            1 => Str,
            2 => Bool,
            3 => Float,
            4 => Func,
            5 => Arr,
            _ => Unknown,
        }
    }

    pub fn from_word(word: Word) -> Option<Type> {
        match word {
            Word::Int => Some(Type::Int),
            Word::Str => Some(Type::Str),
            Word::Bool => Some(Type::Bool),
            Word::Float => Some(Type::Float),
            Word::Arr => Some(Type::Arr),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Type::*;
        match self {
            Int => write!(f, "int"),
            Str => write!(f, "str"),
            Bool => write!(f, "bool"),
            Float => write!(f, "float"),
            Func => write!(f, "func"),
            Arr => write!(f, "arr"),
            Unknown => write!(f, "unknown"),
        }
    }
}

/// ## Runtime value
///
/// One fixed-width slot shared by the operand stack, globals and locals.
/// Strings are offsets into the program's string arena; functions and
/// arrays are indices into the machine's pools. Nothing is copied but the
/// reference. There are no float values.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Val {
    Int(i32),
    Bool(bool),
    Str(usize),
    Function(usize),
    Array(usize),
}

impl Val {
    pub fn tag(&self) -> Type {
        match self {
            Val::Int(_) => Type::Int,
            Val::Bool(_) => Type::Bool,
            Val::Str(_) => Type::Str,
            Val::Function(_) => Type::Func,
            Val::Array(_) => Type::Arr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_byte_round_trip() {
        for ty in &[Type::Int, Type::Str, Type::Bool, Type::Float, Type::Func, Type::Arr] {
            assert_eq!(Type::from_byte(*ty as u8), *ty);
        }
        assert_eq!(Type::from_byte(200), Type::Unknown);
    }

    #[test]
    fn test_tag() {
        assert_eq!(Val::Int(3).tag(), Type::Int);
        assert_eq!(Val::Bool(false).tag(), Type::Bool);
        assert_eq!(Val::Array(0).tag(), Type::Arr);
    }
}
