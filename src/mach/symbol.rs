use super::{Limits, Stack, Type};
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Parameter types and return type of a compiled function.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<Type>,
    pub ret: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub slot: usize,
    pub signature: Option<Signature>,
}

/// ## Global names
///
/// Slot numbers are handed out in declaration order, so a symbol's
/// position in the table is its global slot.

#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: Stack<Symbol>,
    name_len: usize,
}

impl SymbolTable {
    pub fn new(limits: &Limits) -> SymbolTable {
        SymbolTable {
            entries: Stack::new(limits.globals, "TOO MANY GLOBALS"),
            name_len: limits.name_len,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.entries.iter().find(|s| s.name == name)
    }

    pub fn define(
        &mut self,
        name: &str,
        ty: Type,
        signature: Option<Signature>,
    ) -> Result<&Symbol> {
        check_name(name, self.name_len)?;
        if self.find(name).is_some() {
            return Err(error!(Redefined; format!("'{}'", name)));
        }
        let slot = self.entries.len();
        self.entries.push(Symbol {
            name: name.to_string(),
            ty,
            slot,
            signature,
        })?;
        self.entries
            .last()
            .ok_or_else(|| error!(InternalError; "SYMBOL TABLE"))
    }
}

/// ## Parameter names of the function being compiled
///
/// Scope is flat: parameter *i* is local slot *i*.

#[derive(Debug, Clone)]
pub struct LocalNames {
    names: Stack<(String, Type)>,
    name_len: usize,
}

impl LocalNames {
    pub fn new(limits: &Limits) -> LocalNames {
        LocalNames {
            names: Stack::new(limits.locals, "TOO MANY PARAMETERS"),
            name_len: limits.name_len,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn types(&self) -> Vec<Type> {
        self.names.iter().map(|(_, ty)| *ty).collect()
    }

    pub fn find(&self, name: &str) -> Option<(usize, Type)> {
        self.names
            .iter()
            .position(|(n, _)| n == name)
            .and_then(|slot| self.names.get(slot).map(|(_, ty)| (slot, *ty)))
    }

    pub fn add(&mut self, name: &str, ty: Type) -> Result<usize> {
        check_name(name, self.name_len)?;
        if self.find(name).is_some() {
            return Err(error!(Redefined; format!("PARAMETER '{}'", name)));
        }
        self.names.push_index((name.to_string(), ty))
    }
}

fn check_name(name: &str, name_len: usize) -> Result<()> {
    if name.len() > name_len {
        Err(error!(NameTooLong; format!("'{}'", name)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    #[test]
    fn test_slots_follow_declaration_order() {
        let mut t = SymbolTable::new(&Limits::default());
        assert_eq!(t.define("x", Type::Int, None).unwrap().slot, 0);
        assert_eq!(t.define("y", Type::Str, None).unwrap().slot, 1);
        assert_eq!(t.find("y").map(|s| s.ty), Some(Type::Str));
        assert_eq!(t.find("z"), None);
    }

    #[test]
    fn test_redefinition() {
        let mut t = SymbolTable::new(&Limits::default());
        t.define("x", Type::Int, None).unwrap();
        let e = t.define("x", Type::Bool, None).unwrap_err();
        assert_eq!(e.code(), ErrorCode::Redefined);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_name_and_table_bounds() {
        let limits = Limits {
            globals: 1,
            ..Limits::default()
        };
        let mut t = SymbolTable::new(&limits);
        let e = t.define("abcdefghijklmnop", Type::Int, None).unwrap_err();
        assert_eq!(e.code(), ErrorCode::NameTooLong);
        t.define("abcdefghijklmno", Type::Int, None).unwrap();
        let e = t.define("b", Type::Int, None).unwrap_err();
        assert_eq!(e.code(), ErrorCode::OutOfMemory);
    }

    #[test]
    fn test_locals() {
        let mut l = LocalNames::new(&Limits::default());
        assert_eq!(l.add("a", Type::Int).unwrap(), 0);
        assert_eq!(l.add("b", Type::Arr).unwrap(), 1);
        assert_eq!(l.find("b"), Some((1, Type::Arr)));
        assert_eq!(l.add("a", Type::Int).unwrap_err().code(), ErrorCode::Redefined);
        assert_eq!(l.types(), vec![Type::Int, Type::Arr]);
    }
}
