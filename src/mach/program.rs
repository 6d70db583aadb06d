use super::opcode::Operand;
use super::{Address, Limits, Opcode, Stack, Type, Val};
use crate::error;
use crate::lang::Error;
use std::borrow::Cow;

type Result<T> = std::result::Result<T, Error>;

/// Constant table entry: a tag and a position in the pool that holds it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    Number(usize),
    Boolean(usize),
    String(usize),
}

/// ## Compiled unit
///
/// A bounded instruction stream plus the append-only constant pools its
/// `Constant` instructions refer to. Booleans share the number pool as
/// 0 and 1. Strings live NUL-terminated in one byte arena and are
/// interned, so equal text always has the same offset.

#[derive(Debug, Clone)]
pub struct Program {
    code: Stack<u8>,
    constants: Stack<Constant>,
    numbers: Stack<i32>,
    strings: Stack<u8>,
}

impl Program {
    pub fn new(limits: &Limits) -> Program {
        Program {
            code: Stack::new(limits.instructions, "PROGRAM TOO LARGE"),
            constants: Stack::new(limits.constants, "TOO MANY CONSTANTS"),
            numbers: Stack::new(limits.numbers, "TOO MANY NUMBERS"),
            strings: Stack::new(limits.string_bytes, "OUT OF STRING SPACE"),
        }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn code(&self) -> &[u8] {
        self.code.as_slice()
    }

    pub fn byte(&self, addr: Address) -> Option<u8> {
        self.code.get(addr).copied()
    }

    pub fn addr(&self, at: Address) -> Option<Address> {
        let lo = self.byte(at)?;
        let hi = self.byte(at + 1)?;
        Some(u16::from_le_bytes([lo, hi]) as Address)
    }

    /// Appends an opcode, returning its address.
    pub fn emit(&mut self, op: Opcode) -> Result<Address> {
        self.code.push_index(op as u8)
    }

    pub fn emit_u8(&mut self, byte: u8) -> Result<()> {
        self.code.push(byte)
    }

    pub fn emit_addr(&mut self, addr: Address) -> Result<()> {
        if addr > u16::MAX as Address {
            return Err(error!(OutOfMemory; "PROGRAM TOO LARGE"));
        }
        for byte in (addr as u16).to_le_bytes().iter() {
            self.code.push(*byte)?;
        }
        Ok(())
    }

    /// Emits a jump with a zero target, returning the target's address
    /// for `patch_jump`.
    pub fn emit_jump(&mut self, op: Opcode) -> Result<Address> {
        debug_assert_eq!(op.operands(), &[Operand::Addr]);
        self.emit(op)?;
        let at = self.len();
        self.emit_addr(0)?;
        Ok(at)
    }

    /// Points the jump target at `at` to the current end of code.
    pub fn patch_jump(&mut self, at: Address) -> Result<()> {
        let target = self.len();
        self.patch_addr(at, target)
    }

    pub fn patch_addr(&mut self, at: Address, target: Address) -> Result<()> {
        let bytes = (target as u16).to_le_bytes();
        for (i, byte) in bytes.iter().enumerate() {
            match self.code.get_mut(at + i) {
                Some(slot) => *slot = *byte,
                None => return Err(error!(InternalError; "PATCH OUT OF RANGE")),
            }
        }
        Ok(())
    }

    pub fn add_number(&mut self, value: i32) -> Result<usize> {
        let found = self.constants.iter().position(|c| match c {
            Constant::Number(i) => self.numbers.get(*i) == Some(&value),
            _ => false,
        });
        if let Some(index) = found {
            return Ok(index);
        }
        self.constants.reserve(1)?;
        let slot = self.numbers.push_index(value)?;
        self.constants.push_index(Constant::Number(slot))
    }

    pub fn add_boolean(&mut self, value: bool) -> Result<usize> {
        let value = value as i32;
        let found = self.constants.iter().position(|c| match c {
            Constant::Boolean(i) => self.numbers.get(*i) == Some(&value),
            _ => false,
        });
        if let Some(index) = found {
            return Ok(index);
        }
        self.constants.reserve(1)?;
        let slot = self.numbers.push_index(value)?;
        self.constants.push_index(Constant::Boolean(slot))
    }

    pub fn add_string(&mut self, text: &str) -> Result<usize> {
        let found = self.constants.iter().position(|c| match c {
            Constant::String(offset) => self.string_at(*offset) == text,
            _ => false,
        });
        if let Some(index) = found {
            return Ok(index);
        }
        self.constants.reserve(1)?;
        self.strings.reserve(text.len() + 1)?;
        let offset = self.strings.len();
        for byte in text.bytes() {
            self.strings.push(byte)?;
        }
        self.strings.push(0)?;
        self.constants.push_index(Constant::String(offset))
    }

    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    pub fn constant(&self, index: usize) -> Option<Val> {
        match *self.constants.get(index)? {
            Constant::Number(i) => self.numbers.get(i).map(|n| Val::Int(*n)),
            Constant::Boolean(i) => self.numbers.get(i).map(|n| Val::Bool(*n != 0)),
            Constant::String(offset) => Some(Val::Str(offset)),
        }
    }

    /// Text of the NUL-terminated string starting at `offset`.
    pub fn string_at(&self, offset: usize) -> Cow<'_, str> {
        let arena = self.strings.as_slice();
        let tail = arena.get(offset..).unwrap_or(&[]);
        let end = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
        String::from_utf8_lossy(&tail[..end])
    }

    /// Decodes one instruction for listings: opcode, operand values, next address.
    pub fn decode(&self, addr: Address) -> Option<(Opcode, Vec<(Operand, usize)>, Address)> {
        let op = Opcode::from_byte(self.byte(addr)?)?;
        let mut at = addr + 1;
        let mut operands = vec![];
        for operand in op.operands() {
            let value = match operand {
                Operand::Addr => self.addr(at)?,
                _ => self.byte(at)? as usize,
            };
            operands.push((*operand, value));
            at += operand.width();
        }
        Some((op, operands, at))
    }

    fn describe_constant(&self, index: usize) -> String {
        match self.constant(index) {
            Some(Val::Int(n)) => n.to_string(),
            Some(Val::Bool(b)) => b.to_string(),
            Some(Val::Str(offset)) => format!("\"{}\"", self.string_at(offset)),
            _ => "?".to_string(),
        }
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No opcodes.");
        }
        let mut addr = 0;
        while addr < self.len() {
            match self.decode(addr) {
                Some((op, operands, next)) => {
                    write!(f, "{:04} {}", addr, op)?;
                    for (operand, value) in operands {
                        match operand {
                            Operand::Type => write!(f, " {}", Type::from_byte(value as u8))?,
                            Operand::Addr => write!(f, " @{:04}", value)?,
                            Operand::Index => {
                                write!(f, " {} ({})", value, self.describe_constant(value))?
                            }
                            _ => write!(f, " {}", value)?,
                        }
                    }
                    writeln!(f)?;
                    addr = next;
                }
                None => {
                    writeln!(f, "{:04} ?{}", addr, self.byte(addr).unwrap_or(0))?;
                    addr += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    #[test]
    fn test_patch_jump() {
        let mut p = Program::new(&Limits::default());
        let at = p.emit_jump(Opcode::JumpIfFalse).unwrap();
        assert_eq!(p.addr(at), Some(0));
        p.emit(Opcode::Print).unwrap();
        p.patch_jump(at).unwrap();
        assert_eq!(p.addr(at), Some(4));
        assert_eq!(p.code(), &[Opcode::JumpIfFalse as u8, 4, 0, Opcode::Print as u8]);
    }

    #[test]
    fn test_constants_are_interned() {
        let mut p = Program::new(&Limits::default());
        let a = p.add_number(7).unwrap();
        let b = p.add_string("seven").unwrap();
        let t = p.add_boolean(true).unwrap();
        assert_eq!(p.add_number(7).unwrap(), a);
        assert_eq!(p.add_string("seven").unwrap(), b);
        assert_eq!(p.add_boolean(true).unwrap(), t);
        assert_ne!(p.add_number(1).unwrap(), t);
        assert_eq!(p.constant(a), Some(Val::Int(7)));
        assert_eq!(p.constant(t), Some(Val::Bool(true)));
        match p.constant(b) {
            Some(Val::Str(offset)) => assert_eq!(p.string_at(offset), "seven"),
            other => panic!("{:?}", other),
        }
        assert_eq!(p.constant_count(), 4);
    }

    #[test]
    fn test_string_space() {
        let limits = Limits {
            string_bytes: 8,
            ..Limits::default()
        };
        let mut p = Program::new(&limits);
        p.add_string("1234567").unwrap();
        let e = p.add_string("x").unwrap_err();
        assert_eq!(e.code(), ErrorCode::OutOfMemory);
        assert_eq!(p.constant_count(), 1);
    }

    #[test]
    fn test_code_capacity() {
        let limits = Limits {
            instructions: 2,
            ..Limits::default()
        };
        let mut p = Program::new(&limits);
        assert!(p.emit_jump(Opcode::Jump).is_err());
    }

    #[test]
    fn test_listing() {
        let mut p = Program::new(&Limits::default());
        assert_eq!(p.to_string(), "No opcodes.\n");
        let index = p.add_number(6).unwrap();
        p.emit(Opcode::Constant).unwrap();
        p.emit_u8(index as u8).unwrap();
        p.emit(Opcode::Print).unwrap();
        p.emit(Opcode::Halt).unwrap();
        assert_eq!(
            p.to_string(),
            "0000 CONSTANT 0 (6)\n0002 PRINT\n0003 HALT\n"
        );
    }
}
