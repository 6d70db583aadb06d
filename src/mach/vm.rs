use super::{Address, Limits, Opcode, Program, Stack, Type, Val};
use crate::error;
use crate::lang::Error;
use std::fmt::Write as _;
use tracing::{debug, trace};

type Result<T> = std::result::Result<T, Error>;

/// Runs `program` to completion with default limits, writing `print`
/// output to `out` as it is produced.
pub fn execute<W: std::io::Write>(program: &Program, out: &mut W) -> Result<()> {
    execute_with(program, &Limits::default(), out)
}

/// As `execute`, with explicit machine bounds.
pub fn execute_with<W: std::io::Write>(program: &Program, limits: &Limits, out: &mut W) -> Result<()> {
    let mut vm = Vm::new(limits);
    let mut text = String::new();
    loop {
        let status = vm.execute(program, 1024, &mut text);
        if !text.is_empty() {
            out.write_all(text.as_bytes())
                .map_err(|e| error!(InternalError; e.to_string()))?;
            text.clear();
        }
        if status? == Status::Halted {
            return Ok(());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Running,
    Halted,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    return_address: Address,
    arity: usize,
    stack_offset: usize,
    return_type: Type,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Function {
    entry: Address,
    arity: usize,
    ret: Type,
}

/// ## Bounded stack machine
///
/// Every pool is allocated to its limit up front and overflow is an
/// error, never growth. A call frame's arguments stay where the caller
/// pushed them: local slot `i` is stack entry `stack_offset + 1 + i`,
/// and `stack_offset` holds the callee itself.

pub struct Vm {
    ip: Address,
    halted: bool,
    stack: Stack<Val>,
    frames: Stack<Frame>,
    globals: Vec<Option<Val>>,
    functions: Stack<Function>,
    arrays: Stack<Vec<i32>>,
    array_len: usize,
}

impl Vm {
    pub fn new(limits: &Limits) -> Vm {
        let limits = limits.clone().normalized();
        Vm {
            ip: 0,
            halted: false,
            stack: Stack::new(limits.stack, "STACK OVERFLOW"),
            frames: Stack::new(limits.frames, "TOO MANY CALL FRAMES"),
            globals: vec![None; limits.globals],
            functions: Stack::new(limits.functions, "TOO MANY FUNCTIONS"),
            arrays: Stack::new(limits.arrays, "TOO MANY ARRAYS"),
            array_len: limits.array_len,
        }
    }

    /// Discards all state so another program can run from address 0.
    pub fn reset(&mut self) {
        self.ip = 0;
        self.halted = false;
        self.stack.clear();
        self.frames.clear();
        for global in self.globals.iter_mut() {
            *global = None;
        }
        self.functions.clear();
        self.arrays.clear();
    }

    pub fn ip(&self) -> Address {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn global(&self, slot: usize) -> Option<Val> {
        self.globals.get(slot).copied().flatten()
    }

    /// Elements of a live array.
    pub fn array(&self, index: usize) -> Option<&[i32]> {
        self.arrays.get(index).map(|a| a.as_slice())
    }

    /// Runs at most `cycles` instructions, appending printed lines to
    /// `out`. Errors carry the address of the failing instruction and
    /// halt the machine.
    pub fn execute(&mut self, program: &Program, cycles: usize, out: &mut String) -> Result<Status> {
        for _ in 0..cycles {
            if self.halted {
                break;
            }
            let addr = self.ip;
            if let Err(error) = self.step(program, out) {
                self.halted = true;
                let error = error.in_address(addr);
                debug!(%error, "runtime error");
                return Err(error);
            }
        }
        Ok(if self.halted {
            Status::Halted
        } else {
            Status::Running
        })
    }

    fn read_u8(&mut self, program: &Program) -> Result<usize> {
        match program.byte(self.ip) {
            Some(byte) => {
                self.ip += 1;
                Ok(byte as usize)
            }
            None => Err(error!(InternalError; "TRUNCATED INSTRUCTION")),
        }
    }

    fn read_addr(&mut self, program: &Program) -> Result<Address> {
        match program.addr(self.ip) {
            Some(addr) => {
                self.ip += 2;
                Ok(addr)
            }
            None => Err(error!(InternalError; "TRUNCATED INSTRUCTION")),
        }
    }

    fn frame(&self) -> Result<Frame> {
        match self.frames.last() {
            Some(frame) => Ok(*frame),
            None => Err(error!(InternalError; "NO ACTIVE CALL FRAME")),
        }
    }

    fn local_index(&self, slot: usize) -> Result<usize> {
        let frame = self.frame()?;
        let index = frame.stack_offset + 1 + slot;
        if index < self.stack.len() {
            Ok(index)
        } else {
            Err(error!(InternalError; "LOCAL SLOT OUT OF RANGE"))
        }
    }

    fn pop_int(&mut self) -> Result<i32> {
        match self.stack.pop()? {
            Val::Int(n) => Ok(n),
            val => Err(error!(TypeMismatch; format!("EXPECTED int BUT FOUND {}", val.tag()))),
        }
    }

    fn pop_bool(&mut self) -> Result<bool> {
        match self.stack.pop()? {
            Val::Bool(b) => Ok(b),
            val => Err(error!(TypeMismatch; format!("EXPECTED bool BUT FOUND {}", val.tag()))),
        }
    }

    fn pop_2_int(&mut self) -> Result<(i32, i32)> {
        match self.stack.pop_2()? {
            (Val::Int(lhs), Val::Int(rhs)) => Ok((lhs, rhs)),
            (Val::Int(_), val) | (val, _) => {
                Err(error!(TypeMismatch; format!("EXPECTED int BUT FOUND {}", val.tag())))
            }
        }
    }

    fn arithmetic(&mut self, op: Opcode) -> Result<()> {
        let (lhs, rhs) = self.pop_2_int()?;
        if rhs == 0 && (op == Opcode::Divide || op == Opcode::Modulo) {
            return Err(error!(DivisionByZero));
        }
        let result = match op {
            Opcode::Add => lhs.checked_add(rhs),
            Opcode::Subtract => lhs.checked_sub(rhs),
            Opcode::Multiply => lhs.checked_mul(rhs),
            Opcode::Divide => lhs.checked_div(rhs),
            Opcode::Modulo => lhs.checked_rem(rhs),
            _ => return Err(error!(InternalError; format!("{} IS NOT ARITHMETIC", op))),
        };
        match result {
            Some(n) => self.stack.push(Val::Int(n)),
            None => Err(error!(Overflow)),
        }
    }

    fn compare(&mut self, op: Opcode) -> Result<()> {
        let (lhs, rhs) = self.pop_2_int()?;
        let result = match op {
            Opcode::Equals => lhs == rhs,
            Opcode::NotEquals => lhs != rhs,
            Opcode::GreaterThan => lhs > rhs,
            Opcode::GreaterOrEquals => lhs >= rhs,
            Opcode::LessThan => lhs < rhs,
            Opcode::LessOrEquals => lhs <= rhs,
            _ => return Err(error!(InternalError; format!("{} IS NOT A COMPARISON", op))),
        };
        self.stack.push(Val::Bool(result))
    }

    fn element(&self, array: Val, index: i32) -> Result<(usize, usize)> {
        let array = match array {
            Val::Array(array) => array,
            val => {
                return Err(error!(TypeMismatch; format!("EXPECTED arr BUT FOUND {}", val.tag())))
            }
        };
        let len = match self.arrays.get(array) {
            Some(elements) => elements.len(),
            None => return Err(error!(InternalError; "DANGLING ARRAY")),
        };
        if index < 0 || index as usize >= len {
            return Err(error!(SubscriptOutOfRange; format!("{} NOT IN 0..{}", index, len)));
        }
        Ok((array, index as usize))
    }

    fn call(&mut self, arity: usize) -> Result<()> {
        let offset = match self.stack.len().checked_sub(arity + 1) {
            Some(offset) => offset,
            None => return Err(error!(StackUnderflow)),
        };
        let function = match self.stack.get(offset) {
            Some(Val::Function(index)) => self.functions.get(*index).copied(),
            _ => None,
        };
        let function = match function {
            Some(function) => function,
            None => return Err(error!(IllegalFunctionCall; "NOT A FUNCTION")),
        };
        if function.arity != arity {
            return Err(error!(IllegalFunctionCall;
                format!("EXPECTED {} ARGUMENTS", function.arity)));
        }
        self.frames.push(Frame {
            return_address: self.ip,
            arity,
            stack_offset: offset,
            return_type: function.ret,
        })?;
        trace!(entry = function.entry, arity, depth = self.frames.len(), "call");
        self.ip = function.entry;
        Ok(())
    }

    fn ret(&mut self) -> Result<()> {
        let value = self.stack.pop()?;
        let frame = self.frame()?;
        if frame.return_type != Type::Unknown && value.tag() != frame.return_type {
            return Err(error!(TypeMismatch;
                format!("EXPECTED {} BUT FOUND {}", frame.return_type, value.tag())));
        }
        self.frames.pop()?;
        self.stack.truncate(frame.stack_offset);
        self.stack.push(value)?;
        self.ip = frame.return_address;
        Ok(())
    }

    fn define_function(&mut self, slot: usize, function: Function) -> Result<()> {
        let index = match self.functions.position(&function) {
            Some(index) => index,
            None => self.functions.push_index(function)?,
        };
        match self.globals.get_mut(slot) {
            Some(global) => {
                *global = Some(Val::Function(index));
                Ok(())
            }
            None => Err(error!(InternalError; "GLOBAL SLOT OUT OF RANGE")),
        }
    }

    fn print(&self, program: &Program, val: Val, out: &mut String) {
        // Writing to a String cannot fail.
        let _ = match val {
            Val::Int(n) => writeln!(out, "{}", n),
            Val::Bool(b) => writeln!(out, "{}", b),
            Val::Str(offset) => writeln!(out, "{}", program.string_at(offset)),
            Val::Function(index) => match self.functions.get(index) {
                Some(function) => writeln!(out, "<func {}>", function.entry),
                None => writeln!(out, "<func>"),
            },
            Val::Array(index) => {
                let elements = self.arrays.get(index).map(|a| a.as_slice()).unwrap_or(&[]);
                let text: Vec<String> = elements.iter().map(|n| n.to_string()).collect();
                writeln!(out, "[{}]", text.join(", "))
            }
        };
    }

    fn step(&mut self, program: &Program, out: &mut String) -> Result<()> {
        let op = match program.byte(self.ip) {
            Some(byte) => match Opcode::from_byte(byte) {
                Some(op) => op,
                None => return Err(error!(InternalError; format!("UNKNOWN OPCODE {}", byte))),
            },
            None => return Err(error!(InternalError; "RAN PAST END OF CODE")),
        };
        trace!(addr = self.ip, %op, depth = self.stack.len());
        self.ip += 1;
        match op {
            Opcode::Constant => {
                let index = self.read_u8(program)?;
                match program.constant(index) {
                    Some(val) => self.stack.push(val)?,
                    None => return Err(error!(InternalError; "UNDEFINED CONSTANT")),
                }
            }
            Opcode::Pop => {
                self.stack.pop()?;
            }
            Opcode::LoadGlobal => {
                let slot = self.read_u8(program)?;
                match self.globals.get(slot) {
                    Some(Some(val)) => self.stack.push(*val)?,
                    Some(None) => return Err(error!(UndefinedValue; format!("GLOBAL {}", slot))),
                    None => return Err(error!(InternalError; "GLOBAL SLOT OUT OF RANGE")),
                }
            }
            Opcode::StoreGlobal => {
                let slot = self.read_u8(program)?;
                let val = self.stack.pop()?;
                match self.globals.get_mut(slot) {
                    Some(global) => *global = Some(val),
                    None => return Err(error!(InternalError; "GLOBAL SLOT OUT OF RANGE")),
                }
            }
            Opcode::LoadLocal => {
                let slot = self.read_u8(program)?;
                let index = self.local_index(slot)?;
                match self.stack.get(index) {
                    Some(val) => {
                        let val = *val;
                        self.stack.push(val)?;
                    }
                    None => return Err(error!(InternalError; "LOCAL SLOT OUT OF RANGE")),
                }
            }
            Opcode::StoreLocal => {
                let slot = self.read_u8(program)?;
                let val = self.stack.pop()?;
                let index = self.local_index(slot)?;
                if let Some(local) = self.stack.get_mut(index) {
                    *local = val;
                }
            }
            Opcode::Add
            | Opcode::Subtract
            | Opcode::Multiply
            | Opcode::Divide
            | Opcode::Modulo => self.arithmetic(op)?,
            Opcode::Negate => {
                let n = self.pop_int()?;
                match n.checked_neg() {
                    Some(n) => self.stack.push(Val::Int(n))?,
                    None => return Err(error!(Overflow)),
                }
            }
            Opcode::Not => {
                let b = self.pop_bool()?;
                self.stack.push(Val::Bool(!b))?;
            }
            Opcode::And | Opcode::Or => {
                let rhs = self.pop_bool()?;
                let lhs = self.pop_bool()?;
                let result = if op == Opcode::And { lhs && rhs } else { lhs || rhs };
                self.stack.push(Val::Bool(result))?;
            }
            Opcode::Equals
            | Opcode::NotEquals
            | Opcode::GreaterThan
            | Opcode::GreaterOrEquals
            | Opcode::LessThan
            | Opcode::LessOrEquals => self.compare(op)?,
            Opcode::JumpIfFalse => {
                let target = self.read_addr(program)?;
                if !self.pop_bool()? {
                    self.ip = target;
                }
            }
            Opcode::Jump => {
                self.ip = self.read_addr(program)?;
            }
            Opcode::DefineFunction => {
                let slot = self.read_u8(program)?;
                let entry = self.read_addr(program)?;
                let arity = self.read_u8(program)?;
                let ret = Type::from_byte(self.read_u8(program)? as u8);
                self.define_function(slot, Function { entry, arity, ret })?;
            }
            Opcode::PushCallFrame => {
                let arity = self.read_u8(program)?;
                let ret = Type::from_byte(self.read_u8(program)? as u8);
                let frame = self.frame()?;
                if frame.arity != arity {
                    return Err(error!(IllegalFunctionCall;
                        format!("WRONG NUMBER OF ARGUMENTS: {} FOR {}", frame.arity, arity)));
                }
                if let Some(frame) = self.frames.last_mut() {
                    frame.return_type = ret;
                }
            }
            Opcode::BindLocal => {
                let slot = self.read_u8(program)?;
                let ty = Type::from_byte(self.read_u8(program)? as u8);
                let index = self.local_index(slot)?;
                let found = self.stack.get(index).map(|v| v.tag());
                if found != Some(ty) {
                    let found = found.unwrap_or(Type::Unknown);
                    return Err(error!(TypeMismatch;
                        format!("ARGUMENT {} EXPECTED {} BUT FOUND {}", slot, ty, found)));
                }
            }
            Opcode::CallFunction => {
                let arity = self.read_u8(program)?;
                self.call(arity)?;
            }
            Opcode::Return => self.ret()?,
            Opcode::MakeArray => {
                let count = self.read_u8(program)?;
                if count > self.array_len {
                    return Err(error!(OutOfMemory; "ARRAY TOO LONG"));
                }
                let mut elements = Vec::with_capacity(count);
                for val in self.stack.pop_n(count)? {
                    match val {
                        Val::Int(n) => elements.push(n),
                        val => {
                            return Err(error!(TypeMismatch;
                                format!("EXPECTED int BUT FOUND {}", val.tag())))
                        }
                    }
                }
                let index = self.arrays.push_index(elements)?;
                self.stack.push(Val::Array(index))?;
            }
            Opcode::IndexArray => {
                let index = self.pop_int()?;
                let array = self.stack.pop()?;
                let (array, index) = self.element(array, index)?;
                let n = self.arrays.get(array).and_then(|a| a.get(index)).copied();
                match n {
                    Some(n) => self.stack.push(Val::Int(n))?,
                    None => return Err(error!(InternalError; "DANGLING ARRAY")),
                }
            }
            Opcode::StoreElement => {
                let value = self.pop_int()?;
                let index = self.pop_int()?;
                let array = self.stack.pop()?;
                let (array, index) = self.element(array, index)?;
                if let Some(slot) = self.arrays.get_mut(array).and_then(|a| a.get_mut(index)) {
                    *slot = value;
                }
            }
            Opcode::Print => {
                let val = self.stack.pop()?;
                self.print(program, val, out);
            }
            Opcode::Halt => {
                self.halted = true;
                debug!(addr = self.ip - 1, depth = self.stack.len(), "halt");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{ErrorCode, Position};

    fn assemble(f: impl FnOnce(&mut Program) -> Result<()>) -> Program {
        let mut prog = Program::new(&Limits::default());
        f(&mut prog).unwrap();
        prog
    }

    fn run(prog: &Program) -> (String, Result<Status>) {
        let mut vm = Vm::new(&Limits::default());
        let mut out = String::new();
        let status = vm.execute(prog, 10_000, &mut out);
        (out, status)
    }

    #[test]
    fn test_print_constant() {
        let prog = assemble(|p| {
            let six = p.add_number(6)?;
            p.emit(Opcode::Constant)?;
            p.emit_u8(six as u8)?;
            p.emit(Opcode::Print)?;
            p.emit(Opcode::Halt)?;
            Ok(())
        });
        let (out, status) = run(&prog);
        assert_eq!(out, "6\n");
        assert_eq!(status, Ok(Status::Halted));
    }

    #[test]
    fn test_cycle_budget() {
        let prog = assemble(|p| {
            p.emit(Opcode::Jump)?;
            p.emit_addr(0)?;
            Ok(())
        });
        let mut vm = Vm::new(&Limits::default());
        let mut out = String::new();
        assert_eq!(vm.execute(&prog, 100, &mut out), Ok(Status::Running));
        assert_eq!(vm.ip(), 0);
        assert!(!vm.is_halted());
    }

    #[test]
    fn test_division_by_zero_address() {
        let prog = assemble(|p| {
            let one = p.add_number(1)? as u8;
            let zero = p.add_number(0)? as u8;
            p.emit(Opcode::Constant)?;
            p.emit_u8(one)?;
            p.emit(Opcode::Constant)?;
            p.emit_u8(zero)?;
            p.emit(Opcode::Divide)?;
            p.emit(Opcode::Halt)?;
            Ok(())
        });
        let (_, status) = run(&prog);
        let error = status.unwrap_err();
        assert_eq!(error.code(), ErrorCode::DivisionByZero);
        assert_eq!(error.position(), Position::Instruction(4));
    }

    #[test]
    fn test_underflow() {
        let prog = assemble(|p| {
            p.emit(Opcode::Print)?;
            Ok(())
        });
        let (_, status) = run(&prog);
        assert_eq!(status.unwrap_err().code(), ErrorCode::StackUnderflow);
    }

    #[test]
    fn test_overflow_is_checked() {
        let prog = assemble(|p| {
            let max = p.add_number(i32::MAX)? as u8;
            let one = p.add_number(1)? as u8;
            p.emit(Opcode::Constant)?;
            p.emit_u8(max)?;
            p.emit(Opcode::Constant)?;
            p.emit_u8(one)?;
            p.emit(Opcode::Add)?;
            Ok(())
        });
        let (_, status) = run(&prog);
        assert_eq!(status.unwrap_err().code(), ErrorCode::Overflow);
    }

    #[test]
    fn test_uninitialized_global() {
        let prog = assemble(|p| {
            p.emit(Opcode::LoadGlobal)?;
            p.emit_u8(3)?;
            Ok(())
        });
        let (_, status) = run(&prog);
        assert_eq!(status.unwrap_err().code(), ErrorCode::UndefinedValue);
    }

    #[test]
    fn test_call_non_function() {
        let prog = assemble(|p| {
            let n = p.add_number(7)? as u8;
            p.emit(Opcode::Constant)?;
            p.emit_u8(n)?;
            p.emit(Opcode::CallFunction)?;
            p.emit_u8(0)?;
            Ok(())
        });
        let (_, status) = run(&prog);
        assert_eq!(status.unwrap_err().code(), ErrorCode::IllegalFunctionCall);
    }

    #[test]
    fn test_print_aggregates() {
        let prog = crate::mach::compile("a:arr=[1,2,3] print(a) f:int=func() ret 1 endfunc print(f)")
            .unwrap();
        let (out, status) = run(&prog);
        assert_eq!(status, Ok(Status::Halted));
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("[1, 2, 3]"));
        assert!(lines.next().unwrap_or("").starts_with("<func "));
    }

    #[test]
    fn test_frame_is_popped() {
        let prog = crate::mach::compile("f:int=func(a:int,b:int) ret a*b endfunc x:int=f(6,7)").unwrap();
        let mut vm = Vm::new(&Limits::default());
        let mut out = String::new();
        assert_eq!(vm.execute(&prog, 10_000, &mut out), Ok(Status::Halted));
        assert_eq!(vm.stack_len(), 0);
        assert_eq!(vm.global(1), Some(Val::Int(42)));
    }

    #[test]
    fn test_too_many_frames() {
        let limits = Limits {
            frames: 4,
            ..Limits::default()
        };
        let prog = crate::mach::compile("f:int=func(n:int) ret f(n+1) endfunc print(f(0))").unwrap();
        let mut vm = Vm::new(&limits);
        let mut out = String::new();
        let error = vm.execute(&prog, 10_000, &mut out).unwrap_err();
        assert_eq!(error.code(), ErrorCode::OutOfMemory);
        assert!(vm.is_halted());
    }

    #[test]
    fn test_huge_limits_do_not_allocate() {
        let limits = Limits {
            stack: usize::MAX,
            frames: usize::MAX,
            functions: usize::MAX,
            arrays: usize::MAX,
            numbers: usize::MAX,
            string_bytes: usize::MAX,
            ..Limits::default()
        };
        let prog = crate::mach::compile_with("print(\"big\")", &limits).unwrap();
        let mut vm = Vm::new(&limits);
        let mut out = String::new();
        assert_eq!(vm.execute(&prog, 100, &mut out), Ok(Status::Halted));
        assert_eq!(out, "big\n");
    }

    #[test]
    fn test_array_too_long_for_machine() {
        let prog = crate::mach::compile("a:arr=[1,2,3]").unwrap();
        let limits = Limits {
            array_len: 2,
            ..Limits::default()
        };
        let mut vm = Vm::new(&limits);
        let mut out = String::new();
        let error = vm.execute(&prog, 100, &mut out).unwrap_err();
        assert_eq!(error.code(), ErrorCode::OutOfMemory);
        assert_eq!(error.to_string(), "OUT OF MEMORY IN 6; ARRAY TOO LONG");
    }

    #[test]
    fn test_execute_writes_output() {
        let prog = crate::mach::compile("print(\"hi\") print(true)").unwrap();
        let mut out: Vec<u8> = vec![];
        execute(&prog, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hi\ntrue\n");
    }
}
