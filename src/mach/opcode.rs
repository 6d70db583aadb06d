/// ## Virtual machine instruction set
///
/// The Yap virtual machine has no registers.
/// Every operation is performed on the stack.
///
/// For example: `x:int=3*y` compiles to
/// `[CONSTANT 0, LOADGLOBAL 0, MULTIPLY, STOREGLOBAL 1]`
///
/// Each instruction is one opcode byte followed by its operands.
/// Addresses are two bytes, little-endian. Every other operand is one byte.

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum Opcode {
    // *** Stack manipulation
    /// Push a typed constant. `index`
    Constant,
    /// Discard the top of stack.
    Pop,
    LoadGlobal,
    StoreGlobal,
    /// Frame-relative load. `slot`
    LoadLocal,
    /// Frame-relative store. `slot`
    StoreLocal,

    // *** Expression operations
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Negate,
    Not,
    And,
    Or,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEquals,
    LessThan,
    LessOrEquals,

    // *** Branch control
    /// Pop a bool and branch to `addr` when false.
    JumpIfFalse,
    /// Unconditional branch to `addr`.
    Jump,

    // *** Functions
    /// Materialize a callable into a global. `slot, entry, arity, type`
    DefineFunction,
    /// Function prologue. `arity, type`
    PushCallFrame,
    /// Bind argument `slot` to local `slot`. `slot, type`
    BindLocal,
    /// `arity`
    CallFunction,
    Return,

    // *** Arrays
    /// `count`
    MakeArray,
    IndexArray,
    StoreElement,

    // *** Statements
    Print,
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Index,
    Slot,
    Arity,
    Count,
    Type,
    Addr,
}

impl Operand {
    pub fn width(self) -> usize {
        match self {
            Operand::Addr => 2,
            _ => 1,
        }
    }
}

const ALL: [Opcode; 33] = {
    use Opcode::*;
    [
        Constant,
        Pop,
        LoadGlobal,
        StoreGlobal,
        LoadLocal,
        StoreLocal,
        Add,
        Subtract,
        Multiply,
        Divide,
        Modulo,
        Negate,
        Not,
        And,
        Or,
        Equals,
        NotEquals,
        GreaterThan,
        GreaterOrEquals,
        LessThan,
        LessOrEquals,
        JumpIfFalse,
        Jump,
        DefineFunction,
        PushCallFrame,
        BindLocal,
        CallFunction,
        Return,
        MakeArray,
        IndexArray,
        StoreElement,
        Print,
        Halt,
    ]
};

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        let op = *ALL.get(byte as usize)?;
        if op as u8 == byte {
            Some(op)
        } else {
            None
        }
    }

    pub fn operands(self) -> &'static [Operand] {
        use Opcode::*;
        use Operand::*;
        match self {
            Constant => &[Index],
            LoadGlobal | StoreGlobal | LoadLocal | StoreLocal => &[Slot],
            JumpIfFalse | Jump => &[Addr],
            DefineFunction => &[Slot, Addr, Arity, Type],
            PushCallFrame => &[Arity, Type],
            BindLocal => &[Slot, Type],
            CallFunction => &[Arity],
            MakeArray => &[Count],
            _ => &[],
        }
    }

    /// Opcode byte plus operand bytes.
    pub fn len(self) -> usize {
        1 + self.operands().iter().map(|o| o.width()).sum::<usize>()
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Opcode::*;
        let s = match self {
            Constant => "CONSTANT",
            Pop => "POP",
            LoadGlobal => "LOADGLOBAL",
            StoreGlobal => "STOREGLOBAL",
            LoadLocal => "LOADLOCAL",
            StoreLocal => "STORELOCAL",
            Add => "ADD",
            Subtract => "SUBTRACT",
            Multiply => "MULTIPLY",
            Divide => "DIVIDE",
            Modulo => "MODULO",
            Negate => "NEGATE",
            Not => "NOT",
            And => "AND",
            Or => "OR",
            Equals => "EQUALS",
            NotEquals => "NOTEQUALS",
            GreaterThan => "GREATERTHAN",
            GreaterOrEquals => "GREATEROREQUALS",
            LessThan => "LESSTHAN",
            LessOrEquals => "LESSOREQUALS",
            JumpIfFalse => "JUMPIFFALSE",
            Jump => "JUMP",
            DefineFunction => "DEFINEFUNCTION",
            PushCallFrame => "PUSHCALLFRAME",
            BindLocal => "BINDLOCAL",
            CallFunction => "CALLFUNCTION",
            Return => "RETURN",
            MakeArray => "MAKEARRAY",
            IndexArray => "INDEXARRAY",
            StoreElement => "STOREELEMENT",
            Print => "PRINT",
            Halt => "HALT",
        };
        write!(f, "{}", s)
    }
}
