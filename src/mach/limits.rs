/// ## Capacity of every fixed-size pool
///
/// Nothing in the compiler or the machine grows past these bounds.
/// Operands are a single byte wide for constant, slot and arity fields
/// and two bytes for addresses, so some bounds are clamped to what the
/// encoding can name.

#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    pub instructions: usize,
    pub constants: usize,
    pub numbers: usize,
    pub string_bytes: usize,
    pub functions: usize,
    pub arrays: usize,
    pub array_len: usize,
    pub globals: usize,
    pub locals: usize,
    pub frames: usize,
    pub stack: usize,
    pub name_len: usize,
    pub program_buffer: usize,
    pub line_len: usize,
    /// Depth of nested expressions and nested blocks in one unit.
    pub nesting: usize,
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            instructions: 2048,
            constants: 128,
            numbers: 64,
            string_bytes: 512,
            functions: 16,
            arrays: 16,
            array_len: 32,
            globals: 64,
            locals: 16,
            frames: 64,
            stack: 256,
            name_len: 15,
            program_buffer: 8192,
            line_len: 80,
            nesting: 64,
        }
    }
}

impl Limits {
    /// Clamps each bound to its operand width.
    pub fn normalized(mut self) -> Limits {
        let byte = u8::MAX as usize + 1;
        self.instructions = self.instructions.min(u16::MAX as usize);
        self.constants = self.constants.min(byte);
        self.globals = self.globals.min(byte);
        self.locals = self.locals.min(byte);
        self.array_len = self.array_len.min(u8::MAX as usize);
        self
    }
}
