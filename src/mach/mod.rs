/*!
## Rust Machine Module

This Rust module is a single-pass compiler and bounded virtual machine for Yap.

*/

/// Instruction address in a program's code.
pub type Address = usize;

mod compile;
mod limits;
mod opcode;
mod program;
mod runtime;
mod stack;
mod symbol;
mod val;
mod vm;

#[cfg(test)]
mod tests;

pub use compile::{compile, compile_with};
pub use compile::Compiler;
pub use limits::Limits;
pub use opcode::{Opcode, Operand};
pub use program::Constant;
pub use program::Program;
pub use runtime::Event;
pub use runtime::Runtime;
pub use stack::Stack;
pub use symbol::{LocalNames, Signature, SymbolTable};
pub use val::{Type, Val};
pub use vm::{execute, execute_with, Status, Vm};
