/*!
# Rust Language Module

This Rust module provides the tokenizer and diagnostics of the Yap language.

*/

#[macro_use]
mod error;
mod lex;
pub mod token;

pub use error::Error;
pub use error::ErrorCode;
pub use error::Position;
pub use lex::lex;
pub use lex::Lexer;

/// Byte offset into program text.
pub type Offset = usize;

/// Token text capacity, terminator included.
pub const TEXT_CAPACITY: usize = 100;
