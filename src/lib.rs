//! # Yap
//!
//! A tiny statically typed scripting language compiled in a single pass
//! to bytecode for a bounded stack machine.
//!
//! ```text
//! gcd:int=func(a:int,b:int)
//!     while(b!=0) t:int=b b=a%b a=t endwhile
//!     ret a
//! endfunc
//! print(gcd(48,18))
//! ```
//!
//! Run `yap` for an interactive shell: lines run as they are entered,
//! or type `prog` to collect a program and `run` to run it. Pass a file
//! name to run a script. `help` lists the shell commands.
//!
//! There are no heap objects beyond fixed pools. Every capacity is set
//! by [`mach::Limits`] and overflow is an error, never growth.

pub mod lang;
pub mod mach;
pub mod term;
