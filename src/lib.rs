//! Translator from stack VM intermediate code to Hack assembly.
//!
//! Source lines are read one command at a time by [`parser::Parser`] and
//! expanded by a [`translator::Translator`] that is shared by every unit of
//! the program, so that static variables, labels and return addresses stay
//! unique across files.

pub mod ast;
pub mod driver;
pub mod error;
pub mod parser;
pub mod translator;

pub use ast::{ArithmeticOp, Command, Segment};
pub use error::{Result, TranslateError};
pub use translator::{Options, Translator};
