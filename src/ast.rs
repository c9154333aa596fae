use std::fmt;
use std::str::FromStr;

use crate::error::TranslateError;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Segment {
    Constant,
    Local,
    Static,
    Argument,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn name(&self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" => Ok(Segment::Constant),
            "local" => Ok(Segment::Local),
            "static" => Ok(Segment::Static),
            "argument" => Ok(Segment::Argument),
            "this" => Ok(Segment::This),
            "that" => Ok(Segment::That),
            "pointer" => Ok(Segment::Pointer),
            "temp" => Ok(Segment::Temp),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub fn name(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }
}

impl FromStr for ArithmeticOp {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(ArithmeticOp::Add),
            "sub" => Ok(ArithmeticOp::Sub),
            "neg" => Ok(ArithmeticOp::Neg),
            "eq" => Ok(ArithmeticOp::Eq),
            "gt" => Ok(ArithmeticOp::Gt),
            "lt" => Ok(ArithmeticOp::Lt),
            "and" => Ok(ArithmeticOp::And),
            "or" => Ok(ArithmeticOp::Or),
            "not" => Ok(ArithmeticOp::Not),
            _ => Err(TranslateError::UnknownArithmeticOp { op: s.to_string() }),
        }
    }
}

/// One VM command, as read from a single source line.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    // Stack
    Arithmetic(ArithmeticOp),
    Push(Segment, u16),
    Pop(Segment, u16),

    // Program flow
    Label(String),
    Goto(String),
    IfGoto(String),

    // Functions
    Function(String, u16),
    Call(String, u16),
    Return,
}

/// Renders the command back in VM syntax, used for `--annotate` comments.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Arithmetic(op) => write!(f, "{}", op.name()),
            Command::Push(seg, arg) => write!(f, "push {} {}", seg.name(), arg),
            Command::Pop(seg, arg) => write!(f, "pop {} {}", seg.name(), arg),
            Command::Label(sym) => write!(f, "label {}", sym),
            Command::Goto(sym) => write!(f, "goto {}", sym),
            Command::IfGoto(sym) => write!(f, "if-goto {}", sym),
            Command::Function(name, n_vars) => write!(f, "function {} {}", name, n_vars),
            Command::Call(name, n_args) => write!(f, "call {} {}", name, n_args),
            Command::Return => write!(f, "return"),
        }
    }
}

#[test]
fn test_display_round_trips_vm_syntax() {
    assert_eq!(
        Command::Push(Segment::Argument, 2).to_string(),
        "push argument 2"
    );
    assert_eq!(
        Command::Function("Main.fib".into(), 0).to_string(),
        "function Main.fib 0"
    );
    assert_eq!(Command::Arithmetic(ArithmeticOp::Not).to_string(), "not");
}

#[test]
fn test_unknown_arithmetic_op() {
    assert!(matches!(
        "mul".parse::<ArithmeticOp>(),
        Err(TranslateError::UnknownArithmeticOp { .. })
    ));
}
