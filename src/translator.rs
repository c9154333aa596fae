use std::collections::HashMap;
use std::io::Write;

use log::debug;

use crate::ast::{ArithmeticOp::*, Command::*, Segment::*, *};
use crate::error::Result;

/// Scope used for labels that appear before any `function` in a unit.
pub const DEFAULT_SCOPE: &str = "Sys.init";
/// Unit name the bootstrap call is emitted under.
pub const BOOTSTRAP_UNIT: &str = "Bootstrap";
/// Address the stack starts at.
pub const STACK_BASE: u16 = 256;

/// Cells between the callee's `LCL` and its caller's saved return address.
const FRAME_SIZE: u16 = 5;

macro_rules! svec {
    ($($x:expr),* $(,)?) => (vec![$($x.to_string()),*]);
}

fn at_c(arg: &u16) -> String {
    format!("@{arg}", arg = arg)
}

fn at_s(arg: &str) -> String {
    format!("@{arg}", arg = arg)
}

fn pointer_arg(arg: &u16) -> &'static str {
    // Index 1 is THAT; the reader rejects anything above it.
    if *arg == 1 {
        "R4"
    } else {
        "R3"
    }
}

fn base_register(segment: &Segment) -> &'static str {
    match segment {
        Local => "LCL",
        Argument => "ARG",
        This => "THIS",
        _ => "THAT",
    }
}

/// Push the value in D
fn push_d() -> Vec<String> {
    svec!["@SP", "A=M", "M=D", "@SP", "M=M+1"]
}

/// Pop into D, leaving A at the vacated cell
fn pop_d() -> Vec<String> {
    svec!["@SP", "M=M-1", "A=M", "D=M"]
}

/// Pop into the address cached in R13
fn pop_to_r13() -> Vec<String> {
    let mut lines = svec!["@R13", "M=D"];
    lines.extend(pop_d());
    lines.extend(svec!["@R13", "A=M", "M=D"]);
    lines
}

fn push_constant(value: &u16) -> Vec<String> {
    let mut lines = svec![at_c(value), "D=A"];
    lines.extend(push_d());
    lines
}

/// Push microcode for the four base-pointer segments
fn seg_push(seg: &str, arg: &u16) -> Vec<String> {
    let mut lines = svec![at_c(arg), "D=A", at_s(seg), "A=D+M", "D=M"];
    lines.extend(push_d());
    lines
}

fn seg_push_direct(label: &str) -> Vec<String> {
    let mut lines = svec![at_s(label), "D=M"];
    lines.extend(push_d());
    lines
}

/// The destination address is computed into R13 before SP is touched.
fn seg_pop(seg: &str, arg: &u16) -> Vec<String> {
    let mut lines = svec![at_c(arg), "D=A", at_s(seg), "A=D+M", "D=A"];
    lines.extend(pop_to_r13());
    lines
}

fn seg_pop_direct(label: &str) -> Vec<String> {
    let mut lines = pop_d();
    lines.extend(svec![at_s(label), "M=D"]);
    lines
}

fn simple_un_op(op: char) -> Vec<String> {
    svec!["@SP", "M=M-1", "A=M", format!("M={}M", op), "@SP", "M=M+1"]
}

// i.e. no conditions or jumps, just pop and run
fn simple_bin_op(expr: &str) -> Vec<String> {
    let mut lines = pop_d(); // Right arg in D
    lines.extend(svec!["@SP", "M=M-1", "A=M", format!("M={}", expr), "@SP", "M=M+1"]);
    lines
}

/// Settings that change what is emitted around each command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Emit `SP = 256; call Sys.init 0` before the first unit.
    pub bootstrap: bool,
    /// Precede each command's code with a comment echoing the command.
    pub annotate: bool,
}

/// Expands VM commands into Hack assembly, one command at a time.
///
/// A single translator is shared by every unit of a program so that the
/// comparison and call-site counters keep generated labels unique across
/// units.
pub struct Translator<W: Write> {
    out: W,
    options: Options,
    unit: String,
    function: String,
    gen_sym: usize,
    call_sites: HashMap<String, usize>,
}

impl<W: Write> Translator<W> {
    pub fn new(out: W) -> Self {
        Self::with_options(out, Options::default())
    }

    pub fn with_options(out: W, options: Options) -> Self {
        Translator {
            out,
            options,
            unit: String::new(),
            function: DEFAULT_SCOPE.to_string(),
            gen_sym: 0,
            call_sites: HashMap::new(),
        }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// Start a new translation unit. Counters carry over; the function scope
    /// falls back to the default.
    pub fn set_unit(&mut self, unit: &str) {
        debug!("translating unit {}", unit);
        self.unit = unit.to_string();
        self.function = DEFAULT_SCOPE.to_string();
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn current_function(&self) -> &str {
        &self.function
    }

    /// Emit the bootstrap code: `SP = 256` then `call Sys.init 0`.
    pub fn write_bootstrap(&mut self) -> Result<()> {
        self.set_unit(BOOTSTRAP_UNIT);

        let mut lines = Vec::new();
        if self.options.annotate {
            lines.push("// bootstrap".to_string());
        }
        lines.extend(svec![at_c(&STACK_BASE), "D=A", "@SP", "M=D"]);
        self.emit(lines)?;

        self.translate(&Call(DEFAULT_SCOPE.to_string(), 0))
    }

    pub fn translate(&mut self, command: &Command) -> Result<()> {
        let mut lines = Vec::new();
        if self.options.annotate {
            lines.push(format!("// {}", command));
        }

        lines.extend(match command {
            Arithmetic(op) => self.arithmetic(op),
            Push(seg, arg) => self.push(seg, arg),
            Pop(seg, arg) => self.pop(seg, arg),
            Label(sym) => self.label(sym),
            Goto(sym) => self.goto(sym),
            IfGoto(sym) => self.if_goto(sym),
            Function(name, n_vars) => self.function(name, n_vars),
            Call(name, n_args) => self.call(name, n_args),
            Return => self.ret(),
        });

        self.emit(lines)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, lines: Vec<String>) -> Result<()> {
        for line in lines {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    fn next_gen_sym(&mut self) -> usize {
        let tmp = self.gen_sym;
        self.gen_sym += 1;
        tmp
    }

    fn static_sym(&self, arg: &u16) -> String {
        format!("{}.{}", self.unit, arg)
    }

    fn arithmetic(&mut self, op: &ArithmeticOp) -> Vec<String> {
        match op {
            Add => simple_bin_op("D+M"),
            Sub => simple_bin_op("M-D"),
            And => simple_bin_op("D&M"),
            Or => simple_bin_op("D|M"),
            Neg => simple_un_op('-'),
            Not => simple_un_op('!'),
            Eq => self.compare("D=D-M", "JEQ"),
            Gt => self.compare("D=M-D", "JGT"),
            Lt => self.compare("D=M-D", "JLT"),
        }
    }

    /// Leaves -1 on the stack when `diff` satisfies `jump`, else 0.
    fn compare(&mut self, diff: &str, jump: &str) -> Vec<String> {
        let end_sym = format!("eq.end.{}", self.next_gen_sym());

        let mut lines = pop_d();
        lines.extend(svec![
            "@SP",
            "M=M-1",
            "A=M",
            diff,
            "M=-1", // Optimistically true
            at_s(&end_sym),
            format!("D;{}", jump),
            "@SP",
            "A=M",
            "M=0",
            format!("({})", end_sym),
            "@SP",
            "M=M+1"
        ]);
        lines
    }

    fn push(&self, segment: &Segment, arg: &u16) -> Vec<String> {
        match segment {
            Constant => push_constant(arg),
            Local | Argument | This | That => seg_push(base_register(segment), arg),
            Temp => {
                let mut lines = svec![at_c(arg), "D=A", "@R5", "A=D+A", "D=M"];
                lines.extend(push_d());
                lines
            }
            Pointer => seg_push_direct(pointer_arg(arg)),
            Static => seg_push_direct(&self.static_sym(arg)),
        }
    }

    fn pop(&self, segment: &Segment, arg: &u16) -> Vec<String> {
        match segment {
            // The reader never produces this; popping a constant discards the value.
            Constant => svec!["@SP", "M=M-1"],
            Local | Argument | This | That => seg_pop(base_register(segment), arg),
            Temp => {
                let mut lines = svec![at_c(arg), "D=A", "@R5", "D=D+A"];
                lines.extend(pop_to_r13());
                lines
            }
            Pointer => seg_pop_direct(pointer_arg(arg)),
            Static => seg_pop_direct(&self.static_sym(arg)),
        }
    }

    /// Convert a VM label to a Hack symbol scoped to the current unit and function
    fn label_to_sym(&self, label: &str) -> String {
        format!("{}.{}${}", self.unit, self.function, label)
    }

    fn label(&self, label: &str) -> Vec<String> {
        svec![format!("({})", self.label_to_sym(label))]
    }

    fn goto(&self, label: &str) -> Vec<String> {
        svec![at_s(&self.label_to_sym(label)), "0;JMP"]
    }

    fn if_goto(&self, label: &str) -> Vec<String> {
        let mut lines = pop_d();
        lines.extend(svec![
            at_s(&self.label_to_sym(label)),
            "D;JNE" // False is 0
        ]);
        lines
    }

    fn function(&mut self, name: &str, n_vars: &u16) -> Vec<String> {
        debug!("{}: function {} with {} locals", self.unit, name, n_vars);
        self.function = name.to_string();

        let mut lines = svec![format!("({})", name)];
        for _ in 0..*n_vars {
            lines.extend(push_constant(&0));
        }
        lines
    }

    /// Return labels are numbered per calling function, qualified by unit.
    fn return_sym(&mut self) -> String {
        let caller = format!("{}.{}", self.unit, self.function);
        let index = self.call_sites.entry(caller.clone()).or_insert(0);
        let sym = format!("{}$ret{}", caller, index);
        *index += 1;
        sym
    }

    fn call(&mut self, name: &str, n_args: &u16) -> Vec<String> {
        let ret_sym = self.return_sym();

        let mut lines = svec![at_s(&ret_sym), "D=A"];
        lines.extend(push_d());
        for saved in ["LCL", "ARG", "THIS", "THAT"] {
            lines.extend(svec![at_s(saved), "D=M"]);
            lines.extend(push_d());
        }
        lines.extend(svec![
            // ARG = SP - 5 - nArgs
            "@SP",
            "D=M",
            at_c(&FRAME_SIZE),
            "D=D-A",
            at_c(n_args),
            "D=D-A",
            "@ARG",
            "M=D",
            // LCL = SP
            "@SP",
            "D=M",
            "@LCL",
            "M=D",
            at_s(name),
            "0;JMP",
            format!("({})", ret_sym)
        ]);
        lines
    }

    fn ret(&self) -> Vec<String> {
        let mut lines = svec![
            // R14 = frame
            "@LCL",
            "D=M",
            "@R14",
            "M=D",
            // R15 = *(frame - 5), read before ARG[0] is overwritten
            at_c(&FRAME_SIZE),
            "A=D-A",
            "D=M",
            "@R15",
            "M=D"
        ];
        lines.extend(pop_d());
        lines.extend(svec![
            // *ARG = return value
            "@ARG",
            "A=M",
            "M=D",
            // SP = ARG + 1
            "@ARG",
            "D=M+1",
            "@SP",
            "M=D"
        ]);
        // LCL goes last
        for (offset, register) in [(1u16, "THAT"), (2, "THIS"), (3, "ARG"), (4, "LCL")] {
            lines.extend(svec![
                "@R14",
                "D=M",
                at_c(&offset),
                "A=D-A",
                "D=M",
                at_s(register),
                "M=D"
            ]);
        }
        lines.extend(svec!["@R15", "A=M", "0;JMP"]);
        lines
    }
}
