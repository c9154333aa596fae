use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use log::{debug, trace};
use nom::{
    branch::alt,
    bytes::complete::{is_a, tag},
    character::{
        complete::{digit1, space1},
        is_digit,
    },
    combinator::{map, map_res, verify},
    sequence::tuple,
    IResult,
};

use crate::ast::{ArithmeticOp::*, Command::*, Segment::*, *};
use crate::error::{Result, TranslateError};

/// Largest value an A-instruction can load directly.
const MAX_CONSTANT: u16 = 32767;
const TEMP_SIZE: u16 = 8;

fn integer(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |c: &str| c.parse())(input)
}

fn segment(input: &str) -> IResult<&str, Segment> {
    map(
        alt((
            tag("constant"),
            tag("local"),
            tag("static"),
            tag("argument"),
            tag("this"),
            tag("that"),
            tag("pointer"),
            tag("temp"),
        )),
        |seg: &str| match seg {
            "constant" => Constant,
            "local" => Local,
            "static" => Static,
            "argument" => Argument,
            "this" => This,
            "that" => That,
            "pointer" => Pointer,
            _ => Temp,
        },
    )(input)
}

fn push(input: &str) -> IResult<&str, Command> {
    map(
        tuple((tag("push"), space1, segment, space1, integer)),
        |(_, _, segment, _, arg)| Push(segment, arg),
    )(input)
}

fn pop(input: &str) -> IResult<&str, Command> {
    map(
        tuple((tag("pop"), space1, segment, space1, integer)),
        |(_, _, segment, _, arg)| Pop(segment, arg),
    )(input)
}

fn prim(input: &str) -> IResult<&str, Command> {
    map(
        alt((
            tag("add"),
            tag("sub"),
            tag("neg"),
            tag("eq"),
            tag("gt"),
            tag("lt"),
            tag("and"),
            tag("or"),
            tag("not"),
        )),
        |prim: &str| match prim {
            "add" => Arithmetic(Add),
            "sub" => Arithmetic(Sub),
            "neg" => Arithmetic(Neg),
            "eq" => Arithmetic(Eq),
            "gt" => Arithmetic(Gt),
            "lt" => Arithmetic(Lt),
            "and" => Arithmetic(And),
            "or" => Arithmetic(Or),
            _ => Arithmetic(Not),
        },
    )(input)
}

fn symbol(input: &str) -> IResult<&str, String> {
    map(
        verify(
            is_a("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.$:0123456789"),
            |c: &str| !is_digit(c.as_bytes()[0]),
        ),
        |sym: &str| sym.to_string(),
    )(input)
}

fn branching(input: &str) -> IResult<&str, Command> {
    map(
        tuple((
            alt((tag("label"), tag("goto"), tag("if-goto"))),
            space1,
            symbol,
        )),
        |(op, _, sym)| match op {
            "label" => Label(sym),
            "goto" => Goto(sym),
            _ => IfGoto(sym),
        },
    )(input)
}

fn function(input: &str) -> IResult<&str, Command> {
    alt((
        map(
            tuple((tag("function"), space1, symbol, space1, integer)),
            |(_, _, name, _, n_vars)| Function(name, n_vars),
        ),
        map(
            tuple((tag("call"), space1, symbol, space1, integer)),
            |(_, _, name, _, n_args)| Call(name, n_args),
        ),
        map(tag("return"), |_| Return),
    ))(input)
}

type LineParser = fn(&str) -> IResult<&str, Command>;

/// Why a single line failed to parse, before it is tagged with its position.
#[derive(Debug, PartialEq, Eq)]
pub enum LineError {
    Malformed(String),
    UnknownSegment(String),
}

fn malformed(reason: impl Into<String>) -> LineError {
    LineError::Malformed(reason.into())
}

/// Parse one comment-free, trimmed, non-empty line.
pub fn parse_line(line: &str) -> std::result::Result<Command, LineError> {
    let mut words = line.split_whitespace();
    let head = words.next().unwrap_or_default();

    let (parser, usage): (LineParser, &str) = match head {
        "push" | "pop" => {
            if let Some(seg) = words.next() {
                if seg.parse::<Segment>().is_err() {
                    return Err(LineError::UnknownSegment(seg.to_string()));
                }
            }
            if head == "push" {
                (push as LineParser, "push SEGMENT INDEX")
            } else {
                (pop as LineParser, "pop SEGMENT INDEX")
            }
        }
        "label" | "goto" | "if-goto" => (branching as LineParser, "label|goto|if-goto NAME"),
        "function" => (function as LineParser, "function NAME NVARS"),
        "call" => (function as LineParser, "call NAME NARGS"),
        "return" => (function as LineParser, "return"),
        _ if head.parse::<ArithmeticOp>().is_ok() => (prim as LineParser, "ARITHMETIC_OP"),
        _ => return Err(malformed(format!("unrecognized command `{}`", head))),
    };

    let command = match parser(line) {
        Ok(("", command)) => command,
        Ok((remainder, _)) => {
            return Err(malformed(format!("unexpected trailing `{}`", remainder.trim())))
        }
        Err(_) => return Err(malformed(format!("expected `{}`", usage))),
    };

    match command {
        Pop(Constant, _) => Err(malformed("cannot pop into the constant segment")),
        Push(Constant, value) if value > MAX_CONSTANT => Err(malformed(format!(
            "constant {} exceeds {}",
            value, MAX_CONSTANT
        ))),
        Push(Pointer, index) | Pop(Pointer, index) if index > 1 => {
            Err(malformed(format!("pointer index {} is not 0 or 1", index)))
        }
        Push(Temp, index) | Pop(Temp, index) if index >= TEMP_SIZE => Err(malformed(format!(
            "temp index {} is outside 0..{}",
            index, TEMP_SIZE
        ))),
        command => Ok(command),
    }
}

/// Strip a trailing `//` comment and surrounding whitespace.
fn strip_comment(line: &str) -> &str {
    line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim()
}

/// Lazy reader over the commands of one translation unit.
pub struct Parser<R> {
    unit: String,
    lines: Lines<R>,
    line_no: usize,
}

impl Parser<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| TranslateError::SourceNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("opened {}", path.display());
        Ok(Parser::from_reader(unit_name(path), BufReader::new(file)))
    }
}

impl<R: BufRead> Parser<R> {
    pub fn from_reader(unit: impl Into<String>, reader: R) -> Self {
        Parser {
            unit: unit.into(),
            lines: reader.lines(),
            line_no: 0,
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    fn error(&self, text: &str, err: LineError) -> TranslateError {
        match err {
            LineError::Malformed(reason) => TranslateError::MalformedCommand {
                unit: self.unit.clone(),
                line: self.line_no,
                text: text.to_string(),
                reason,
            },
            LineError::UnknownSegment(segment) => TranslateError::UnknownSegment {
                unit: self.unit.clone(),
                line: self.line_no,
                segment,
            },
        }
    }
}

impl<R: BufRead> Iterator for Parser<R> {
    type Item = Result<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(line) = self.lines.next() {
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };

            let text = strip_comment(&line);
            if text.is_empty() {
                continue;
            }

            trace!("{}:{}: {}", self.unit, self.line_no, text);
            return Some(parse_line(text).map_err(|e| self.error(text, e)));
        }

        None
    }
}

/// The unit name of a source path: its file name without extension.
pub fn unit_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
