//! A minimal Hack machine used to execute translator output in tests.
//!
//! Assembly is resolved in two passes (labels, then variables from RAM[16])
//! and the CPU runs a fetch/execute loop over the decoded instructions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;

use vmil_translator::driver::translate_source;
use vmil_translator::{Options, Translator};

pub const SP: usize = 0;
pub const LCL: usize = 1;
pub const ARG: usize = 2;
pub const THIS: usize = 3;
pub const THAT: usize = 4;

const RAM_SIZE: usize = 32768;
const FIRST_VARIABLE: i16 = 16;
pub const HALT_LABEL: &str = "__HALT";

#[derive(Debug, Clone)]
enum Instr {
    Address(i16),
    Compute {
        dest: String,
        comp: String,
        jump: Option<String>,
    },
}

#[derive(Debug)]
pub struct Machine {
    pub ram: Vec<i16>,
    rom: Vec<Instr>,
    symbols: HashMap<String, i16>,
    halt: usize,
    pub pc: usize,
    pub a: i16,
    pub d: i16,
}

fn predefined() -> HashMap<String, i16> {
    let mut symbols = HashMap::new();
    for (name, addr) in [("SP", 0), ("LCL", 1), ("ARG", 2), ("THIS", 3), ("THAT", 4)] {
        symbols.insert(name.to_string(), addr);
    }
    for r in 0..16 {
        symbols.insert(format!("R{}", r), r);
    }
    symbols.insert("SCREEN".to_string(), 16384);
    symbols.insert("KBD".to_string(), 24576);
    symbols
}

impl Machine {
    /// Assemble `asm` followed by a halt loop labelled `__HALT`.
    pub fn load(asm: &str) -> Self {
        let source = format!("{}\n({})\n@{}\n0;JMP\n", asm, HALT_LABEL, HALT_LABEL);
        let lines: Vec<&str> = source
            .lines()
            .map(|l| l.split_once("//").map(|(s, _)| s).unwrap_or(l).trim())
            .filter(|l| !l.is_empty())
            .collect();

        let mut symbols = predefined();
        let mut pc = 0;
        for line in &lines {
            if let Some(label) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
                assert!(
                    symbols.insert(label.to_string(), pc).is_none(),
                    "duplicate label {}",
                    label
                );
            } else {
                pc += 1;
            }
        }

        let mut next_variable = FIRST_VARIABLE;
        let mut rom = Vec::new();
        for line in &lines {
            if line.starts_with('(') {
                continue;
            }
            if let Some(sym) = line.strip_prefix('@') {
                let value = match sym.parse::<i16>() {
                    Ok(value) => value,
                    Err(_) => *symbols.entry(sym.to_string()).or_insert_with(|| {
                        next_variable += 1;
                        next_variable - 1
                    }),
                };
                rom.push(Instr::Address(value));
                continue;
            }

            let (rest, jump) = match line.split_once(';') {
                Some((rest, jump)) => (rest, Some(jump.to_string())),
                None => (*line, None),
            };
            let (dest, comp) = match rest.split_once('=') {
                Some((dest, comp)) => (dest.to_string(), comp.to_string()),
                None => (String::new(), rest.to_string()),
            };
            rom.push(Instr::Compute { dest, comp, jump });
        }

        let halt = symbols[HALT_LABEL] as usize;
        Machine {
            ram: vec![0; RAM_SIZE],
            rom,
            symbols,
            halt,
            pc: 0,
            a: 0,
            d: 0,
        }
    }

    pub fn symbol(&self, name: &str) -> Option<i16> {
        self.symbols.get(name).copied()
    }

    pub fn ram_at(&self, name: &str) -> i16 {
        let addr = self.symbol(name).unwrap_or_else(|| panic!("no symbol {}", name));
        self.ram[addr as usize]
    }

    fn operand(&self, name: &str) -> i16 {
        match name {
            "0" => 0,
            "1" => 1,
            "D" => self.d,
            "A" => self.a,
            "M" => self.ram[self.a as u16 as usize],
            other => panic!("bad operand {}", other),
        }
    }

    fn compute(&self, comp: &str) -> i16 {
        if comp == "-1" {
            return -1;
        }
        if let Some(x) = comp.strip_prefix('-') {
            return self.operand(x).wrapping_neg();
        }
        if let Some(x) = comp.strip_prefix('!') {
            return !self.operand(x);
        }
        for op in ['+', '-', '&', '|'] {
            if let Some((x, y)) = comp.split_once(op) {
                let (x, y) = (self.operand(x), self.operand(y));
                return match op {
                    '+' => x.wrapping_add(y),
                    '-' => x.wrapping_sub(y),
                    '&' => x & y,
                    _ => x | y,
                };
            }
        }
        self.operand(comp)
    }

    /// Treat reaching `label` as the end of the program.
    pub fn halt_at(&mut self, label: &str) {
        self.halt = self.symbol(label).unwrap_or_else(|| panic!("no label {}", label)) as usize;
    }

    pub fn halted(&self) -> bool {
        self.pc == self.halt
    }

    pub fn step(&mut self) {
        let instr = self.rom[self.pc].clone();
        match instr {
            Instr::Address(value) => {
                self.a = value;
                self.pc += 1;
            }
            Instr::Compute { dest, comp, jump } => {
                let value = self.compute(&comp);
                let address = self.a;
                if dest.contains('M') {
                    self.ram[address as u16 as usize] = value;
                }
                if dest.contains('A') {
                    self.a = value;
                }
                if dest.contains('D') {
                    self.d = value;
                }

                let taken = match jump.as_deref() {
                    None => false,
                    Some("JGT") => value > 0,
                    Some("JEQ") => value == 0,
                    Some("JGE") => value >= 0,
                    Some("JLT") => value < 0,
                    Some("JNE") => value != 0,
                    Some("JLE") => value <= 0,
                    Some("JMP") => true,
                    Some(other) => panic!("bad jump {}", other),
                };
                self.pc = if taken {
                    address as u16 as usize
                } else {
                    self.pc + 1
                };
            }
        }
    }

    /// Run until the halt loop is reached.
    pub fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.halted() {
                return;
            }
            self.step();
        }
        panic!("did not halt within {} steps (pc = {})", max_steps, self.pc);
    }
}

/// Translate `(unit, source)` pairs into one program.
pub fn translate_units(units: &[(&str, &str)], options: Options) -> String {
    let mut translator = Translator::with_options(Vec::new(), options);
    if options.bootstrap {
        translator.write_bootstrap().unwrap();
    }
    for (unit, source) in units {
        translate_source(unit, Cursor::new(*source), &mut translator).unwrap();
    }
    String::from_utf8(translator.into_inner()).unwrap()
}

pub fn translate_unit(unit: &str, source: &str) -> String {
    translate_units(&[(unit, source)], Options::default())
}

/// A machine with the conventional test segment bases set.
pub fn machine_with_frame(asm: &str) -> Machine {
    let mut machine = Machine::load(asm);
    machine.ram[SP] = 256;
    machine.ram[LCL] = 300;
    machine.ram[ARG] = 400;
    machine.ram[THIS] = 3000;
    machine.ram[THAT] = 3010;
    machine
}

/// Translate and run one unit of straight-line code.
pub fn run_unit(source: &str) -> Machine {
    let asm = translate_unit("Test", source);
    let mut machine = machine_with_frame(&asm);
    machine.run(100_000);
    machine
}
