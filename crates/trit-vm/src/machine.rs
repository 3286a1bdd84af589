//! Reference interpreter
//!
//! Executes program images exactly as the loader and the fetch/substitute
//! cycle of the target machine define them. The synthesizer never runs code
//! itself; the interpreter exists so generated images can be checked.

use std::collections::VecDeque;

use thiserror::Error;

use crate::{
    constants::{C2, FIRST_PRINTABLE, LAST_PRINTABLE, MEMORY_SIZE},
    opcode::{is_valid_initial_byte, translate, Opcode},
    trit::{combine, rotate_right, Word},
};

/// Errors raised while loading a program image
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VmError {
    /// The byte at `position` does not decode to a valid instruction there
    #[error("invalid byte {byte:#04x} at position {position}")]
    InvalidByte { position: usize, byte: u8 },

    /// The image does not fit into memory
    #[error("program of {0} cells exceeds the address space")]
    TooLarge(usize),

    /// The memory fill rule needs at least two loaded cells
    #[error("program must contain at least two instructions")]
    TooShort,
}

pub type Result<T> = std::result::Result<T, VmError>;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A halt instruction was executed
    Halted { steps: u64 },
    /// The step limit was reached first
    StepLimit { steps: u64 },
    /// The instruction pointer reached the requested address
    Reached { steps: u64 },
    /// The cell under the instruction pointer held a non-printable value
    InvalidCell { position: Word, value: Word, steps: u64 },
}

/// Machine registers plus the full memory
#[derive(Debug, Clone)]
pub struct Machine {
    memory: Vec<Word>,
    a: Word,
    c: Word,
    d: Word,
    steps: u64,
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl Machine {
    /// Load a program image. Whitespace is skipped the way the reference
    /// loader does; cells past the image follow the combine fill rule.
    pub fn load(image: &[u8]) -> Result<Self> {
        let mut memory = vec![0; MEMORY_SIZE];
        let mut len = 0;

        for &byte in image.iter().filter(|b| !b.is_ascii_whitespace()) {
            if len >= MEMORY_SIZE {
                return Err(VmError::TooLarge(len + 1));
            }
            if !is_valid_initial_byte(len as u32, byte as u32) {
                return Err(VmError::InvalidByte {
                    position: len,
                    byte,
                });
            }
            memory[len] = byte as Word;
            len += 1;
        }

        if len < 2 {
            return Err(VmError::TooShort);
        }

        for i in len..MEMORY_SIZE {
            memory[i] = combine(memory[i - 1], memory[i - 2]);
        }

        Ok(Self {
            memory,
            a: 0,
            c: 0,
            d: 0,
            steps: 0,
            input: VecDeque::new(),
            output: Vec::new(),
        })
    }

    /// Queue bytes for the input instruction.
    pub fn with_input(mut self, input: &[u8]) -> Self {
        self.input.extend(input);
        self
    }

    pub fn memory(&self) -> &[Word] {
        &self.memory
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn registers(&self) -> (Word, Word, Word) {
        (self.a, self.c, self.d)
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn invalid(&self) -> Outcome {
        Outcome::InvalidCell {
            position: self.c,
            value: self.memory[self.c as usize],
            steps: self.steps,
        }
    }

    /// Execute a single instruction. Returns an outcome when execution
    /// cannot continue.
    pub fn step(&mut self) -> Option<Outcome> {
        let cell = self.memory[self.c as usize];
        if !(FIRST_PRINTABLE as Word..=LAST_PRINTABLE as Word).contains(&cell) {
            return Some(self.invalid());
        }

        let d = self.d as usize;
        match Opcode::decode(cell, self.c) {
            Some(Opcode::Jmp) => self.c = self.memory[d],
            Some(Opcode::Out) => self.output.push((self.a % 256) as u8),
            Some(Opcode::In) => {
                self.a = self.input.pop_front().map(Word::from).unwrap_or(C2);
            }
            Some(Opcode::Rot) => {
                self.memory[d] = rotate_right(self.memory[d]);
                self.a = self.memory[d];
            }
            Some(Opcode::MovD) => self.d = self.memory[d],
            Some(Opcode::Opr) => {
                self.memory[d] = combine(self.a, self.memory[d]);
                self.a = self.memory[d];
            }
            Some(Opcode::Halt) => {
                return Some(Outcome::Halted { steps: self.steps });
            }
            Some(Opcode::Nop) | None => {}
        }

        let executed = self.memory[self.c as usize];
        match u8::try_from(executed).ok().and_then(translate) {
            Some(next) => self.memory[self.c as usize] = next as Word,
            None => return Some(self.invalid()),
        }

        self.c = (self.c + 1) % MEMORY_SIZE as Word;
        self.d = (self.d + 1) % MEMORY_SIZE as Word;
        self.steps += 1;
        None
    }

    /// Run until halt, an invalid cell, or `limit` executed instructions.
    pub fn run(&mut self, limit: u64) -> Outcome {
        while self.steps < limit {
            if let Some(outcome) = self.step() {
                return outcome;
            }
        }
        Outcome::StepLimit { steps: self.steps }
    }

    /// Run until the instruction pointer is about to execute `address`.
    pub fn run_until(&mut self, address: Word, limit: u64) -> Outcome {
        while self.steps < limit {
            if self.c == address {
                return Outcome::Reached { steps: self.steps };
            }
            if let Some(outcome) = self.step() {
                return outcome;
            }
        }
        Outcome::StepLimit { steps: self.steps }
    }
}
