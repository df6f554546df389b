//! Core virtual machine implementation.
//!
//! The VM repeatedly fetches a `subleq A, B, C` triple at the program counter,
//! executes it, and branches. Anything that would touch memory outside its
//! bounds, and running out of input, halts the machine instead of failing:
//! a jump out of memory is how programs terminate.

mod memory;

pub use memory::Memory;

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::io::Io;
use crate::virtual_machine::isa::{INSTRUCTION_WIDTH, Operation, Word};

/// Result of a single state transition.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An instruction executed; the VM can step again.
    Continue,
    /// The VM stopped: out-of-range fetch or operand, or exhausted input.
    Halt,
}

/// A subleq machine over an injected I/O capability.
///
/// Memory size is fixed at construction. Given the same loaded words and the
/// same input sequence, execution is fully deterministic.
pub struct VM<I: Io> {
    memory: Memory,
    /// Program counter. May hold an out-of-range value, which halts on the next step.
    pc: Word,
    io: I,
    /// Instructions executed since the last load.
    steps: u64,
}

impl<I: Io> VM<I> {
    /// Creates a VM with `size` zeroed words of memory.
    ///
    /// Returns [`VMError::InvalidConfiguration`] if `size` is zero.
    pub fn new(size: usize, io: I) -> Result<Self, VMError> {
        Ok(Self {
            memory: Memory::new(size)?,
            pc: 0,
            io,
            steps: 0,
        })
    }

    /// Copies `words` into memory starting at address 0 and resets the program counter.
    ///
    /// Returns [`VMError::ProgramTooLarge`] without touching memory if the words do not fit.
    pub fn load(&mut self, words: &[Word]) -> Result<(), VMError> {
        self.memory.load(words)?;
        self.pc = 0;
        self.steps = 0;
        Ok(())
    }

    /// Executes one instruction.
    pub fn step(&mut self) -> Step {
        let Some(instr) = self.memory.fetch(self.pc) else {
            return Step::Halt;
        };

        let value = match instr.operation() {
            Operation::Echo => {
                let Some(value) = self.io.read_input() else {
                    return Step::Halt;
                };
                self.io.write_output(value);
                value
            }
            Operation::Output { src } => {
                let Some(value) = self.memory.get(src) else {
                    return Step::Halt;
                };
                self.io.write_output(value);
                value
            }
            Operation::Input { dst } => {
                // Validate the target before consuming input.
                if self.memory.index(dst).is_none() {
                    return Step::Halt;
                }
                let Some(value) = self.io.read_input() else {
                    return Step::Halt;
                };
                if let Some(slot) = self.memory.get_mut(dst) {
                    *slot = value;
                }
                // Input never branches.
                self.pc += INSTRUCTION_WIDTH;
                self.steps += 1;
                return Step::Continue;
            }
            Operation::Subtract { dst, src } => {
                let Some(subtrahend) = self.memory.get(src) else {
                    return Step::Halt;
                };
                let Some(slot) = self.memory.get_mut(dst) else {
                    return Step::Halt;
                };
                *slot = slot.wrapping_sub(subtrahend);
                *slot
            }
        };

        self.branch(value, instr.c);
        self.steps += 1;
        Step::Continue
    }

    /// Jumps to `target` when `value <= 0`, otherwise falls through.
    fn branch(&mut self, value: Word, target: Word) {
        if value <= 0 {
            self.pc = target;
        } else {
            self.pc += INSTRUCTION_WIDTH;
        }
    }

    /// Steps until the VM halts.
    pub fn run(&mut self) {
        while self.step() == Step::Continue {}
    }

    /// Steps at most `max_steps` times.
    ///
    /// Returns [`Step::Halt`] if the program halted within the budget and
    /// [`Step::Continue`] if the budget ran out first.
    pub fn run_bounded(&mut self, max_steps: u64) -> Step {
        for _ in 0..max_steps {
            if self.step() == Step::Halt {
                return Step::Halt;
            }
        }
        Step::Continue
    }

    /// Returns `(address, value)` pairs for the inclusive window `[start, end]`,
    /// clamped to memory.
    pub fn dump(&self, start: usize, end: usize) -> Vec<(usize, Word)> {
        self.memory.dump(start, end)
    }

    pub fn pc(&self) -> Word {
        self.pc
    }

    pub fn memory(&self) -> &[Word] {
        self.memory.as_slice()
    }

    /// Number of memory words.
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn io(&self) -> &I {
        &self.io
    }

    /// Consumes the VM, returning its I/O capability.
    pub fn into_io(self) -> I {
        self.io
    }
}
