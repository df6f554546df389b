use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{INSTRUCTION_WIDTH, Instruction, Word};

/// Fixed-size, zero-initialized word memory.
///
/// Addresses are [`Word`]s; any address outside `[0, len)` (including negative
/// ones and the I/O sentinels) resolves to `None` instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    /// Creates `size` zeroed cells. `size` must be positive.
    pub fn new(size: usize) -> Result<Self, VMError> {
        if size == 0 {
            return Err(VMError::InvalidConfiguration {
                reason: "memory size must be positive".to_string(),
            });
        }
        Ok(Self {
            cells: vec![0; size],
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false: memory has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }

    /// Converts `addr` to a cell index if it is in range.
    pub fn index(&self, addr: Word) -> Option<usize> {
        usize::try_from(addr).ok().filter(|&i| i < self.cells.len())
    }

    pub fn get(&self, addr: Word) -> Option<Word> {
        self.index(addr).map(|i| self.cells[i])
    }

    pub fn get_mut(&mut self, addr: Word) -> Option<&mut Word> {
        let i = self.index(addr)?;
        Some(&mut self.cells[i])
    }

    /// Reads the instruction at `pc`, or `None` if any of its words lies outside memory.
    pub fn fetch(&self, pc: Word) -> Option<Instruction> {
        let start = self.index(pc)?;
        let words = self.cells.get(start..start + INSTRUCTION_WIDTH as usize)?;
        Some(Instruction::new(words[0], words[1], words[2]))
    }

    /// Copies `words` to the start of memory, leaving later cells untouched.
    ///
    /// Fails without modifying anything when `words` does not fit.
    pub fn load(&mut self, words: &[Word]) -> Result<(), VMError> {
        if words.len() > self.cells.len() {
            return Err(VMError::ProgramTooLarge {
                len: words.len(),
                capacity: self.cells.len(),
            });
        }
        self.cells[..words.len()].copy_from_slice(words);
        Ok(())
    }

    /// Returns `(address, value)` pairs for the inclusive window `[start, end]`,
    /// clamped to memory. An empty or fully out-of-range window yields nothing.
    pub fn dump(&self, start: usize, end: usize) -> Vec<(usize, Word)> {
        let last = end.min(self.cells.len() - 1);
        if start > last {
            return Vec::new();
        }
        (start..=last).map(|i| (i, self.cells[i])).collect()
    }
}
