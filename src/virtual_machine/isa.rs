//! Instruction set definition.
//!
//! There is a single instruction, `subleq A, B, C`, stored as three consecutive
//! words. Two negative sentinel values in the `A` and `B` slots redirect the
//! operand to the outside world instead of memory.

/// Machine word. Every memory cell, operand, and I/O value is one word.
pub type Word = i64;

/// Operand value meaning "read the next input value".
pub const INPUT_MARKER: Word = -1;
/// Operand value meaning "write to the output".
pub const OUTPUT_MARKER: Word = -2;

/// Number of words occupied by one `subleq` instruction.
pub const INSTRUCTION_WIDTH: Word = 3;
/// Number of words occupied by one `.data` directive.
pub const DATA_WIDTH: Word = 1;

/// Assembly token for [`INPUT_MARKER`].
pub const INPUT_TOKEN: &str = "@IN";
/// Assembly token for [`OUTPUT_MARKER`].
pub const OUTPUT_TOKEN: &str = "@OUT";

/// Statements recognized by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    /// `subleq A, B[, C]`
    Subleq,
    /// `.data value`
    Data,
}

impl Mnemonic {
    /// Looks up a mnemonic by its exact (case-sensitive) spelling.
    pub fn from_token(token: &str) -> Option<Mnemonic> {
        match token {
            "subleq" => Some(Mnemonic::Subleq),
            ".data" => Some(Mnemonic::Data),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Mnemonic::Subleq => "subleq",
            Mnemonic::Data => ".data",
        }
    }

    /// Number of words the statement occupies.
    pub const fn width(&self) -> Word {
        match self {
            Mnemonic::Subleq => INSTRUCTION_WIDTH,
            Mnemonic::Data => DATA_WIDTH,
        }
    }
}

/// What a fetched instruction does, decided by its sentinel operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `A = @OUT, B = @IN`: emit the next input value unchanged.
    Echo,
    /// `A = @OUT`: emit `M[src]`.
    Output { src: Word },
    /// `B = @IN`: store the next input value into `M[dst]`.
    Input { dst: Word },
    /// `M[dst] = M[dst] - M[src]`.
    Subtract { dst: Word, src: Word },
}

/// One decoded instruction triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub a: Word,
    pub b: Word,
    /// Branch target.
    pub c: Word,
}

impl Instruction {
    pub const fn new(a: Word, b: Word, c: Word) -> Self {
        Self { a, b, c }
    }

    /// Decodes the operation. Sentinel combinations are checked in precedence
    /// order: echo, output, input, then plain subtraction.
    pub const fn operation(&self) -> Operation {
        match (self.a, self.b) {
            (OUTPUT_MARKER, INPUT_MARKER) => Operation::Echo,
            (OUTPUT_MARKER, src) => Operation::Output { src },
            (dst, INPUT_MARKER) => Operation::Input { dst },
            (dst, src) => Operation::Subtract { dst, src },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_negative() {
        assert!(INPUT_MARKER < 0);
        assert!(OUTPUT_MARKER < 0);
        assert_ne!(INPUT_MARKER, OUTPUT_MARKER);
    }

    #[test]
    fn mnemonic_lookup_is_case_sensitive() {
        assert_eq!(Mnemonic::from_token("subleq"), Some(Mnemonic::Subleq));
        assert_eq!(Mnemonic::from_token(".data"), Some(Mnemonic::Data));
        assert_eq!(Mnemonic::from_token("SUBLEQ"), None);
        assert_eq!(Mnemonic::from_token("data"), None);
    }

    #[test]
    fn mnemonic_widths() {
        assert_eq!(Mnemonic::Subleq.width(), 3);
        assert_eq!(Mnemonic::Data.width(), 1);
    }

    #[test]
    fn decode_precedence() {
        assert_eq!(
            Instruction::new(OUTPUT_MARKER, INPUT_MARKER, 0).operation(),
            Operation::Echo
        );
        assert_eq!(
            Instruction::new(OUTPUT_MARKER, 7, 0).operation(),
            Operation::Output { src: 7 }
        );
        assert_eq!(
            Instruction::new(5, INPUT_MARKER, 0).operation(),
            Operation::Input { dst: 5 }
        );
        assert_eq!(
            Instruction::new(5, 6, 0).operation(),
            Operation::Subtract { dst: 5, src: 6 }
        );
    }

    #[test]
    fn input_marker_in_a_slot_is_an_ordinary_address() {
        // Only the B slot means input; -1 in A is just an invalid address.
        assert_eq!(
            Instruction::new(INPUT_MARKER, 4, 0).operation(),
            Operation::Subtract {
                dst: INPUT_MARKER,
                src: 4
            }
        );
    }
}
