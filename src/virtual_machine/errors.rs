use thiserror::Error;

/// Errors raised while configuring the VM, loading a program, or assembling source.
///
/// Conditions met while a program runs (an out-of-range address, exhausted input,
/// a jump outside memory) are not errors: they halt the VM.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    /// The VM was constructed with an unusable memory size.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
    /// The program has more words than the VM has memory cells.
    #[error("program of {len} words does not fit in {capacity} words of memory")]
    ProgramTooLarge { len: usize, capacity: usize },
    /// The assembly source could not be read.
    #[error("could not read {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },
    /// An operand references a label that was never defined.
    #[error("line {line}:{offset}: undefined symbol `{symbol}`")]
    UndefinedSymbol {
        symbol: String,
        line: usize,
        offset: usize,
    },
    /// A literal or computed address does not fit in a machine word.
    #[error("line {line}:{offset}: `{literal}` does not fit in a machine word")]
    LiteralOutOfRange {
        literal: String,
        line: usize,
        offset: usize,
    },
    /// A label was defined more than once.
    #[error("line {line}:{offset}: duplicate symbol `{symbol}` (first defined on line {first_line})")]
    DuplicateSymbol {
        symbol: String,
        line: usize,
        offset: usize,
        first_line: usize,
    },
    /// A label definition has no usable name.
    #[error("line {line}:{offset}: invalid label definition `{token}`")]
    InvalidLabel {
        token: String,
        line: usize,
        offset: usize,
    },
    /// An operand is neither a literal, a sentinel, a label, nor a label expression.
    #[error("line {line}:{offset}: invalid operand `{token}`")]
    InvalidOperand {
        token: String,
        line: usize,
        offset: usize,
    },
    /// Wrong number of operands for a mnemonic.
    #[error("line {line}:{offset}: `{mnemonic}` expects {expected} operands, got {actual}")]
    ArityMismatch {
        mnemonic: &'static str,
        expected: &'static str,
        actual: usize,
        line: usize,
        offset: usize,
    },
    /// A program image could not be decoded.
    #[error("decoding error: {reason}")]
    DecodeError { reason: String },
}

impl VMError {
    /// Returns the 1-based `(line, column)` of an assembly error.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            VMError::UndefinedSymbol { line, offset, .. }
            | VMError::LiteralOutOfRange { line, offset, .. }
            | VMError::DuplicateSymbol { line, offset, .. }
            | VMError::InvalidLabel { line, offset, .. }
            | VMError::InvalidOperand { line, offset, .. }
            | VMError::ArityMismatch { line, offset, .. } => Some((*line, *offset)),
            VMError::InvalidConfiguration { .. }
            | VMError::ProgramTooLarge { .. }
            | VMError::SourceUnavailable { .. }
            | VMError::DecodeError { .. } => None,
        }
    }
}
