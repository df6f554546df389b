//! Assembly language parser and machine-word compiler.
//!
//! Converts subleq assembly into the words the VM loads at address 0.
//!
//! # Syntax
//!
//! ```text
//! [label:] subleq a, b[, c]   ; optional comment
//! [label:] .data value
//! ```
//!
//! - Operands are decimal literals (`42`, `-1`), labels (`loop`), label
//!   expressions (`buf+2`, `end-1`), or the I/O sentinels `@IN` and `@OUT`
//! - An omitted third `subleq` operand falls through to the next instruction
//! - Comments start with `;` (write `\;` to keep a literal semicolon)
//! - Commas between operands are optional
//! - Trailing punctuation on labels and operands is ignored
//!
//! Assembly runs in two passes. [`first_pass`] walks the source and records
//! each label's address; [`second_pass`] walks it again and resolves every
//! operand against that table. Neither pass keeps state beyond its return value.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{
    INPUT_MARKER, INPUT_TOKEN, INSTRUCTION_WIDTH, Mnemonic, OUTPUT_MARKER, OUTPUT_TOKEN, Word,
};
use crate::virtual_machine::program::Program;
use crate::warn;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = ';';
const ESCAPE_CHAR: char = '\\';
const LABEL_SUFFIX: char = ':';

/// Label name to address mapping produced by [`first_pass`].
///
/// Names are case-sensitive. Iteration is in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Word>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the address of `name`, if defined.
    pub fn get(&self, name: &str) -> Option<Word> {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates `(name, address)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Word)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Names of all labels bound to `address`, in name order.
    pub fn labels_at(&self, address: Word) -> Vec<&str> {
        self.iter()
            .filter(|&(_, a)| a == address)
            .map(|(name, _)| name)
            .collect()
    }

    /// Binds `name`, returning the previous address if it was already bound.
    pub(crate) fn insert(&mut self, name: String, address: Word) -> Option<Word> {
        self.symbols.insert(name, address)
    }

    fn resolve(&self, name: &str, line: usize, offset: usize) -> Result<Word, VMError> {
        self.get(name).ok_or_else(|| VMError::UndefinedSymbol {
            symbol: name.to_string(),
            line,
            offset,
        })
    }
}

impl FromIterator<(String, Word)> for SymbolTable {
    fn from_iter<T: IntoIterator<Item = (String, Word)>>(iter: T) -> Self {
        Self {
            symbols: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    text: &'a str,
    /// 1-based character column in the line.
    offset: usize,
}

/// One non-empty source line split into its parts.
#[derive(Debug)]
struct Statement<'a> {
    /// 1-based line number.
    line: usize,
    label: Option<Token<'a>>,
    /// First token after the label, whether or not it is a known mnemonic.
    head: Option<Token<'a>>,
    operands: Vec<Token<'a>>,
}

/// Cuts `line` at the first `;` that is not preceded by `\`.
fn strip_comment(line: &str) -> &str {
    let mut prev = None;
    for (i, c) in line.char_indices() {
        if c == COMMENT_CHAR && prev != Some(ESCAPE_CHAR) {
            return &line[..i];
        }
        prev = Some(c);
    }
    line
}

/// Tokenize a single line of assembly.
///
/// Rules:
/// - `;` starts a comment
/// - commas and whitespace separate tokens
fn tokenize(line: &str) -> Vec<Token<'_>> {
    let code = strip_comment(line);
    let mut out = Vec::with_capacity(4);
    // Byte index and 1-based character column of the token being read.
    let mut start: Option<(usize, usize)> = None;

    for (column, (i, c)) in code.char_indices().enumerate() {
        if c == ',' || c.is_whitespace() {
            if let Some((s, offset)) = start.take() {
                out.push(Token {
                    text: &code[s..i],
                    offset,
                });
            }
        } else if start.is_none() {
            start = Some((i, column + 1));
        }
    }

    if let Some((s, offset)) = start {
        out.push(Token {
            text: &code[s..],
            offset,
        });
    }

    out
}

/// Strips the trailing run of non-alphanumeric characters from a token.
fn trim_token(text: &str) -> &str {
    text.trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
}

/// Checks if a token is a label definition (ends with `:`).
fn is_label_def(tok: &str) -> bool {
    tok.ends_with(LABEL_SUFFIX)
}

/// Splits a line into label, head, and operands. Returns `None` for blank and
/// comment-only lines.
fn parse_statement(line_no: usize, line: &str) -> Option<Statement<'_>> {
    let mut tokens = tokenize(line).into_iter();
    let first = tokens.next()?;
    let (label, head) = if is_label_def(first.text) {
        (Some(first), tokens.next())
    } else {
        (None, Some(first))
    };
    Some(Statement {
        line: line_no,
        label,
        head,
        operands: tokens.collect(),
    })
}

/// Iterates the statements of `lines`, numbering lines from 1.
fn statements<S: AsRef<str>>(lines: &[S]) -> impl Iterator<Item = Statement<'_>> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| parse_statement(i + 1, line.as_ref()))
}

/// Pass 1: computes the address of every label.
///
/// The location counter advances by the width of each `subleq` and `.data`
/// statement; any other statement is ignored. Operands are not looked at.
pub fn first_pass<S: AsRef<str>>(lines: &[S]) -> Result<SymbolTable, VMError> {
    let mut symbols = SymbolTable::new();
    let mut defined_on: HashMap<String, usize> = HashMap::new();
    let mut location: Word = 0;

    for stmt in statements(lines) {
        if let Some(tok) = stmt.label {
            let name = trim_token(tok.text);
            if name.is_empty() {
                return Err(VMError::InvalidLabel {
                    token: tok.text.to_string(),
                    line: stmt.line,
                    offset: tok.offset,
                });
            }
            if let Some(&first_line) = defined_on.get(name) {
                return Err(VMError::DuplicateSymbol {
                    symbol: name.to_string(),
                    line: stmt.line,
                    offset: tok.offset,
                    first_line,
                });
            }
            defined_on.insert(name.to_string(), stmt.line);
            symbols.insert(name.to_string(), location);
        }

        if let Some(head) = stmt.head {
            match Mnemonic::from_token(head.text) {
                Some(mnemonic) => location += mnemonic.width(),
                None => warn!(
                    "line {}:{}: ignoring unrecognized statement `{}`",
                    stmt.line, head.offset, head.text
                ),
            }
        }
    }

    Ok(symbols)
}

/// Pass 2: resolves every operand and emits the machine words.
///
/// Walks the same lines as [`first_pass`] with a fresh address counter.
/// `symbols` is only read.
pub fn second_pass<S: AsRef<str>>(
    lines: &[S],
    symbols: &SymbolTable,
) -> Result<Vec<Word>, VMError> {
    let mut words = Vec::new();
    let mut address: Word = 0;

    for stmt in statements(lines) {
        let Some(head) = stmt.head else {
            continue;
        };
        let Some(mnemonic) = Mnemonic::from_token(head.text) else {
            continue;
        };

        let resolve = |tok: &Token| resolve_operand(tok, symbols, stmt.line);
        match (mnemonic, stmt.operands.as_slice()) {
            (Mnemonic::Subleq, [a, b]) => {
                words.push(resolve(a)?);
                words.push(resolve(b)?);
                words.push(address + INSTRUCTION_WIDTH);
            }
            (Mnemonic::Subleq, [a, b, c]) => {
                words.push(resolve(a)?);
                words.push(resolve(b)?);
                words.push(resolve(c)?);
            }
            (Mnemonic::Data, [value]) => words.push(resolve(value)?),
            (_, operands) => {
                return Err(VMError::ArityMismatch {
                    mnemonic: mnemonic.as_str(),
                    expected: match mnemonic {
                        Mnemonic::Subleq => "2 or 3",
                        Mnemonic::Data => "1",
                    },
                    actual: operands.len(),
                    line: stmt.line,
                    offset: head.offset,
                });
            }
        }
        address += mnemonic.width();
    }

    Ok(words)
}

/// Returns true for an optionally signed run of ASCII digits.
fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a literal already known to be well-formed, failing only on overflow.
fn parse_literal(text: &str, line: usize, offset: usize) -> Result<Word, VMError> {
    text.parse::<Word>()
        .map_err(|_| VMError::LiteralOutOfRange {
            literal: text.to_string(),
            line,
            offset,
        })
}

/// Resolves one operand token to a word.
///
/// Tried in order: I/O sentinel, integer literal, `label+offset`,
/// `label-offset`, bare label.
fn resolve_operand(tok: &Token, symbols: &SymbolTable, line: usize) -> Result<Word, VMError> {
    let text = trim_token(tok.text);
    let invalid = || VMError::InvalidOperand {
        token: tok.text.to_string(),
        line,
        offset: tok.offset,
    };

    if text.is_empty() {
        return Err(invalid());
    }
    if text == INPUT_TOKEN {
        return Ok(INPUT_MARKER);
    }
    if text == OUTPUT_TOKEN {
        return Ok(OUTPUT_MARKER);
    }
    if is_integer_literal(text) {
        return parse_literal(text, line, tok.offset);
    }

    let expression = text
        .split_once('+')
        .map(|(label, off)| (label, off, false))
        .or_else(|| text.split_once('-').map(|(label, off)| (label, off, true)));

    let Some((label, off, subtract)) = expression else {
        return symbols.resolve(text, line, tok.offset);
    };
    if label.is_empty() || !is_integer_literal(off) {
        return Err(invalid());
    }

    let base = symbols.resolve(label, line, tok.offset)?;
    let delta = parse_literal(off, line, tok.offset)?;
    let value = if subtract {
        base.checked_sub(delta)
    } else {
        base.checked_add(delta)
    };
    value.ok_or_else(|| VMError::LiteralOutOfRange {
        literal: text.to_string(),
        line,
        offset: tok.offset,
    })
}

/// Assembles a sequence of source lines.
///
/// Any error discards all output.
pub fn assemble_lines<S: AsRef<str>>(lines: &[S]) -> Result<Program, VMError> {
    let symbols = first_pass(lines)?;
    let words = second_pass(lines, &symbols)?;
    Ok(Program::new(words, symbols))
}

/// Assemble a full source string into machine words.
pub fn assemble_source(source: impl AsRef<str>) -> Result<Program, VMError> {
    let lines: Vec<&str> = source.as_ref().lines().collect();
    assemble_lines(&lines)
}

/// Convenience: assemble directly from file path
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, VMError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VMError::SourceUnavailable {
        path: path_ref.display().to_string(),
        reason: e.to_string(),
    })?;
    assemble_source(source)
}

/// Formats a compiler-style diagnostic for an assembly failure.
///
/// Errors without a source location render as a single `error:` line.
pub fn render_diagnostic(file: &str, source: &str, err: &VMError) -> String {
    let mut diag = String::new();
    let Some((line, offset)) = err.location() else {
        let _ = writeln!(diag, "error: {err}");
        return diag;
    };

    let text = err.to_string();
    let prefix = format!("line {line}:{offset}: ");
    let message = text.strip_prefix(&prefix).unwrap_or(&text);
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "{:>4} |", "");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "{:>4} | {}^", "", underline);
    }

    diag
}
