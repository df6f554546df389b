//! Input/output capabilities for the VM.
//!
//! The [`Io`] trait is the only way a running program talks to the outside
//! world. [`InteractiveIo`] binds live streams (stdin/stdout in the CLI), while
//! [`BufferedIo`] replays a fixed input sequence and records every output value,
//! which makes runs deterministic and inspectable.

use crate::virtual_machine::isa::Word;
use std::collections::VecDeque;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Source of input values and sink for output values.
pub trait Io {
    /// Returns the next input value, or `None` once input is exhausted.
    fn read_input(&mut self) -> Option<Word>;
    /// Emits one output value.
    fn write_output(&mut self, value: Word);
}

impl<T: Io + ?Sized> Io for &mut T {
    fn read_input(&mut self) -> Option<Word> {
        (**self).read_input()
    }

    fn write_output(&mut self, value: Word) {
        (**self).write_output(value)
    }
}

/// I/O over live streams.
///
/// Input is a stream of whitespace-separated decimal integers; any number of
/// values may share a line. The end of the stream, a read error, or a token
/// that is not an integer ends input for good. Each output value is written on
/// its own line and flushed immediately.
pub struct InteractiveIo<R, W> {
    reader: R,
    writer: W,
    /// Values parsed from the current line but not yet consumed.
    pending: VecDeque<Word>,
    closed: bool,
}

impl<R: BufRead, W: Write> InteractiveIo<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    /// Consumes the capability, returning the underlying writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Reads lines until at least one value is pending or the stream closes.
    fn fill(&mut self) {
        let mut line = String::new();
        while self.pending.is_empty() && !self.closed {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) | Err(_) => self.closed = true,
                Ok(_) => {
                    for token in line.split_whitespace() {
                        match token.parse::<Word>() {
                            Ok(value) => self.pending.push_back(value),
                            Err(_) => {
                                self.closed = true;
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}

impl InteractiveIo<StdinLock<'static>, Stdout> {
    /// Binds the process's standard input and output.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Io for InteractiveIo<R, W> {
    fn read_input(&mut self) -> Option<Word> {
        if self.pending.is_empty() {
            self.fill();
        }
        self.pending.pop_front()
    }

    /// A failed write closes the stream, so the next read halts the machine.
    fn write_output(&mut self, value: Word) {
        if writeln!(self.writer, "{value}")
            .and_then(|()| self.writer.flush())
            .is_err()
        {
            self.closed = true;
            self.pending.clear();
        }
    }
}

/// I/O over a pre-supplied input sequence, collecting output in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedIo {
    input: Vec<Word>,
    cursor: usize,
    output: Vec<Word>,
}

impl BufferedIo {
    /// Creates a capability that will yield `input` in order.
    pub fn new(input: impl Into<Vec<Word>>) -> Self {
        Self {
            input: input.into(),
            cursor: 0,
            output: Vec::new(),
        }
    }

    /// Values emitted so far, in order.
    pub fn output(&self) -> &[Word] {
        &self.output
    }

    /// Input values not yet consumed.
    pub fn remaining_input(&self) -> &[Word] {
        &self.input[self.cursor..]
    }

    /// Consumes the capability, returning the emitted values.
    pub fn into_output(self) -> Vec<Word> {
        self.output
    }
}

impl Io for BufferedIo {
    fn read_input(&mut self) -> Option<Word> {
        let value = self.input.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(value)
    }

    fn write_output(&mut self, value: Word) {
        self.output.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn interactive(input: &str) -> InteractiveIo<Cursor<Vec<u8>>, Vec<u8>> {
        InteractiveIo::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn buffered_yields_input_in_order_then_exhausts() {
        let mut io = BufferedIo::new(vec![3, -4]);
        assert_eq!(io.read_input(), Some(3));
        assert_eq!(io.remaining_input(), &[-4]);
        assert_eq!(io.read_input(), Some(-4));
        assert_eq!(io.read_input(), None);
        assert_eq!(io.read_input(), None);
        assert!(io.remaining_input().is_empty());
    }

    #[test]
    fn buffered_collects_output() {
        let mut io = BufferedIo::new(Vec::new());
        io.write_output(1);
        io.write_output(0);
        io.write_output(-9);
        assert_eq!(io.output(), &[1, 0, -9]);
        assert_eq!(io.into_output(), vec![1, 0, -9]);
    }

    fn echo_all<I: Io>(mut io: I) {
        while let Some(value) = io.read_input() {
            io.write_output(value * 2);
        }
    }

    #[test]
    fn borrowed_capability_forwards() {
        let mut io = BufferedIo::new(vec![8, 1]);
        echo_all(&mut io);
        assert_eq!(io.output(), &[16, 2]);
        assert!(io.remaining_input().is_empty());
    }

    #[test]
    fn interactive_reads_several_values_per_line() {
        let mut io = interactive("1 2\n\n  -3\t4\n");
        assert_eq!(io.read_input(), Some(1));
        assert_eq!(io.read_input(), Some(2));
        assert_eq!(io.read_input(), Some(-3));
        assert_eq!(io.read_input(), Some(4));
        assert_eq!(io.read_input(), None);
    }

    #[test]
    fn interactive_stops_at_garbage() {
        let mut io = interactive("5 six 7\n8\n");
        assert_eq!(io.read_input(), Some(5));
        assert_eq!(io.read_input(), None);
        // Once closed, later lines are never read.
        assert_eq!(io.read_input(), None);
    }

    /// Writer whose every write fails, like a closed pipe.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn failed_write_ends_input() {
        let mut io = InteractiveIo::new(Cursor::new(b"1 2\n3\n".to_vec()), BrokenPipe);
        assert_eq!(io.read_input(), Some(1));
        io.write_output(1);
        assert_eq!(io.read_input(), None);
        assert_eq!(io.read_input(), None);
    }

    #[test]
    fn interactive_writes_one_value_per_line() {
        let mut io = interactive("");
        io.write_output(10);
        io.write_output(-2);
        assert_eq!(io.read_input(), None);
        assert_eq!(String::from_utf8(io.into_writer()).unwrap(), "10\n-2\n");
    }
}
