//! Assembled program representation and serialization.
//!
//! A [`Program`] is the hand-off between the assembler and the VM: the machine
//! words to load at address 0 plus the labels that produced them. It can be
//! written to a portable binary image and read back.
//!
//! # Image format
//!
//! All integers are little-endian.
//!
//! ```text
//! magic "SBLQ" | version (3 x u8) | word count (u64) | words (i64 ...)
//!              | label count (u64) | { name len (u64) | name (utf-8) | address (i64) } ...
//! ```

use crate::virtual_machine::assembler::SymbolTable;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Word;

/// Magic bytes identifying a serialized program image.
const MAGIC: &[u8; 4] = b"SBLQ";

/// Current image format version.
const CURRENT_VERSION: Version = Version::new(1, 0, 0);

/// Semantic version for image format compatibility.
#[derive(Debug, PartialEq, Eq)]
struct Version {
    major: u8,
    minor: u8,
    patch: u8,
}

impl Version {
    const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Assembled machine words with their label table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// Words to load starting at address 0.
    pub words: Vec<Word>,
    /// Labels defined by the source, by address.
    pub labels: SymbolTable,
}

impl Program {
    pub fn new(words: Vec<Word>, labels: SymbolTable) -> Self {
        Self { words, labels }
    }

    /// Number of machine words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns true if `bytes` starts with the program image magic.
    pub fn is_image(bytes: &[u8]) -> bool {
        bytes.starts_with(MAGIC)
    }

    /// Serializes the program to a portable binary image.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAGIC.len() + 3 + 16 + self.words.len() * 8);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[
            CURRENT_VERSION.major,
            CURRENT_VERSION.minor,
            CURRENT_VERSION.patch,
        ]);
        out.extend_from_slice(&(self.words.len() as u64).to_le_bytes());
        for word in &self.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(&(self.labels.len() as u64).to_le_bytes());
        for (name, address) in self.labels.iter() {
            out.extend_from_slice(&(name.len() as u64).to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&address.to_le_bytes());
        }
        out
    }

    /// Deserializes a program from its binary image.
    ///
    /// Validates the magic header and version and rejects truncated input or
    /// trailing bytes.
    pub fn from_bytes(input: &[u8]) -> Result<Self, VMError> {
        let mut reader = Reader { input };

        if reader.take(MAGIC.len())? != MAGIC {
            return Err(decode_error("bad magic"));
        }

        let version = reader.take(3)?;
        if Version::new(version[0], version[1], version[2]) != CURRENT_VERSION {
            return Err(decode_error("unsupported version"));
        }

        let count = reader.len_prefix(8)?;
        let mut words = Vec::with_capacity(count);
        for _ in 0..count {
            words.push(reader.word()?);
        }

        let label_count = reader.len_prefix(17)?;
        let mut labels = Vec::with_capacity(label_count);
        for _ in 0..label_count {
            let len = reader.len_prefix(1)?;
            let name = std::str::from_utf8(reader.take(len)?)
                .map_err(|_| decode_error("label name is not utf-8"))?
                .to_string();
            labels.push((name, reader.word()?));
        }

        if !reader.input.is_empty() {
            return Err(decode_error("trailing bytes"));
        }
        Ok(Program::new(words, labels.into_iter().collect()))
    }
}

fn decode_error(reason: &str) -> VMError {
    VMError::DecodeError {
        reason: reason.to_string(),
    }
}

/// Cursor over an image being decoded.
struct Reader<'a> {
    input: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, count: usize) -> Result<&'a [u8], VMError> {
        if self.input.len() < count {
            return Err(decode_error("truncated"));
        }
        let (head, rest) = self.input.split_at(count);
        self.input = rest;
        Ok(head)
    }

    fn u64(&mut self) -> Result<u64, VMError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn word(&mut self) -> Result<Word, VMError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(Word::from_le_bytes(buf))
    }

    /// Reads a length prefix, rejecting counts that cannot fit in the remaining
    /// input given each element takes at least `min_element_size` bytes.
    fn len_prefix(&mut self, min_element_size: usize) -> Result<usize, VMError> {
        let count = usize::try_from(self.u64()?).map_err(|_| decode_error("length overflow"))?;
        match count.checked_mul(min_element_size) {
            Some(needed) if needed <= self.input.len() => Ok(count),
            _ => Err(decode_error("length overflow")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::assembler::assemble_source;

    fn sample() -> Program {
        assemble_source(
            "
        start: subleq x, @IN
               subleq @OUT, x, start
        x:     .data -12
        ",
        )
        .unwrap()
    }

    #[test]
    fn image_round_trip_keeps_words_and_labels() {
        let program = sample();
        let bytes = program.to_bytes();
        assert!(Program::is_image(&bytes));

        let decoded = Program::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, program);
        assert_eq!(decoded.labels.get("x"), Some(6));
        assert_eq!(decoded.len(), 7);
    }

    #[test]
    fn empty_program_round_trip() {
        let program = Program::default();
        let bytes = program.to_bytes();
        assert_eq!(bytes.len(), 4 + 3 + 8 + 8);
        assert!(Program::from_bytes(&bytes).unwrap().is_empty());
    }

    #[test]
    fn assembly_text_is_not_an_image() {
        assert!(!Program::is_image(b"subleq 0, 0"));
        assert!(!Program::is_image(b""));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Program::from_bytes(&bytes),
            Err(VMError::DecodeError { ref reason }) if reason == "bad magic"
        ));
    }

    #[test]
    fn rejects_other_versions() {
        let mut bytes = sample().to_bytes();
        bytes[4] += 1;
        assert!(matches!(
            Program::from_bytes(&bytes),
            Err(VMError::DecodeError { ref reason }) if reason == "unsupported version"
        ));
    }

    #[test]
    fn rejects_truncated_and_trailing_input() {
        let bytes = sample().to_bytes();
        for cut in [0, 3, 6, 10, bytes.len() - 1] {
            assert!(
                Program::from_bytes(&bytes[..cut]).is_err(),
                "accepted a {cut}-byte prefix"
            );
        }

        let mut extended = bytes.clone();
        extended.push(0);
        assert!(matches!(
            Program::from_bytes(&extended),
            Err(VMError::DecodeError { ref reason }) if reason == "trailing bytes"
        ));
    }

    #[test]
    fn rejects_huge_length_prefix() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0, 0]);
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            Program::from_bytes(&bytes),
            Err(VMError::DecodeError { ref reason }) if reason == "length overflow"
        ));
    }
}
