//! Single-instruction virtual machine and its assembler.
//!
//! Every instruction is a triple `subleq A, B, C`: subtract `M[B]` from `M[A]`
//! and jump to `C` when the result is less than or equal to zero. Two sentinel
//! addresses turn the same triple into I/O.
//!
//! # Architecture
//!
//! - **Memory**: a fixed number of signed 64-bit words, zeroed at construction
//! - **Instruction format**: three consecutive words, no opcode field
//! - **I/O**: `A = -2` outputs, `B = -1` inputs, both together echo
//! - **Halting**: any out-of-range fetch or operand stops the machine, as does
//!   running out of input
//!
//! # Modules
//!
//! - [`assembler`]: Two-pass assembly of labelled source into machine words
//! - [`errors`]: Configuration, assembly and image decoding errors
//! - [`io`]: The I/O capability and its interactive and buffered implementations
//! - [`isa`]: Word type, sentinels, mnemonics and instruction decoding
//! - [`program`]: Assembled program and its binary image format
//! - [`vm`]: Fetch/execute loop over bounded memory

pub mod assembler;
pub mod errors;
pub mod io;
pub mod isa;
pub mod program;
pub mod vm;
