//! subleq library.
//!
//! A one-instruction computer (subtract and branch if less than or equal to
//! zero) together with the two-pass assembler that produces its programs.

pub mod utils;
pub mod virtual_machine;
