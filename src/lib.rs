//! An emulator for the LS-8, a small 8-bit CPU with 256 bytes of memory,
//! eight registers and a downward growing stack.
//!
//! ```
//! use ls8::memory::Ram;
//! use ls8::processor::Processor;
//!
//! let program = "10000010\n00000000\n00001000\n01000111\n00000000\n00000001";
//! let mut cpu = Processor::new(program.parse::<Ram>()?);
//! let mut out = Vec::new();
//! cpu.run(&mut out)?;
//!
//! assert_eq!(out, b"8\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod alu;
pub mod memory;
pub mod processor;
pub mod registers;

pub use memory::load::{LoadError, ParseError};
pub use memory::{MemoryError, Ram};
pub use processor::{ExecError, Instruction, Processor};
pub use registers::{Flags, RegisterError, Registers};
