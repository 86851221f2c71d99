//! Register file and condition flags of the LS-8.

use std::fmt;

use thiserror::Error;

use crate::memory::Byte;

/// Number of general purpose registers
pub const REGISTER_COUNT: usize = 8;

/// Register reserved as stack pointer
pub const SP: Byte = 7;

/// Initial stack pointer. The stack grows downwards from here.
pub const STACK_START: Byte = 0xF4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("there is no register R{index}")]
    OutOfRange { index: Byte },
}

pub type Result<T, E = RegisterError> = std::result::Result<T, E>;

/// The eight byte-sized registers. `R7` holds the stack pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registers {
    data: [Byte; REGISTER_COUNT],
}

impl Default for Registers {
    fn default() -> Self {
        let mut data = [0; REGISTER_COUNT];
        data[SP as usize] = STACK_START;
        Self { data }
    }
}

impl Registers {
    fn check(index: Byte) -> Result<usize> {
        if (index as usize) < REGISTER_COUNT {
            Ok(index as usize)
        } else {
            Err(RegisterError::OutOfRange { index })
        }
    }

    pub fn read(&self, index: Byte) -> Result<Byte> {
        Ok(self.data[Self::check(index)?])
    }

    pub fn write(&mut self, index: Byte, value: Byte) -> Result<()> {
        self.data[Self::check(index)?] = value;
        Ok(())
    }

    /// Stack pointer
    pub fn sp(&self) -> Byte {
        self.data[SP as usize]
    }

    pub fn set_sp(&mut self, value: Byte) {
        self.data[SP as usize] = value;
    }

    pub fn as_slice(&self) -> &[Byte] {
        &self.data
    }
}

/// Result of the last comparison, laid out as `00000LGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(Byte);

impl Flags {
    pub const EQUAL: Byte = 0b0000_0001;
    pub const GREATER: Byte = 0b0000_0010;
    pub const LESS: Byte = 0b0000_0100;

    /// Flags describing how `a` relates to `b`
    pub fn compare(a: Byte, b: Byte) -> Self {
        if a == b {
            Self(Self::EQUAL)
        } else if a > b {
            Self(Self::GREATER)
        } else {
            Self(Self::LESS)
        }
    }

    pub fn bits(self) -> Byte {
        self.0
    }

    pub fn equal(self) -> bool {
        self.0 & Self::EQUAL != 0
    }

    pub fn greater(self) -> bool {
        self.0 & Self::GREATER != 0
    }

    pub fn less(self) -> bool {
        self.0 & Self::LESS != 0
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}
