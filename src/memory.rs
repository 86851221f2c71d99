use thiserror::Error;

pub mod load;

pub type Byte = u8; // 1 byte
pub type Word = u16; // 2 bytes

/// Number of addressable bytes of the LS-8
pub const RAM_SIZE: usize = 256;

/// Default memory
pub type Ram = Memory<RAM_SIZE>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory has no address `0x{address:x}` (size is 0x{size:x})")]
    OutOfBounds { address: usize, size: usize },
}

pub type Result<T, E = MemoryError> = std::result::Result<T, E>;

/// Emulates memory for use with the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory<const S: usize> {
    /// The actual data of the memory
    pub data: [Byte; S],
}

impl<const S: usize> Default for Memory<S> {
    /// Initializes the memory
    fn default() -> Self {
        Memory { data: [0; S] }
    }
}

impl<const S: usize> Memory<S> {
    fn check(address: usize) -> Result<usize> {
        if address < S {
            Ok(address)
        } else {
            Err(MemoryError::OutOfBounds { address, size: S })
        }
    }

    /// Reads a byte from the memory
    pub fn read_byte(&self, position: Word) -> Result<Byte> {
        Ok(self.data[Self::check(position as usize)?])
    }

    /// Writes a byte to the memory
    pub fn write_byte(&mut self, position: Word, value: Byte) -> Result<()> {
        self.data[Self::check(position as usize)?] = value;
        Ok(())
    }

    /// Writes an array of bytes to the memory
    pub fn write_array(&mut self, position: Word, data: &[Byte]) -> Result<()> {
        let start = position as usize;
        if data.is_empty() {
            return Self::check(start).map(|_| ());
        }
        let end = Self::check(start + data.len() - 1)? + 1;
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Logs every row containing non-zero bytes
    pub fn dump(&self) {
        for (row, chunk) in self.data.chunks(16).enumerate() {
            if chunk.iter().all(|b| *b == 0) {
                continue;
            }
            let bytes: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            log::debug!("{:04X}: {}", row * 16, bytes.join(" "));
        }
    }
}

/// Writes a block of instructions and operands directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $byte:expr ),+ ) => {
        $mem.write_array($pos, &[
            $(
                $byte as $crate::memory::Byte,
            )+
        ])
    };
}
