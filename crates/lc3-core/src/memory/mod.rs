//! Word-addressed memory model with wraparound addressing.

use std::fmt;

use thiserror::Error;

/// Fixed address map and device register decoding.
pub mod map;

pub use map::{
    decode_device_register, DeviceRegister, DDR, DEVICE_PAGE_START, DSR, KBDR, KBSR, MCR,
    PROGRAM_ORIGIN, STATUS_READY,
};

use crate::image::LoadError;

/// Number of addressable 16-bit words (64 Ki).
pub const ADDRESS_SPACE_WORDS: usize = u16::MAX as usize + 1;

/// Normalizes an arbitrary address into the 16-bit address space.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn wrap_address(addr: usize) -> u16 {
    (addr % ADDRESS_SPACE_WORDS) as u16
}

/// Flat 64 Ki-word store, zero-initialised.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<u16>", into = "Vec<u16>"))]
pub struct Memory {
    words: Box<[u16]>,
}

/// Word vector that does not cover exactly the whole address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("memory snapshot holds {words} words, expected 65536")]
pub struct MemorySizeError {
    /// Number of words supplied.
    pub words: usize,
}

impl TryFrom<Vec<u16>> for Memory {
    type Error = MemorySizeError;

    fn try_from(words: Vec<u16>) -> Result<Self, Self::Error> {
        if words.len() != ADDRESS_SPACE_WORDS {
            return Err(MemorySizeError { words: words.len() });
        }

        Ok(Self {
            words: words.into_boxed_slice(),
        })
    }
}

impl From<Memory> for Vec<u16> {
    fn from(memory: Memory) -> Self {
        memory.words.into_vec()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let populated = self.words.iter().filter(|word| **word != 0).count();
        f.debug_struct("Memory")
            .field("words", &self.words.len())
            .field("populated", &populated)
            .finish()
    }
}

impl Memory {
    /// Allocates a zeroed address space.
    #[must_use]
    pub fn new() -> Self {
        Self {
            words: vec![0; ADDRESS_SPACE_WORDS].into_boxed_slice(),
        }
    }

    /// Reads the word at `addr`.
    #[must_use]
    pub fn read(&self, addr: u16) -> u16 {
        self.words[usize::from(addr)]
    }

    /// Writes the word at `addr`.
    pub fn write(&mut self, addr: u16, value: u16) {
        self.words[usize::from(addr)] = value;
    }

    /// Reads the word at `addr` taken modulo the address space size.
    #[must_use]
    pub fn read_at(&self, addr: usize) -> u16 {
        self.read(wrap_address(addr))
    }

    /// Copies `words` into memory starting at `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::TooLarge`] when the block would run past the top of
    /// the address space; memory is left untouched in that case.
    pub fn load(&mut self, origin: u16, words: &[u16]) -> Result<(), LoadError> {
        let start = usize::from(origin);
        let capacity = ADDRESS_SPACE_WORDS - start;
        if words.len() > capacity {
            return Err(LoadError::TooLarge {
                words: words.len(),
                origin,
                capacity,
            });
        }

        self.words[start..start + words.len()].copy_from_slice(words);
        Ok(())
    }

    /// Full backing store in address order.
    #[must_use]
    pub fn as_slice(&self) -> &[u16] {
        &self.words
    }
}
