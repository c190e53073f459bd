//! Program image decoding: byte order and load-address policy.

use thiserror::Error;

use crate::memory::{ADDRESS_SPACE_WORDS, PROGRAM_ORIGIN};

/// Byte order of the 16-bit words stored in an image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ByteOrder {
    /// Most significant byte first, as written by LC-3 assemblers.
    #[default]
    Big,
    /// Least significant byte first, as dumped from a little-endian host.
    Little,
}

impl ByteOrder {
    const fn word(self, bytes: [u8; 2]) -> u16 {
        match self {
            Self::Big => u16::from_be_bytes(bytes),
            Self::Little => u16::from_le_bytes(bytes),
        }
    }
}

/// Where an image is placed in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Origin {
    /// Load every word verbatim starting at the given address.
    Fixed(u16),
    /// The first word is the load address; the rest is the program.
    Header,
}

impl Default for Origin {
    fn default() -> Self {
        Self::Fixed(PROGRAM_ORIGIN)
    }
}

/// Options controlling how raw bytes become a [`ProgramImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LoadOptions {
    /// Word byte order.
    pub byte_order: ByteOrder,
    /// Load-address policy.
    pub origin: Origin,
}

/// Reasons a program image is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum LoadError {
    /// The image holds no program words.
    #[error("program image is empty")]
    Empty,
    /// The image ends in the middle of a word.
    #[error("program image length of {len} bytes is not a whole number of words")]
    TruncatedWord {
        /// Image length in bytes.
        len: usize,
    },
    /// The image does not fit between its origin and the top of memory.
    #[error(
        "program image of {words} words does not fit at origin {origin:#06x} \
         ({capacity} words available)"
    )]
    TooLarge {
        /// Program length in words.
        words: usize,
        /// Requested load address.
        origin: u16,
        /// Words available from `origin` to the top of memory.
        capacity: usize,
    },
}

/// A decoded program ready to be copied into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    origin: u16,
    words: Vec<u16>,
}

impl ProgramImage {
    /// Builds an image from already-decoded words.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Empty`] for an empty program and
    /// [`LoadError::TooLarge`] when it cannot fit above `origin`.
    pub fn new(origin: u16, words: Vec<u16>) -> Result<Self, LoadError> {
        if words.is_empty() {
            return Err(LoadError::Empty);
        }

        let capacity = ADDRESS_SPACE_WORDS - usize::from(origin);
        if words.len() > capacity {
            return Err(LoadError::TooLarge {
                words: words.len(),
                origin,
                capacity,
            });
        }

        Ok(Self { origin, words })
    }

    /// Decodes a raw image file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::TruncatedWord`] for odd byte counts, plus the
    /// errors of [`ProgramImage::new`].
    pub fn from_bytes(bytes: &[u8], options: LoadOptions) -> Result<Self, LoadError> {
        if !bytes.len().is_multiple_of(2) {
            return Err(LoadError::TruncatedWord { len: bytes.len() });
        }

        let mut words = bytes
            .chunks_exact(2)
            .map(|pair| options.byte_order.word([pair[0], pair[1]]));

        let origin = match options.origin {
            Origin::Fixed(addr) => addr,
            Origin::Header => words.next().ok_or(LoadError::Empty)?,
        };

        Self::new(origin, words.collect())
    }

    /// Load address and initial program counter.
    #[must_use]
    pub const fn origin(&self) -> u16 {
        self.origin
    }

    /// Program words in load order.
    #[must_use]
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Program length in words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always `false`; empty images are rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteOrder, LoadError, LoadOptions, Origin, ProgramImage};
    use crate::memory::PROGRAM_ORIGIN;

    #[test]
    fn default_options_load_big_endian_at_program_origin() {
        let image = ProgramImage::from_bytes(&[0xF0, 0x25, 0x12, 0x34], LoadOptions::default())
            .expect("valid image");

        assert_eq!(image.origin(), PROGRAM_ORIGIN);
        assert_eq!(image.words(), &[0xF025, 0x1234]);
        assert_eq!(image.len(), 2);
        assert!(!image.is_empty());
    }

    #[test]
    fn little_endian_images_are_swapped() {
        let options = LoadOptions {
            byte_order: ByteOrder::Little,
            ..LoadOptions::default()
        };
        let image = ProgramImage::from_bytes(&[0x25, 0xF0], options).expect("valid image");
        assert_eq!(image.words(), &[0xF025]);
    }

    #[test]
    fn header_origin_consumes_first_word() {
        let options = LoadOptions {
            origin: Origin::Header,
            ..LoadOptions::default()
        };
        let image =
            ProgramImage::from_bytes(&[0x40, 0x00, 0xF0, 0x25], options).expect("valid image");

        assert_eq!(image.origin(), 0x4000);
        assert_eq!(image.words(), &[0xF025]);
    }

    #[test]
    fn header_without_program_is_empty() {
        let options = LoadOptions {
            origin: Origin::Header,
            ..LoadOptions::default()
        };
        assert_eq!(
            ProgramImage::from_bytes(&[0x30, 0x00], options),
            Err(LoadError::Empty)
        );
        assert_eq!(
            ProgramImage::from_bytes(&[], options),
            Err(LoadError::Empty)
        );
    }

    #[test]
    fn odd_length_is_rejected() {
        assert_eq!(
            ProgramImage::from_bytes(&[0xF0, 0x25, 0x00], LoadOptions::default()),
            Err(LoadError::TruncatedWord { len: 3 })
        );
    }

    #[test]
    fn oversized_image_is_rejected() {
        let capacity = 0x1_0000 - usize::from(PROGRAM_ORIGIN);
        assert!(ProgramImage::new(PROGRAM_ORIGIN, vec![0; capacity]).is_ok());
        assert_eq!(
            ProgramImage::new(PROGRAM_ORIGIN, vec![0; capacity + 1]),
            Err(LoadError::TooLarge {
                words: capacity + 1,
                origin: PROGRAM_ORIGIN,
                capacity,
            })
        );
    }
}
