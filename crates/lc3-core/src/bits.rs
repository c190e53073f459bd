//! Bit-field extraction and sign extension for raw instruction words.

/// Returns a mask covering the low `bit_count` bits of a word.
const fn low_mask(bit_count: u8) -> u16 {
    if bit_count >= 16 {
        u16::MAX
    } else {
        (1 << bit_count) - 1
    }
}

/// Extracts the inclusive bit range `hi..=lo` of `word`, right-aligned.
#[must_use]
pub const fn field(word: u16, hi: u8, lo: u8) -> u16 {
    debug_assert!(hi < 16 && hi >= lo, "bit range must lie within a word");
    (word >> lo) & low_mask(hi - lo + 1)
}

/// Returns `true` when bit `index` of `word` is set.
#[must_use]
pub const fn bit(word: u16, index: u8) -> bool {
    (word >> index) & 1 == 1
}

/// Sign-extends the low `bit_count` bits of `value` to a full 16-bit word.
///
/// Bits of `value` above `bit_count` are ignored, so a raw instruction word can
/// be passed without masking the field first.
#[must_use]
pub const fn sign_extend(value: u16, bit_count: u8) -> u16 {
    if bit_count == 0 {
        return 0;
    }
    if bit_count >= 16 {
        return value;
    }

    let mask = low_mask(bit_count);
    let value = value & mask;
    if bit(value, bit_count - 1) {
        value | !mask
    } else {
        value
    }
}
