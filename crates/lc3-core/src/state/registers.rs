/// Number of architecturally visible general-purpose registers (`R0..R7`).
pub const GENERAL_REGISTER_COUNT: usize = 8;

/// Architecturally visible general-purpose register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum GeneralRegister {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
}

impl GeneralRegister {
    /// Link register written by `JSR`, `JSRR` and `TRAP`.
    pub const LINK: Self = Self::R7;

    /// Returns the array index for this register (`0..=7`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes the register field starting at bit `lo` of an instruction word.
    #[must_use]
    pub const fn from_field(word: u16, lo: u8) -> Self {
        match (word >> lo) & 0x7 {
            0 => Self::R0,
            1 => Self::R1,
            2 => Self::R2,
            3 => Self::R3,
            4 => Self::R4,
            5 => Self::R5,
            6 => Self::R6,
            _ => Self::R7,
        }
    }
}

/// Condition code summarising the sign of the last register-defining result.
///
/// Exactly one of negative, zero and positive holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ConditionCode {
    /// Bit 15 of the result was set.
    Negative,
    /// The result was zero.
    #[default]
    Zero,
    /// The result was non-zero with bit 15 clear.
    Positive,
}

impl ConditionCode {
    /// Classifies a 16-bit result.
    #[must_use]
    pub const fn from_result(value: u16) -> Self {
        if value == 0 {
            Self::Zero
        } else if value & 0x8000 != 0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }

    /// Returns this code as an `n/z/p` bit mask (`n = 0b100`).
    #[must_use]
    pub const fn nzp_bits(self) -> u8 {
        match self {
            Self::Negative => 0b100,
            Self::Zero => 0b010,
            Self::Positive => 0b001,
        }
    }

    /// Returns `true` for [`ConditionCode::Negative`].
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::Negative)
    }

    /// Returns `true` for [`ConditionCode::Zero`].
    #[must_use]
    pub const fn is_zero(self) -> bool {
        matches!(self, Self::Zero)
    }

    /// Returns `true` for [`ConditionCode::Positive`].
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Positive)
    }
}

/// Register file of the LC-3: `R0..R7`, `PC` and the condition code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    gpr: [u16; GENERAL_REGISTER_COUNT],
    pc: u16,
    cond: ConditionCode,
}

impl RegisterFile {
    /// Reads a general-purpose register.
    #[must_use]
    pub const fn gpr(&self, reg: GeneralRegister) -> u16 {
        self.gpr[reg.index()]
    }

    /// Writes a general-purpose register without touching the condition code.
    pub const fn set_gpr(&mut self, reg: GeneralRegister, value: u16) {
        self.gpr[reg.index()] = value;
    }

    /// Writes a destination register and derives the condition code from it.
    pub const fn write_result(&mut self, reg: GeneralRegister, value: u16) {
        self.gpr[reg.index()] = value;
        self.cond = ConditionCode::from_result(value);
    }

    /// Reads the `PC` register.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Writes the `PC` register.
    pub const fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    /// Reads the condition code.
    #[must_use]
    pub const fn cond(&self) -> ConditionCode {
        self.cond
    }

    /// Overwrites the condition code.
    pub const fn set_cond(&mut self, cond: ConditionCode) {
        self.cond = cond;
    }
}
