//! Instruction decoder for the LC-3 ISA.
//!
//! A raw word is decoded into a closed [`Instruction`] variant with every
//! immediate already sign-extended, so the execute engine never looks at raw
//! bit fields.

use crate::bits::{bit, field, sign_extend};
use crate::encoding::Opcode;
use crate::fault::FaultCode;
use crate::state::{ConditionCode, GeneralRegister};

/// Second source operand of `ADD` and `AND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Register mode (bit 5 clear).
    Register(GeneralRegister),
    /// Sign-extended `imm5` (bit 5 set).
    Immediate(u16),
}

/// Destination of `JSR` / `JSRR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpTarget {
    /// `JSR`: sign-extended `PCoffset11` relative to the incremented PC.
    PcRelative(u16),
    /// `JSRR`: address held in a base register.
    Register(GeneralRegister),
}

/// The `n/z/p` test bits of a `BR` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConditionMask(u8);

impl ConditionMask {
    /// `BR` with no bits set; never taken.
    pub const NEVER: Self = Self(0);
    /// `BRnzp`; always taken.
    pub const ALWAYS: Self = Self(0b111);

    /// Builds a mask from the low three bits of `bits` (`n = 0b100`).
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    /// Returns `true` when the branch is taken under `cond`.
    #[must_use]
    pub const fn tests(self, cond: ConditionCode) -> bool {
        self.0 & cond.nzp_bits() != 0
    }
}

/// A fully decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Instruction {
    Br {
        mask: ConditionMask,
        offset: u16,
    },
    Add {
        dr: GeneralRegister,
        sr1: GeneralRegister,
        operand: Operand,
    },
    Ld {
        dr: GeneralRegister,
        offset: u16,
    },
    St {
        sr: GeneralRegister,
        offset: u16,
    },
    Jsr {
        target: JumpTarget,
    },
    And {
        dr: GeneralRegister,
        sr1: GeneralRegister,
        operand: Operand,
    },
    Ldr {
        dr: GeneralRegister,
        base: GeneralRegister,
        offset: u16,
    },
    Str {
        sr: GeneralRegister,
        base: GeneralRegister,
        offset: u16,
    },
    Not {
        dr: GeneralRegister,
        sr: GeneralRegister,
    },
    Ldi {
        dr: GeneralRegister,
        offset: u16,
    },
    Sti {
        sr: GeneralRegister,
        offset: u16,
    },
    Jmp {
        base: GeneralRegister,
    },
    Lea {
        dr: GeneralRegister,
        offset: u16,
    },
    Trap {
        vector: u8,
    },
}

impl Instruction {
    /// Primary opcode this instruction was decoded from.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Br { .. } => Opcode::Br,
            Self::Add { .. } => Opcode::Add,
            Self::Ld { .. } => Opcode::Ld,
            Self::St { .. } => Opcode::St,
            Self::Jsr { .. } => Opcode::Jsr,
            Self::And { .. } => Opcode::And,
            Self::Ldr { .. } => Opcode::Ldr,
            Self::Str { .. } => Opcode::Str,
            Self::Not { .. } => Opcode::Not,
            Self::Ldi { .. } => Opcode::Ldi,
            Self::Sti { .. } => Opcode::Sti,
            Self::Jmp { .. } => Opcode::Jmp,
            Self::Lea { .. } => Opcode::Lea,
            Self::Trap { .. } => Opcode::Trap,
        }
    }
}

const fn dr(word: u16) -> GeneralRegister {
    GeneralRegister::from_field(word, 9)
}

const fn base(word: u16) -> GeneralRegister {
    GeneralRegister::from_field(word, 6)
}

const fn pc_offset9(word: u16) -> u16 {
    sign_extend(word, 9)
}

const fn alu_operand(word: u16) -> Operand {
    if bit(word, 5) {
        Operand::Immediate(sign_extend(word, 5))
    } else {
        Operand::Register(GeneralRegister::from_field(word, 0))
    }
}

/// Instruction decoder for the LC-3 ISA.
#[derive(Debug)]
pub struct Decoder;

impl Decoder {
    /// Decodes a 16-bit instruction word.
    ///
    /// Fields the architecture defines as fixed (for example the low six bits
    /// of `NOT`) are not validated.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::UnusedOpcode`] for `RTI` and
    /// [`FaultCode::ReservedOpcode`] for opcode `0b1101`.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn decode(word: u16) -> Result<Instruction, FaultCode> {
        let instruction = match Opcode::from_word(word) {
            Opcode::Br => Instruction::Br {
                mask: ConditionMask::from_bits(field(word, 11, 9) as u8),
                offset: pc_offset9(word),
            },
            Opcode::Add => Instruction::Add {
                dr: dr(word),
                sr1: base(word),
                operand: alu_operand(word),
            },
            Opcode::Ld => Instruction::Ld {
                dr: dr(word),
                offset: pc_offset9(word),
            },
            Opcode::St => Instruction::St {
                sr: dr(word),
                offset: pc_offset9(word),
            },
            Opcode::Jsr => Instruction::Jsr {
                target: if bit(word, 11) {
                    JumpTarget::PcRelative(sign_extend(word, 11))
                } else {
                    JumpTarget::Register(base(word))
                },
            },
            Opcode::And => Instruction::And {
                dr: dr(word),
                sr1: base(word),
                operand: alu_operand(word),
            },
            Opcode::Ldr => Instruction::Ldr {
                dr: dr(word),
                base: base(word),
                offset: sign_extend(word, 6),
            },
            Opcode::Str => Instruction::Str {
                sr: dr(word),
                base: base(word),
                offset: sign_extend(word, 6),
            },
            Opcode::Not => Instruction::Not {
                dr: dr(word),
                sr: base(word),
            },
            Opcode::Ldi => Instruction::Ldi {
                dr: dr(word),
                offset: pc_offset9(word),
            },
            Opcode::Sti => Instruction::Sti {
                sr: dr(word),
                offset: pc_offset9(word),
            },
            Opcode::Jmp => Instruction::Jmp { base: base(word) },
            Opcode::Lea => Instruction::Lea {
                dr: dr(word),
                offset: pc_offset9(word),
            },
            Opcode::Trap => Instruction::Trap {
                vector: field(word, 7, 0) as u8,
            },
            Opcode::Rti => return Err(FaultCode::UnusedOpcode),
            Opcode::Res => return Err(FaultCode::ReservedOpcode),
        };

        Ok(instruction)
    }
}
