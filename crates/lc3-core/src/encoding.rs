//! Primary opcode table (`OP` field, bits 15..12).

use crate::bits::field;

/// The sixteen primary opcodes of the LC-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

/// Opcode table indexed by the 4-bit `OP` field.
pub const OPCODE_TABLE: [Opcode; 16] = [
    Opcode::Br,
    Opcode::Add,
    Opcode::Ld,
    Opcode::St,
    Opcode::Jsr,
    Opcode::And,
    Opcode::Ldr,
    Opcode::Str,
    Opcode::Rti,
    Opcode::Not,
    Opcode::Ldi,
    Opcode::Sti,
    Opcode::Jmp,
    Opcode::Res,
    Opcode::Lea,
    Opcode::Trap,
];

const _: () = assert_opcode_table_layout();

const fn assert_opcode_table_layout() {
    let mut index = 0;
    while index < OPCODE_TABLE.len() {
        assert!(
            OPCODE_TABLE[index] as usize == index,
            "opcode table must be indexed by OP value"
        );
        index += 1;
    }
}

impl Opcode {
    /// Classifies the top four bits of an instruction word.
    #[must_use]
    pub const fn from_word(word: u16) -> Self {
        OPCODE_TABLE[field(word, 15, 12) as usize]
    }

    /// Assembler mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Br => "BR",
            Self::Add => "ADD",
            Self::Ld => "LD",
            Self::St => "ST",
            Self::Jsr => "JSR",
            Self::And => "AND",
            Self::Ldr => "LDR",
            Self::Str => "STR",
            Self::Rti => "RTI",
            Self::Not => "NOT",
            Self::Ldi => "LDI",
            Self::Sti => "STI",
            Self::Jmp => "JMP",
            Self::Res => "RES",
            Self::Lea => "LEA",
            Self::Trap => "TRAP",
        }
    }

    /// Opcodes with no user-mode semantics.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(self, Self::Rti | Self::Res)
    }

    /// Opcodes that write a destination register and set the condition code.
    #[must_use]
    pub const fn sets_condition_code(self) -> bool {
        matches!(
            self,
            Self::Add | Self::And | Self::Not | Self::Ld | Self::Ldi | Self::Ldr | Self::Lea
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Opcode, OPCODE_TABLE};

    #[test]
    fn every_op_field_value_maps_to_its_table_entry() {
        for op in 0u16..16 {
            let opcode = Opcode::from_word(op << 12 | 0x0ABC);
            assert_eq!(opcode as u16, op);
            assert_eq!(OPCODE_TABLE[usize::from(op)], opcode);
        }
    }

    #[test]
    fn only_rti_and_res_are_reserved() {
        let reserved: Vec<_> = OPCODE_TABLE
            .iter()
            .filter(|opcode| opcode.is_reserved())
            .map(|opcode| opcode.mnemonic())
            .collect();
        assert_eq!(reserved, ["RTI", "RES"]);
    }

    #[test]
    fn control_and_store_opcodes_leave_condition_code_alone() {
        for opcode in [
            Opcode::Br,
            Opcode::Jmp,
            Opcode::Jsr,
            Opcode::St,
            Opcode::Sti,
            Opcode::Str,
            Opcode::Trap,
        ] {
            assert!(!opcode.sets_condition_code(), "{}", opcode.mnemonic());
        }
    }
}
