use thiserror::Error;

/// Fault classes used for reporting and halt policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Decoder or trap dispatcher rejected an instruction.
    Decode,
    /// Console adapter failed or was interrupted.
    Console,
}

/// Stable fault taxonomy for instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// `RTI` (opcode `0b1000`) has no meaning without supervisor mode.
    #[error("unused opcode RTI")]
    UnusedOpcode = 0x01,
    /// Opcode `0b1101` is reserved.
    #[error("reserved opcode")]
    ReservedOpcode = 0x02,
    /// `TRAP` named a vector with no service routine.
    #[error("undefined trap vector")]
    UndefinedTrapVector = 0x03,
    /// Reading a console character failed.
    #[error("console read failed")]
    ConsoleRead = 0x04,
    /// Writing or flushing console output failed.
    #[error("console write failed")]
    ConsoleWrite = 0x05,
    /// A blocking console read was cancelled by the host.
    #[error("console input interrupted")]
    ConsoleInterrupted = 0x06,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::UnusedOpcode | Self::ReservedOpcode | Self::UndefinedTrapVector => {
                FaultClass::Decode
            }
            Self::ConsoleRead | Self::ConsoleWrite | Self::ConsoleInterrupted => {
                FaultClass::Console
            }
        }
    }

    /// Faults that halt the machine and stay latched.
    ///
    /// An interrupted read is host cancellation, not a machine state change.
    #[must_use]
    pub const fn is_latching(self) -> bool {
        !matches!(self, Self::ConsoleInterrupted)
    }
}

/// A fault raised while executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{code} (instruction {word:#06x} at {pc:#06x})")]
pub struct Fault {
    /// What went wrong.
    pub code: FaultCode,
    /// Address the faulting instruction was fetched from.
    pub pc: u16,
    /// Raw instruction word.
    pub word: u16,
}

impl Fault {
    /// Creates a fault record for the instruction fetched from `pc`.
    #[must_use]
    pub const fn new(code: FaultCode, pc: u16, word: u16) -> Self {
        Self { code, pc, word }
    }
}

#[cfg(test)]
mod tests {
    use super::{Fault, FaultClass, FaultCode};
    use rstest::rstest;

    #[rstest]
    #[case(FaultCode::UnusedOpcode, 0x01)]
    #[case(FaultCode::ReservedOpcode, 0x02)]
    #[case(FaultCode::UndefinedTrapVector, 0x03)]
    #[case(FaultCode::ConsoleRead, 0x04)]
    #[case(FaultCode::ConsoleWrite, 0x05)]
    #[case(FaultCode::ConsoleInterrupted, 0x06)]
    fn stable_code_values(#[case] code: FaultCode, #[case] value: u8) {
        assert_eq!(code.as_u8(), value);
    }

    #[test]
    fn only_interruption_is_not_latched() {
        assert!(FaultCode::ReservedOpcode.is_latching());
        assert!(FaultCode::UndefinedTrapVector.is_latching());
        assert!(FaultCode::ConsoleRead.is_latching());
        assert!(!FaultCode::ConsoleInterrupted.is_latching());
    }

    #[test]
    fn class_mapping_matches_fault_taxonomy() {
        assert_eq!(FaultCode::UnusedOpcode.class(), FaultClass::Decode);
        assert_eq!(FaultCode::UndefinedTrapVector.class(), FaultClass::Decode);
        assert_eq!(FaultCode::ConsoleWrite.class(), FaultClass::Console);
    }

    #[test]
    fn fault_display_names_instruction_and_address() {
        let fault = Fault::new(FaultCode::ReservedOpcode, 0x3001, 0xD000);
        assert_eq!(
            fault.to_string(),
            "reserved opcode (instruction 0xd000 at 0x3001)"
        );
    }
}
