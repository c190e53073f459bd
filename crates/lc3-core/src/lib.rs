//! Core emulator crate for the LC-3 16-bit instruction set.
//!
//! A [`Machine`] holds the register file, the 64 Ki-word memory and the run
//! state. [`Machine::step`] executes one fetch-decode-execute cycle and
//! [`Machine::run`] drives it until the program halts. Console I/O goes
//! through the [`Console`] trait so the core never touches the host terminal.

/// Bit-field extraction and sign extension.
pub mod bits;
pub use bits::{bit, field, sign_extend};

/// Memory model primitives and fixed address map.
pub mod memory;
pub use memory::{
    decode_device_register, wrap_address, DeviceRegister, Memory, MemorySizeError,
    ADDRESS_SPACE_WORDS, DDR, DEVICE_PAGE_START, DSR, KBDR, KBSR, MCR, PROGRAM_ORIGIN,
    STATUS_READY,
};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{ConditionCode, GeneralRegister, RegisterFile, RunState, GENERAL_REGISTER_COUNT};

/// Primary opcode classification table.
pub mod encoding;
pub use encoding::{Opcode, OPCODE_TABLE};

/// Instruction decoder producing closed instruction variants.
pub mod decoder;
pub use decoder::{ConditionMask, Decoder, Instruction, JumpTarget, Operand};

/// Fault taxonomy for decode and console failures.
pub mod fault;
pub use fault::{Fault, FaultClass, FaultCode};

/// Console adapter contract and in-memory implementation.
pub mod console;
pub use console::{BufferedConsole, CancelToken, Console, ConsoleError};

/// Program image decoding and load options.
pub mod image;
pub use image::{ByteOrder, LoadError, LoadOptions, Origin, ProgramImage};

/// Instruction execution pipeline and trap service routines.
pub mod execute;
pub use execute::{execute_instruction, step, StepOutcome, TrapVector, IN_PROMPT};

/// Machine aggregate and driver loop.
pub mod machine;
pub use machine::{Machine, RunOutcome, RunStop};

#[cfg(test)]
use proptest as _;
