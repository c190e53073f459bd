//! Architectural CPU state model primitives.

/// Register file types and condition-code model.
pub mod registers;
/// Machine run-state model.
pub mod run_state;

pub use registers::{ConditionCode, GeneralRegister, RegisterFile, GENERAL_REGISTER_COUNT};
pub use run_state::RunState;
