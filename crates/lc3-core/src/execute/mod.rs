//! Instruction execution pipeline for the LC-3 ISA.
//!
//! One call to [`step`] is one instruction cycle:
//! 1. Fetch the word at `PC`
//! 2. Increment `PC`
//! 3. Decode
//! 4. Apply the instruction's effects (registers, memory, condition code, traps)
//!
//! Effects applied before a fault are not rolled back.

mod helpers;
pub mod trap;

pub use helpers::{base_offset, load_data, operand_value, pc_relative, store_data};
pub use trap::{dispatch, TrapVector, IN_PROMPT};

use tracing::{trace, warn};

use crate::console::Console;
use crate::decoder::{Decoder, Instruction, JumpTarget};
use crate::encoding::Opcode;
use crate::fault::{Fault, FaultCode};
use crate::machine::Machine;
use crate::state::GeneralRegister;

/// Result of one successful [`step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An instruction retired and the machine is still running.
    Retired,
    /// The machine is halted, either by this instruction or earlier.
    Halted,
}

#[derive(Debug, Clone, Copy)]
enum AluOp {
    Add,
    And,
}

/// Executes one instruction cycle.
///
/// Stepping a halted machine executes nothing. Stepping a machine with a
/// latched fault returns that fault again.
///
/// # Errors
///
/// Returns the [`Fault`] raised by decode, trap dispatch or console access.
pub fn step(machine: &mut Machine, console: &mut dyn Console) -> Result<StepOutcome, Fault> {
    if let Some(fault) = machine.latched_fault() {
        return Err(fault);
    }
    if !machine.is_running() {
        return Ok(StepOutcome::Halted);
    }

    let pc = machine.registers.pc();
    let word = machine.memory.read(pc);
    machine.registers.set_pc(pc.wrapping_add(1));
    trace!(
        pc = format_args!("{pc:#06x}"),
        word = format_args!("{word:#06x}"),
        op = Opcode::from_word(word).mnemonic(),
        "fetch"
    );

    let result = Decoder::decode(word)
        .and_then(|instruction| execute_instruction(machine, console, instruction));

    match result {
        Ok(()) if machine.is_running() => Ok(StepOutcome::Retired),
        Ok(()) => Ok(StepOutcome::Halted),
        Err(code) => Err(raise(machine, Fault::new(code, pc, word))),
    }
}

fn raise(machine: &mut Machine, fault: Fault) -> Fault {
    if fault.code.is_latching() {
        warn!(%fault, code = fault.code.as_u8(), "machine fault");
        machine.latch_fault(fault);
    } else {
        machine.registers.set_pc(fault.pc);
    }
    fault
}

/// Applies the effects of one decoded instruction.
///
/// `PC` must already point past the instruction.
///
/// # Errors
///
/// Returns the fault code raised by a trap or a device register access.
pub fn execute_instruction(
    machine: &mut Machine,
    console: &mut dyn Console,
    instruction: Instruction,
) -> Result<(), FaultCode> {
    match instruction {
        Instruction::Add { dr, sr1, operand } => {
            let rhs = operand_value(machine, operand);
            execute_alu(machine, dr, sr1, rhs, AluOp::Add);
        }
        Instruction::And { dr, sr1, operand } => {
            let rhs = operand_value(machine, operand);
            execute_alu(machine, dr, sr1, rhs, AluOp::And);
        }
        Instruction::Not { dr, sr } => {
            let value = !machine.registers.gpr(sr);
            machine.registers.write_result(dr, value);
        }
        Instruction::Br { mask, offset } => {
            if mask.tests(machine.registers.cond()) {
                let target = pc_relative(machine, offset);
                machine.registers.set_pc(target);
            }
        }
        Instruction::Jmp { base } => {
            let target = machine.registers.gpr(base);
            machine.registers.set_pc(target);
        }
        Instruction::Jsr { target } => {
            let destination = match target {
                JumpTarget::PcRelative(offset) => pc_relative(machine, offset),
                JumpTarget::Register(base) => machine.registers.gpr(base),
            };
            let link = machine.registers.pc();
            machine.registers.set_gpr(GeneralRegister::LINK, link);
            machine.registers.set_pc(destination);
        }
        Instruction::Ld { dr, offset } => {
            let address = pc_relative(machine, offset);
            let value = load_data(machine, console, address)?;
            machine.registers.write_result(dr, value);
        }
        Instruction::Ldi { dr, offset } => {
            let address = pc_relative(machine, offset);
            let pointer = load_data(machine, console, address)?;
            let value = load_data(machine, console, pointer)?;
            machine.registers.write_result(dr, value);
        }
        Instruction::Ldr { dr, base, offset } => {
            let address = base_offset(machine, base, offset);
            let value = load_data(machine, console, address)?;
            machine.registers.write_result(dr, value);
        }
        Instruction::Lea { dr, offset } => {
            let address = pc_relative(machine, offset);
            machine.registers.write_result(dr, address);
        }
        Instruction::St { sr, offset } => {
            let value = machine.registers.gpr(sr);
            let address = pc_relative(machine, offset);
            store_data(machine, console, address, value)?;
        }
        Instruction::Sti { sr, offset } => {
            let address = pc_relative(machine, offset);
            let pointer = load_data(machine, console, address)?;
            let value = machine.registers.gpr(sr);
            store_data(machine, console, pointer, value)?;
        }
        Instruction::Str { sr, base, offset } => {
            let value = machine.registers.gpr(sr);
            let address = base_offset(machine, base, offset);
            store_data(machine, console, address, value)?;
        }
        Instruction::Trap { vector } => {
            let link = machine.registers.pc();
            machine.registers.set_gpr(GeneralRegister::LINK, link);
            dispatch(machine, console, vector)?;
        }
    }

    Ok(())
}

fn execute_alu(
    machine: &mut Machine,
    dr: GeneralRegister,
    sr1: GeneralRegister,
    rhs: u16,
    op: AluOp,
) {
    let lhs = machine.registers.gpr(sr1);
    let result = match op {
        AluOp::Add => lhs.wrapping_add(rhs),
        AluOp::And => lhs & rhs,
    };
    machine.registers.write_result(dr, result);
}
