//! Address arithmetic and device-aware data access for instruction execution.

use tracing::debug;

use crate::console::Console;
use crate::decoder::Operand;
use crate::fault::FaultCode;
use crate::machine::Machine;
use crate::memory::{decode_device_register, DeviceRegister, KBDR, KBSR, STATUS_READY};
use crate::state::GeneralRegister;

/// Effective address `PC + offset` using the already-incremented PC.
#[must_use]
pub const fn pc_relative(machine: &Machine, offset: u16) -> u16 {
    machine.registers.pc().wrapping_add(offset)
}

/// Effective address `base + offset`.
#[must_use]
pub const fn base_offset(machine: &Machine, base: GeneralRegister, offset: u16) -> u16 {
    machine.registers.gpr(base).wrapping_add(offset)
}

/// Resolves the second ALU operand to a value.
#[must_use]
pub const fn operand_value(machine: &Machine, operand: Operand) -> u16 {
    match operand {
        Operand::Register(reg) => machine.registers.gpr(reg),
        Operand::Immediate(value) => value,
    }
}

/// Reads a data word, servicing the keyboard and display registers.
///
/// # Errors
///
/// Returns a console fault when polling or reading the keyboard fails.
pub fn load_data(
    machine: &mut Machine,
    console: &mut dyn Console,
    addr: u16,
) -> Result<u16, FaultCode> {
    let Some(register) = decode_device_register(addr) else {
        return Ok(machine.memory.read(addr));
    };

    let value = match register {
        DeviceRegister::Kbsr => poll_keyboard(machine, console)?,
        DeviceRegister::Kbdr => {
            let status = machine.memory.read(KBSR);
            machine.memory.write(KBSR, status & !STATUS_READY);
            machine.memory.read(KBDR)
        }
        DeviceRegister::Dsr => STATUS_READY,
        DeviceRegister::Ddr | DeviceRegister::Mcr => machine.memory.read(addr),
    };

    debug!(register = ?register, value, "device register read");
    Ok(value)
}

/// Writes a data word, servicing the display and machine control registers.
///
/// # Errors
///
/// Returns [`FaultCode::ConsoleWrite`] when display output fails.
pub fn store_data(
    machine: &mut Machine,
    console: &mut dyn Console,
    addr: u16,
    value: u16,
) -> Result<(), FaultCode> {
    let Some(register) = decode_device_register(addr) else {
        machine.memory.write(addr, value);
        return Ok(());
    };

    debug!(register = ?register, value, "device register write");
    match register {
        DeviceRegister::Dsr => {}
        DeviceRegister::Ddr => {
            machine.memory.write(addr, value);
            let [_, low] = value.to_be_bytes();
            console
                .write_char(low)
                .and_then(|()| console.flush())
                .map_err(|error| error.write_fault())?;
        }
        DeviceRegister::Mcr => {
            machine.memory.write(addr, value);
            if value & STATUS_READY == 0 {
                machine.halt();
            }
        }
        DeviceRegister::Kbsr | DeviceRegister::Kbdr => machine.memory.write(addr, value),
    }

    Ok(())
}

fn poll_keyboard(machine: &mut Machine, console: &mut dyn Console) -> Result<u16, FaultCode> {
    let status = machine.memory.read(KBSR);
    if status & STATUS_READY != 0 {
        return Ok(status);
    }

    if !console
        .char_available()
        .map_err(|error| error.read_fault())?
    {
        return Ok(status);
    }

    let key = console.read_char().map_err(|error| error.read_fault())?;
    machine.memory.write(KBDR, u16::from(key));
    let status = status | STATUS_READY;
    machine.memory.write(KBSR, status);
    Ok(status)
}
