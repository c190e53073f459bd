//! Trap service routines for the console and `HALT`.
//!
//! The routines are implemented natively instead of jumping through the trap
//! vector table in low memory. `TRAP` has already saved the return address in
//! `R7` when [`dispatch`] runs.

use tracing::{debug, info};

use crate::console::Console;
use crate::fault::FaultCode;
use crate::machine::Machine;
use crate::memory::ADDRESS_SPACE_WORDS;
use crate::state::GeneralRegister;

/// Prompt written by the `IN` service routine.
pub const IN_PROMPT: &str = "Enter a character: ";

/// Trap vectors with a service routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TrapVector {
    /// Read one character into `R0` without echo.
    Getc = 0x20,
    /// Write the low byte of `R0`.
    Out = 0x21,
    /// Write a zero-terminated string of one character per word.
    Puts = 0x22,
    /// Prompt, read and echo one character into `R0`.
    In = 0x23,
    /// Write a zero-terminated string of two characters per word.
    Putsp = 0x24,
    /// Stop the machine.
    Halt = 0x25,
}

impl TrapVector {
    /// Looks up the service routine for an 8-bit trap vector.
    #[must_use]
    pub const fn from_u8(vector: u8) -> Option<Self> {
        match vector {
            0x20 => Some(Self::Getc),
            0x21 => Some(Self::Out),
            0x22 => Some(Self::Puts),
            0x23 => Some(Self::In),
            0x24 => Some(Self::Putsp),
            0x25 => Some(Self::Halt),
            _ => None,
        }
    }

    /// Conventional routine name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Getc => "GETC",
            Self::Out => "OUT",
            Self::Puts => "PUTS",
            Self::In => "IN",
            Self::Putsp => "PUTSP",
            Self::Halt => "HALT",
        }
    }
}

/// Runs the service routine for `vector` and flushes console output.
///
/// # Errors
///
/// Returns [`FaultCode::UndefinedTrapVector`] for vectors without a routine,
/// or the console fault raised by the routine.
pub fn dispatch(
    machine: &mut Machine,
    console: &mut dyn Console,
    vector: u8,
) -> Result<(), FaultCode> {
    let trap = TrapVector::from_u8(vector).ok_or(FaultCode::UndefinedTrapVector)?;
    let r0 = machine.registers.gpr(GeneralRegister::R0);
    debug!(trap = trap.name(), r0, "trap");

    match trap {
        TrapVector::Getc => {
            let key = read(console)?;
            machine.registers.write_result(GeneralRegister::R0, u16::from(key));
        }
        TrapVector::Out => write(console, low_byte(r0))?,
        TrapVector::Puts => {
            for word in string_words(machine) {
                write(console, low_byte(word))?;
            }
        }
        TrapVector::In => {
            // A retry after an interrupted read resumes at the read.
            let trap_pc = machine.registers.pc().wrapping_sub(1);
            if machine.take_interrupted_prompt() != Some(trap_pc) {
                for byte in IN_PROMPT.bytes() {
                    write(console, byte)?;
                }
                console.flush().map_err(|error| error.write_fault())?;
            }

            let key = match read(console) {
                Err(FaultCode::ConsoleInterrupted) => {
                    machine.set_interrupted_prompt(trap_pc);
                    return Err(FaultCode::ConsoleInterrupted);
                }
                result => result?,
            };
            write(console, key)?;
            machine.registers.write_result(GeneralRegister::R0, u16::from(key));
        }
        TrapVector::Putsp => {
            for word in string_words(machine) {
                let [high, low] = word.to_be_bytes();
                write(console, low)?;
                if high != 0 {
                    write(console, high)?;
                }
            }
        }
        TrapVector::Halt => {
            info!(pc = machine.registers.pc(), "halt");
            machine.halt();
        }
    }

    console.flush().map_err(|error| error.write_fault())
}

/// Words of the zero-terminated string starting at `R0`.
///
/// The scan wraps at the top of memory and stops after one full pass.
fn string_words(machine: &Machine) -> Vec<u16> {
    let start = usize::from(machine.registers.gpr(GeneralRegister::R0));
    (start..start + ADDRESS_SPACE_WORDS)
        .map(|addr| machine.memory.read_at(addr))
        .take_while(|word| *word != 0)
        .collect()
}

const fn low_byte(word: u16) -> u8 {
    word.to_le_bytes()[0]
}

fn read(console: &mut dyn Console) -> Result<u8, FaultCode> {
    console.read_char().map_err(|error| error.read_fault())
}

fn write(console: &mut dyn Console, byte: u8) -> Result<(), FaultCode> {
    console.write_char(byte).map_err(|error| error.write_fault())
}

#[cfg(test)]
mod tests {
    use super::{dispatch, TrapVector, IN_PROMPT};
    use crate::console::{BufferedConsole, InterruptingConsole};
    use crate::fault::FaultCode;
    use crate::machine::Machine;
    use crate::state::{ConditionCode, GeneralRegister, RunState};
    use rstest::rstest;

    fn machine_with_string(addr: u16, words: &[u16]) -> Machine {
        let mut machine = Machine::new();
        machine.memory.load(addr, words).expect("string fits");
        machine.registers.set_gpr(GeneralRegister::R0, addr);
        machine
    }

    #[rstest]
    #[case(0x20, Some(TrapVector::Getc))]
    #[case(0x25, Some(TrapVector::Halt))]
    #[case(0x1F, None)]
    #[case(0x26, None)]
    #[case(0x00, None)]
    fn vector_lookup(#[case] vector: u8, #[case] expected: Option<TrapVector>) {
        assert_eq!(TrapVector::from_u8(vector), expected);
        if let Some(trap) = expected {
            assert_eq!(trap as u8, vector);
        }
    }

    #[test]
    fn getc_reads_without_echo_and_sets_flags() {
        let mut machine = Machine::new();
        let mut console = BufferedConsole::with_input("x");

        dispatch(&mut machine, &mut console, 0x20).expect("getc");

        assert_eq!(machine.registers.gpr(GeneralRegister::R0), u16::from(b'x'));
        assert_eq!(machine.registers.cond(), ConditionCode::Positive);
        assert!(console.output().is_empty());
    }

    #[test]
    fn getc_on_closed_input_is_a_read_fault() {
        let mut machine = Machine::new();
        let mut console = BufferedConsole::new();
        assert_eq!(
            dispatch(&mut machine, &mut console, 0x20),
            Err(FaultCode::ConsoleRead)
        );
    }

    #[test]
    fn out_writes_low_byte_and_flushes() {
        let mut machine = Machine::new();
        machine.registers.set_gpr(GeneralRegister::R0, 0x7F41);
        let mut console = BufferedConsole::new();

        dispatch(&mut machine, &mut console, 0x21).expect("out");

        assert_eq!(console.output(), b"A");
        assert_eq!(console.flush_count(), 1);
    }

    #[test]
    fn puts_stops_at_zero_word() {
        let mut machine = machine_with_string(0x4000, &[0x48, 0x49, 0, 0x50]);
        let mut console = BufferedConsole::new();

        dispatch(&mut machine, &mut console, 0x22).expect("puts");

        assert_eq!(console.output_lossy(), "HI");
    }

    #[test]
    fn puts_wraps_past_top_of_memory() {
        let mut machine = machine_with_string(0xFFFF, &[0x41]);
        machine.memory.write(0x0000, 0x42);
        let mut console = BufferedConsole::new();

        dispatch(&mut machine, &mut console, 0x22).expect("puts");

        assert_eq!(console.output_lossy(), "AB");
    }

    #[test]
    fn unterminated_string_is_bounded_by_one_pass() {
        let mut machine = Machine::new();
        for addr in 0..=u16::MAX {
            machine.memory.write(addr, 0x2E);
        }
        let mut console = BufferedConsole::new();

        dispatch(&mut machine, &mut console, 0x22).expect("puts");

        assert_eq!(console.output().len(), 0x1_0000);
    }

    #[test]
    fn in_prompts_and_echoes() {
        let mut machine = Machine::new();
        let mut console = BufferedConsole::with_input("q");

        dispatch(&mut machine, &mut console, 0x23).expect("in");

        assert_eq!(console.output_lossy(), format!("{IN_PROMPT}q"));
        assert_eq!(machine.registers.gpr(GeneralRegister::R0), u16::from(b'q'));
    }

    #[test]
    fn in_retried_after_interruption_prompts_once() {
        let mut machine = Machine::new();
        machine.registers.set_pc(0x3001);
        let mut console = InterruptingConsole::new(2, "q");

        for _ in 0..2 {
            assert_eq!(
                dispatch(&mut machine, &mut console, 0x23),
                Err(FaultCode::ConsoleInterrupted)
            );
        }
        assert_eq!(console.inner.output_lossy(), IN_PROMPT);

        dispatch(&mut machine, &mut console, 0x23).expect("in");

        assert_eq!(console.inner.output_lossy(), format!("{IN_PROMPT}q"));
        assert_eq!(machine.registers.gpr(GeneralRegister::R0), u16::from(b'q'));
    }

    #[test]
    fn interrupted_prompt_is_not_carried_to_another_in() {
        let mut machine = Machine::new();
        machine.registers.set_pc(0x3001);
        let mut console = InterruptingConsole::new(1, "q");

        dispatch(&mut machine, &mut console, 0x23).expect_err("interrupted");
        machine.registers.set_pc(0x4001);
        dispatch(&mut machine, &mut console, 0x23).expect("in");

        assert_eq!(
            console.inner.output_lossy(),
            format!("{IN_PROMPT}{IN_PROMPT}q")
        );
    }

    #[test]
    fn putsp_unpacks_low_byte_first() {
        let mut machine = machine_with_string(0x4000, &[0x6548, 0x006C, 0]);
        let mut console = BufferedConsole::new();

        dispatch(&mut machine, &mut console, 0x24).expect("putsp");

        assert_eq!(console.output_lossy(), "Hel");
    }

    #[test]
    fn halt_stops_machine_silently() {
        let mut machine = Machine::new();
        let mut console = BufferedConsole::new();

        dispatch(&mut machine, &mut console, 0x25).expect("halt");

        assert_eq!(machine.run_state, RunState::Halted);
        assert!(console.output().is_empty());
    }

    #[test]
    fn undefined_vector_faults() {
        let mut machine = Machine::new();
        let mut console = BufferedConsole::new();
        assert_eq!(
            dispatch(&mut machine, &mut console, 0x30),
            Err(FaultCode::UndefinedTrapVector)
        );
        assert!(machine.is_running());
    }
}
