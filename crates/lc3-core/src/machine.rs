//! Root machine aggregate and the driver loop.

use tracing::{debug, info};

use crate::console::{CancelToken, Console};
use crate::execute::{self, StepOutcome};
use crate::fault::{Fault, FaultCode};
use crate::image::{LoadError, ProgramImage};
use crate::memory::{Memory, MCR, PROGRAM_ORIGIN, STATUS_READY};
use crate::state::{RegisterFile, RunState};

/// Why a call to [`Machine::run`] or [`Machine::run_for`] returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStop {
    /// The machine halted.
    Halted,
    /// The host cancelled execution.
    Cancelled,
    /// The step budget was exhausted while the machine was still running.
    StepLimit,
}

/// Aggregated outcome of a driver loop call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Instructions executed during this call.
    pub steps: u64,
    /// Reason the loop stopped.
    pub stop: RunStop,
}

/// Complete architectural state of one LC-3.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Machine {
    /// `R0..R7`, `PC` and the condition code.
    pub registers: RegisterFile,
    /// 64 Ki-word address space.
    pub memory: Memory,
    /// Current execution state.
    pub run_state: RunState,
    latched_fault: Option<Fault>,
    /// Address of an `IN` trap whose prompt was written before its read was
    /// interrupted.
    interrupted_prompt: Option<u16>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// Creates a powered-on machine with zeroed memory and `PC = 0x3000`.
    #[must_use]
    pub fn new() -> Self {
        let mut registers = RegisterFile::default();
        registers.set_pc(PROGRAM_ORIGIN);

        let mut memory = Memory::new();
        memory.write(MCR, STATUS_READY);

        Self {
            registers,
            memory,
            run_state: RunState::Running,
            latched_fault: None,
            interrupted_prompt: None,
        }
    }

    /// Creates a machine with `image` loaded and `PC` at its origin.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::TooLarge`] when the image does not fit.
    pub fn with_image(image: &ProgramImage) -> Result<Self, LoadError> {
        let mut machine = Self::new();
        machine.load_image(image)?;
        Ok(machine)
    }

    /// Copies `image` into memory and points `PC` at its origin.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::TooLarge`] when the image does not fit.
    pub fn load_image(&mut self, image: &ProgramImage) -> Result<(), LoadError> {
        self.load_words(image.origin(), image.words())
    }

    /// Copies raw program words into memory and points `PC` at `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::TooLarge`] when the words do not fit above `origin`.
    pub fn load_words(&mut self, origin: u16, words: &[u16]) -> Result<(), LoadError> {
        self.memory.load(origin, words)?;
        self.registers.set_pc(origin);
        self.interrupted_prompt = None;
        info!(
            origin = format_args!("{origin:#06x}"),
            words = words.len(),
            "program loaded"
        );
        Ok(())
    }

    /// Returns `true` while instructions may still be executed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    /// Stops the machine. Idempotent.
    pub const fn halt(&mut self) {
        self.run_state = RunState::Halted;
    }

    /// The fault that halted the machine, if any.
    #[must_use]
    pub const fn latched_fault(&self) -> Option<Fault> {
        self.latched_fault
    }

    pub(crate) const fn latch_fault(&mut self, fault: Fault) {
        self.latched_fault = Some(fault);
        self.run_state = RunState::Halted;
    }

    pub(crate) const fn set_interrupted_prompt(&mut self, trap_pc: u16) {
        self.interrupted_prompt = Some(trap_pc);
    }

    pub(crate) const fn take_interrupted_prompt(&mut self) -> Option<u16> {
        self.interrupted_prompt.take()
    }

    /// Executes one instruction cycle.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] raised by the instruction, or the latched fault.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<StepOutcome, Fault> {
        execute::step(self, console)
    }

    /// Runs until the machine halts or `cancel` is triggered.
    ///
    /// # Errors
    ///
    /// Returns the first latching [`Fault`]; an interrupted console read is
    /// reported as [`RunStop::Cancelled`] instead.
    pub fn run(
        &mut self,
        console: &mut dyn Console,
        cancel: &CancelToken,
    ) -> Result<RunOutcome, Fault> {
        self.drive(console, cancel, None)
    }

    /// Like [`Machine::run`], but executes at most `max_steps` instructions.
    ///
    /// # Errors
    ///
    /// Same as [`Machine::run`].
    pub fn run_for(
        &mut self,
        console: &mut dyn Console,
        cancel: &CancelToken,
        max_steps: u64,
    ) -> Result<RunOutcome, Fault> {
        self.drive(console, cancel, Some(max_steps))
    }

    fn drive(
        &mut self,
        console: &mut dyn Console,
        cancel: &CancelToken,
        limit: Option<u64>,
    ) -> Result<RunOutcome, Fault> {
        let mut steps = 0_u64;
        let stop = loop {
            if let Some(fault) = self.latched_fault {
                return Err(fault);
            }
            if !self.is_running() {
                break RunStop::Halted;
            }
            if cancel.is_cancelled() {
                break RunStop::Cancelled;
            }
            if limit.is_some_and(|max| steps >= max) {
                break RunStop::StepLimit;
            }

            match self.step(console) {
                Ok(_) => steps += 1,
                Err(fault) if fault.code == FaultCode::ConsoleInterrupted => {
                    break RunStop::Cancelled;
                }
                Err(fault) => return Err(fault),
            }
        };

        debug!(steps, stop = ?stop, "driver loop stopped");
        Ok(RunOutcome { steps, stop })
    }
}

#[cfg(test)]
mod tests {
    use super::{Machine, RunStop};
    use crate::console::{BufferedConsole, CancelToken, InterruptingConsole};
    use crate::execute::IN_PROMPT;
    use crate::fault::FaultCode;
    use crate::image::{LoadError, ProgramImage};
    use crate::memory::{MCR, PROGRAM_ORIGIN, STATUS_READY};
    use crate::state::{ConditionCode, GeneralRegister, RunState};

    #[test]
    fn power_on_state() {
        let machine = Machine::new();
        assert_eq!(machine.registers.pc(), PROGRAM_ORIGIN);
        assert_eq!(machine.registers.cond(), ConditionCode::Zero);
        assert_eq!(machine.memory.read(MCR), STATUS_READY);
        assert_eq!(machine.run_state, RunState::Running);
        assert!(machine.latched_fault().is_none());
    }

    #[test]
    fn image_origin_becomes_pc() {
        let image = ProgramImage::new(0x4000, vec![0xF025]).expect("image");
        let machine = Machine::with_image(&image).expect("fits");

        assert_eq!(machine.registers.pc(), 0x4000);
        assert_eq!(machine.memory.read(0x4000), 0xF025);
    }

    #[test]
    fn oversized_words_leave_pc_alone() {
        let mut machine = Machine::new();
        let error = machine
            .load_words(0xFFFF, &[1, 2])
            .expect_err("does not fit");

        assert!(matches!(error, LoadError::TooLarge { .. }));
        assert_eq!(machine.registers.pc(), PROGRAM_ORIGIN);
    }

    #[test]
    fn run_counts_halt_as_a_step() {
        let mut machine = Machine::new();
        machine
            .load_words(PROGRAM_ORIGIN, &[0x5020, 0x1025, 0xF025])
            .expect("fits");
        let mut console = BufferedConsole::new();

        let outcome = machine
            .run(&mut console, &CancelToken::new())
            .expect("halts");

        assert_eq!(outcome.steps, 3);
        assert_eq!(outcome.stop, RunStop::Halted);
        assert_eq!(machine.registers.gpr(GeneralRegister::R0), 5);
    }

    #[test]
    fn cancelled_token_stops_before_fetch() {
        let mut machine = Machine::new();
        machine.load_words(PROGRAM_ORIGIN, &[0x0FFF]).expect("fits");
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = machine
            .run(&mut BufferedConsole::new(), &cancel)
            .expect("cancelled");

        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.stop, RunStop::Cancelled);
        assert_eq!(machine.registers.pc(), PROGRAM_ORIGIN);
    }

    #[test]
    fn step_limit_bounds_infinite_loop() {
        let mut machine = Machine::new();
        machine.load_words(PROGRAM_ORIGIN, &[0x0FFF]).expect("fits");

        let outcome = machine
            .run_for(&mut BufferedConsole::new(), &CancelToken::new(), 1_000)
            .expect("bounded");

        assert_eq!(outcome.steps, 1_000);
        assert_eq!(outcome.stop, RunStop::StepLimit);
        assert!(machine.is_running());
    }

    #[test]
    fn fault_is_returned_by_every_later_run() {
        let mut machine = Machine::new();
        machine.load_words(PROGRAM_ORIGIN, &[0x8000]).expect("fits");
        let mut console = BufferedConsole::new();
        let cancel = CancelToken::new();

        let fault = machine.run(&mut console, &cancel).expect_err("rti");
        assert_eq!(fault.code, FaultCode::UnusedOpcode);
        assert_eq!(machine.latched_fault(), Some(fault));
        assert_eq!(machine.run(&mut console, &cancel), Err(fault));
    }

    #[test]
    fn interrupted_read_cancels_run_and_resumes_without_reprompting() {
        let mut machine = Machine::new();
        // IN ; HALT
        machine
            .load_words(PROGRAM_ORIGIN, &[0xF023, 0xF025])
            .expect("fits");
        let mut console = InterruptingConsole::new(1, "q");
        let cancel = CancelToken::new();

        let first = machine.run(&mut console, &cancel).expect("cancelled");
        assert_eq!(first.steps, 0);
        assert_eq!(first.stop, RunStop::Cancelled);
        assert_eq!(machine.registers.pc(), PROGRAM_ORIGIN);
        assert!(machine.latched_fault().is_none());

        let second = machine.run(&mut console, &cancel).expect("halts");
        assert_eq!(second.steps, 2);
        assert_eq!(second.stop, RunStop::Halted);
        assert_eq!(console.inner.output_lossy(), format!("{IN_PROMPT}q"));
        assert_eq!(machine.registers.gpr(GeneralRegister::R0), u16::from(b'q'));
    }

    #[test]
    fn reloading_forgets_an_interrupted_prompt() {
        let mut machine = Machine::new();
        machine.load_words(PROGRAM_ORIGIN, &[0xF023]).expect("fits");
        let mut console = InterruptingConsole::new(1, "q");

        machine
            .step(&mut console)
            .expect_err("read interrupted");
        machine.load_words(PROGRAM_ORIGIN, &[0xF023]).expect("fits");
        machine.step(&mut console).expect("read completes");

        let prompt_twice = format!("{IN_PROMPT}{IN_PROMPT}q");
        assert_eq!(console.inner.output_lossy(), prompt_twice);
    }

    #[test]
    fn halted_machine_runs_zero_steps() {
        let mut machine = Machine::new();
        machine.halt();

        let outcome = machine
            .run(&mut BufferedConsole::new(), &CancelToken::new())
            .expect("already halted");

        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.stop, RunStop::Halted);
    }
}
