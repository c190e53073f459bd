/// Execution state of a machine as seen by the driver loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// Stopped by `HALT`, the machine control register or a fatal fault.
    Halted,
}

impl RunState {
    /// Returns `true` while instructions may still be executed.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}
