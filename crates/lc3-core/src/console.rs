//! Console adapter contract consumed by the trap dispatcher and device registers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::FaultCode;

/// Failure reported by a console adapter.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Underlying host stream failed.
    #[error("console i/o failed")]
    Io(#[from] std::io::Error),
    /// No more input will ever arrive.
    #[error("console input is exhausted")]
    EndOfInput,
    /// A blocking read was cancelled by the host.
    #[error("console input was interrupted")]
    Interrupted,
}

impl ConsoleError {
    /// Fault code raised when this error occurs while reading.
    #[must_use]
    pub const fn read_fault(&self) -> FaultCode {
        match self {
            Self::Interrupted => FaultCode::ConsoleInterrupted,
            Self::Io(_) | Self::EndOfInput => FaultCode::ConsoleRead,
        }
    }

    /// Fault code raised when this error occurs while writing or flushing.
    #[must_use]
    pub const fn write_fault(&self) -> FaultCode {
        match self {
            Self::Interrupted => FaultCode::ConsoleInterrupted,
            Self::Io(_) | Self::EndOfInput => FaultCode::ConsoleWrite,
        }
    }
}

/// Raw, unbuffered character console owned by the host environment.
///
/// The core never configures the terminal; implementations are expected to
/// deliver unechoed keystrokes and to restore the terminal themselves.
pub trait Console {
    /// Blocks until one input byte is available and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Interrupted`] when the host cancels the read,
    /// [`ConsoleError::EndOfInput`] when input is closed, or
    /// [`ConsoleError::Io`] on transport failure.
    fn read_char(&mut self) -> Result<u8, ConsoleError>;

    /// Reports whether [`Console::read_char`] would return without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Io`] when the input source cannot be polled.
    fn char_available(&mut self) -> Result<bool, ConsoleError>;

    /// Writes one output byte.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Io`] when the output stream fails.
    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError>;

    /// Pushes buffered output to the observer.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Io`] when the output stream fails.
    fn flush(&mut self) -> Result<(), ConsoleError>;
}

/// In-memory console with scripted input and captured output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
    flushes: usize,
}

impl BufferedConsole {
    /// Creates a console with no pending input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console whose reads return `input` in order.
    #[must_use]
    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Number of input bytes not yet consumed.
    #[must_use]
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Bytes written so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Number of times [`Console::flush`] was called.
    #[must_use]
    pub const fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl Console for BufferedConsole {
    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        self.input.pop_front().ok_or(ConsoleError::EndOfInput)
    }

    fn char_available(&mut self) -> Result<bool, ConsoleError> {
        Ok(!self.input.is_empty())
    }

    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError> {
        self.output.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.flushes += 1;
        Ok(())
    }
}

/// Host cancellation request shared between the input adapter and driver loop.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`CancelToken::cancel`] has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Console whose first reads are cancelled before scripted input is served.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct InterruptingConsole {
    interrupts: usize,
    pub(crate) inner: BufferedConsole,
}

#[cfg(test)]
impl InterruptingConsole {
    pub(crate) fn new(interrupts: usize, input: impl AsRef<[u8]>) -> Self {
        Self {
            interrupts,
            inner: BufferedConsole::with_input(input),
        }
    }
}

#[cfg(test)]
impl Console for InterruptingConsole {
    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        if self.interrupts > 0 {
            self.interrupts -= 1;
            return Err(ConsoleError::Interrupted);
        }
        self.inner.read_char()
    }

    fn char_available(&mut self) -> Result<bool, ConsoleError> {
        self.inner.char_available()
    }

    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError> {
        self.inner.write_char(byte)
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.inner.flush()
    }
}
