//! Host console adapter: stdin/stdout with raw-mode keyboard input.
//!
//! Input is read on a background thread and forwarded over a channel so a
//! blocking guest read can still observe Ctrl-C through the shared
//! [`CancelToken`].

use std::collections::VecDeque;
use std::io::{self, IsTerminal, Read, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use lc3_core::{CancelToken, Console, ConsoleError};
use tracing::{debug, warn};

/// How long a blocked read waits before re-checking for cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

const BACKSPACE: u8 = 0x7F;
const ESCAPE: u8 = 0x1B;

static RAW_MODE: AtomicBool = AtomicBool::new(false);

/// Returns `true` while a [`TerminalConsole`] holds the terminal in raw mode.
pub fn raw_mode_active() -> bool {
    RAW_MODE.load(Ordering::Acquire)
}

/// Puts the terminal in raw mode and restores it when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        RAW_MODE.store(true, Ordering::Release);
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        RAW_MODE.store(false, Ordering::Release);
        if let Err(error) = terminal::disable_raw_mode() {
            warn!(%error, "failed to restore terminal mode");
        }
    }
}

/// [`Console`] backed by the process's stdin and stdout.
pub struct TerminalConsole {
    input: Receiver<u8>,
    pending: VecDeque<u8>,
    cancel: CancelToken,
    out: Stdout,
    raw: Option<RawModeGuard>,
}

impl TerminalConsole {
    /// Starts the input thread, entering raw mode when stdin is a terminal.
    ///
    /// Ctrl-C pressed in raw mode triggers `cancel`.
    pub fn open(cancel: CancelToken) -> io::Result<Self> {
        let (sender, input) = mpsc::channel();

        let raw = if io::stdin().is_terminal() {
            let guard = RawModeGuard::enable()?;
            let keys_cancel = cancel.clone();
            thread::Builder::new()
                .name("lc3-keyboard".into())
                .spawn(move || forward_keys(&sender, &keys_cancel))?;
            Some(guard)
        } else {
            thread::Builder::new()
                .name("lc3-stdin".into())
                .spawn(move || forward_stdin(&sender))?;
            None
        };

        debug!(raw = raw.is_some(), "console opened");
        Ok(Self {
            input,
            pending: VecDeque::new(),
            cancel,
            out: io::stdout(),
            raw,
        })
    }
}

impl Console for TerminalConsole {
    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        if let Some(byte) = self.pending.pop_front() {
            return Ok(byte);
        }

        loop {
            if self.cancel.is_cancelled() {
                return Err(ConsoleError::Interrupted);
            }
            match self.input.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(byte) => return Ok(byte),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(ConsoleError::EndOfInput),
            }
        }
    }

    fn char_available(&mut self) -> Result<bool, ConsoleError> {
        if !self.pending.is_empty() {
            return Ok(true);
        }

        match self.input.try_recv() {
            Ok(byte) => {
                self.pending.push_back(byte);
                Ok(true)
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(false),
        }
    }

    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError> {
        if self.raw.is_some() && byte == b'\n' {
            self.out.write_all(b"\r\n")?;
        } else {
            self.out.write_all(&[byte])?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for TerminalConsole {
    fn drop(&mut self) {
        if let Err(error) = self.out.flush() {
            warn!(%error, "failed to flush console output");
        }
    }
}

fn forward_stdin(sender: &Sender<u8>) {
    let mut stdin = io::stdin().lock();
    let mut buffer = [0_u8; 256];

    loop {
        let count = match stdin.read(&mut buffer) {
            Ok(0) => return,
            Ok(count) => count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                warn!(%error, "stdin read failed");
                return;
            }
        };

        for byte in &buffer[..count] {
            if sender.send(*byte).is_err() {
                return;
            }
        }
    }
}

fn forward_keys(sender: &Sender<u8>, cancel: &CancelToken) {
    loop {
        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(error) => {
                warn!(%error, "keyboard read failed");
                return;
            }
        };

        if is_interrupt(&key) {
            debug!("ctrl-c pressed");
            cancel.cancel();
            continue;
        }

        if let Some(byte) = key_to_byte(&key) {
            if sender.send(byte).is_err() {
                return;
            }
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
        && key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c' | 'C'))
}

/// Translates a key press into the byte a serial terminal would send.
fn key_to_byte(key: &KeyEvent) -> Option<u8> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let byte = match key.code {
        KeyCode::Enter => b'\n',
        KeyCode::Backspace => BACKSPACE,
        KeyCode::Tab => b'\t',
        KeyCode::Esc => ESCAPE,
        KeyCode::Char(ch) => {
            let byte = u8::try_from(ch).ok().filter(u8::is_ascii)?;
            if key.modifiers.contains(KeyModifiers::CONTROL) && byte.is_ascii_alphabetic() {
                byte.to_ascii_uppercase() - b'@'
            } else {
                byte
            }
        }
        _ => return None,
    };

    Some(byte)
}
