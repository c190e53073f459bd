//! CLI entry point for the `lc3` emulator binary.

mod logging;
mod terminal;

use std::fs;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use lc3_core::{ByteOrder, CancelToken, LoadOptions, Machine, Origin, ProgramImage, RunStop};
#[cfg(test)]
use tempfile as _;
use tracing::info;

use crate::terminal::TerminalConsole;

/// Exit status reported when the user interrupts the program (128 + SIGINT).
const EXIT_INTERRUPTED: u8 = 130;

/// Runs an LC-3 program image on the terminal.
#[derive(Debug, Parser)]
#[command(name = "lc3", version, about)]
struct Args {
    /// Program image to execute.
    image: PathBuf,

    /// Byte order of the 16-bit words in the image.
    #[arg(long, value_enum, default_value_t = ImageByteOrder::Big)]
    byte_order: ImageByteOrder,

    /// Read the load address from the first word of the image (.obj layout).
    #[arg(long)]
    obj: bool,

    /// Load address for images without a header [default: 0x3000].
    #[arg(long, value_name = "ADDR", value_parser = parse_address, conflicts_with = "obj")]
    origin: Option<u16>,

    /// Stop with an error after this many instructions.
    #[arg(long, value_name = "COUNT")]
    max_steps: Option<u64>,

    /// Log more detail to stderr (-v info, -vv debug, -vvv per-instruction trace).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ImageByteOrder {
    Big,
    Little,
}

impl From<ImageByteOrder> for ByteOrder {
    fn from(order: ImageByteOrder) -> Self {
        match order {
            ImageByteOrder::Big => Self::Big,
            ImageByteOrder::Little => Self::Little,
        }
    }
}

impl Args {
    fn load_options(&self) -> LoadOptions {
        let origin = if self.obj {
            Origin::Header
        } else {
            self.origin.map_or_else(Origin::default, Origin::Fixed)
        };

        LoadOptions {
            byte_order: self.byte_order.into(),
            origin,
        }
    }
}

/// Parses a 16-bit address written as `0x3000`, `x3000` or decimal.
fn parse_address(text: &str) -> Result<u16, ParseIntError> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('x'))
        .or_else(|| text.strip_prefix('X'));

    match hex {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => text.parse(),
    }
}

fn load_program(args: &Args) -> Result<Machine> {
    let bytes = fs::read(&args.image)
        .with_context(|| format!("failed to read image {}", args.image.display()))?;
    let image = ProgramImage::from_bytes(&bytes, args.load_options())
        .with_context(|| format!("invalid image {}", args.image.display()))?;

    Machine::with_image(&image).context("failed to load image")
}

fn run(args: &Args) -> Result<ExitCode> {
    let mut machine = load_program(args)?;

    let cancel = CancelToken::new();
    let mut console =
        TerminalConsole::open(cancel.clone()).context("failed to set up the console")?;

    let result = match args.max_steps {
        Some(max_steps) => machine.run_for(&mut console, &cancel, max_steps),
        None => machine.run(&mut console, &cancel),
    };
    drop(console);

    let outcome = result.context("program stopped on a fault")?;
    match outcome.stop {
        RunStop::Halted => {
            info!(steps = outcome.steps, "program halted");
            Ok(ExitCode::SUCCESS)
        }
        RunStop::Cancelled => {
            info!(steps = outcome.steps, "interrupted");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        RunStop::StepLimit => bail!(
            "step limit reached after {} instructions (pc {:#06x})",
            outcome.steps,
            machine.registers.pc()
        ),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose, args.quiet);

    match run(&args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_address, Args, ImageByteOrder};
    use clap::Parser;
    use lc3_core::{ByteOrder, LoadOptions, Origin};

    #[test]
    fn defaults_match_conventional_images() {
        let args = Args::try_parse_from(["lc3", "hello.bin"]).expect("valid args");

        assert_eq!(args.byte_order, ImageByteOrder::Big);
        assert_eq!(args.load_options(), LoadOptions::default());
        assert_eq!(args.max_steps, None);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn obj_flag_reads_origin_from_header() {
        let args = Args::try_parse_from(["lc3", "--obj", "--byte-order", "little", "prog.obj"])
            .expect("valid args");

        assert_eq!(
            args.load_options(),
            LoadOptions {
                byte_order: ByteOrder::Little,
                origin: Origin::Header,
            }
        );
    }

    #[test]
    fn explicit_origin_is_used() {
        let args =
            Args::try_parse_from(["lc3", "--origin", "x4000", "prog.bin"]).expect("valid args");
        assert_eq!(args.load_options().origin, Origin::Fixed(0x4000));
    }

    #[test]
    fn origin_conflicts_with_obj() {
        assert!(Args::try_parse_from(["lc3", "--obj", "--origin", "0x4000", "p"]).is_err());
    }

    #[test]
    fn verbosity_is_counted() {
        let args = Args::try_parse_from(["lc3", "-vvv", "p"]).expect("valid args");
        assert_eq!(args.verbose, 3);
        assert!(Args::try_parse_from(["lc3", "-v", "-q", "p"]).is_err());
    }

    #[test]
    fn image_path_is_required() {
        assert!(Args::try_parse_from(["lc3"]).is_err());
    }

    #[test]
    fn addresses_parse_as_hex_or_decimal() {
        assert_eq!(parse_address("0x3000"), Ok(0x3000));
        assert_eq!(parse_address("0XFE00"), Ok(0xFE00));
        assert_eq!(parse_address("x4000"), Ok(0x4000));
        assert_eq!(parse_address("12288"), Ok(0x3000));
        assert!(parse_address("0x10000").is_err());
        assert!(parse_address("start").is_err());
    }
}
