//! Fixed LC-3 address map and memory-mapped device registers.

/// Conventional load address and entry point of user programs.
pub const PROGRAM_ORIGIN: u16 = 0x3000;
/// First address of the device register page.
pub const DEVICE_PAGE_START: u16 = 0xFE00;

/// Keyboard status register; bit 15 set when a key is ready.
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register; holds the last key read.
pub const KBDR: u16 = 0xFE02;
/// Display status register; bit 15 set when the display is ready.
pub const DSR: u16 = 0xFE04;
/// Display data register; writing outputs the low byte.
pub const DDR: u16 = 0xFE06;
/// Machine control register; clearing bit 15 stops the clock.
pub const MCR: u16 = 0xFFFE;

/// Ready/run bit shared by the status and control registers.
pub const STATUS_READY: u16 = 0x8000;

/// Memory-mapped device register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRegister {
    /// Keyboard status (`0xFE00`).
    Kbsr,
    /// Keyboard data (`0xFE02`).
    Kbdr,
    /// Display status (`0xFE04`).
    Dsr,
    /// Display data (`0xFE06`).
    Ddr,
    /// Machine control (`0xFFFE`).
    Mcr,
}

const _: () = assert!(DEVICE_PAGE_START > PROGRAM_ORIGIN);
const _: () = assert!(KBSR >= DEVICE_PAGE_START && MCR >= DEVICE_PAGE_START);

/// Decodes an address into the device register it names, if any.
#[must_use]
pub const fn decode_device_register(addr: u16) -> Option<DeviceRegister> {
    match addr {
        KBSR => Some(DeviceRegister::Kbsr),
        KBDR => Some(DeviceRegister::Kbdr),
        DSR => Some(DeviceRegister::Dsr),
        DDR => Some(DeviceRegister::Ddr),
        MCR => Some(DeviceRegister::Mcr),
        _ => None,
    }
}
