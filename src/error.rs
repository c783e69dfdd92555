//! Error types for cartridge loading, mapper contract violations, and frame execution.

use thiserror::Error;

/// Failures while loading an iNES image. Loading fails fast; nothing is partially inserted.
#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("image is {0} bytes, shorter than the 16-byte iNES header")]
    TooShort(usize),

    #[error("missing iNES magic (expected 4E 45 53 1A)")]
    BadMagic,

    #[error("truncated {section}: expected {expected} bytes, found {actual}")]
    Truncated {
        section: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),

    #[error("failed to read ROM file: {0}")]
    Io(#[from] std::io::Error),
}

/// An access the cartridge board cannot physically perform. Always a defect in the
/// running program or the emulator, never a transient condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapperError {
    #[error("{mapper}: CPU write ${value:02X} to ${addr:04X} is not supported")]
    UnsupportedCpuWrite {
        mapper: &'static str,
        addr: u16,
        value: u8,
    },

    #[error("{mapper}: PPU write ${value:02X} to ${addr:04X} is not supported")]
    UnsupportedPpuWrite {
        mapper: &'static str,
        addr: u16,
        value: u8,
    },
}

/// Errors surfaced by [`crate::system::System`].
#[derive(Error, Debug)]
pub enum EmuError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),

    #[error("mapper contract violation: {0}")]
    Mapper(#[from] MapperError),

    #[error("no cartridge inserted")]
    NoCartridge,
}
