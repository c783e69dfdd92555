//! Cartridge mappers for PRG/CHR address translation.
//!
//! Only NROM (mapper 0) is wired up; [`create`] is the single place that knows the variant set,
//! so the bus and PPU only ever see `dyn Mapper`.

use tracing::error;

use crate::{cartridge::cartridge::RomImage, error::CartridgeError};

pub mod mapper;
pub mod mapper0;

use self::{mapper::Mapper, mapper0::Mapper0};

/// Nametable mirroring mode for the PPU. Fixed by the board for NROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    /// Tables 0/1 share a bank, 2/3 share the other (vertical scrolling games).
    Horizontal,
    /// Tables 0/2 share a bank, 1/3 share the other (horizontal scrolling games).
    Vertical,
}

/// Select the mapper implementation for a parsed image.
pub fn create(rom: RomImage) -> Result<Box<dyn Mapper>, CartridgeError> {
    match rom.mapper_id {
        0 => Ok(Box::new(Mapper0::new(rom))),
        id => {
            error!("unsupported mapper {}", id);
            Err(CartridgeError::UnsupportedMapper(id))
        }
    }
}
