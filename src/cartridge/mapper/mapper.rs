//! Mapper trait: CPU/PPU cartridge access and mirroring.

use crate::{cartridge::mapper::Mirroring, error::MapperError};

/// The four-operation contract every cartridge board implements. The bus routes all
/// cartridge-space CPU accesses and the PPU routes all pattern-table accesses through it.
pub trait Mapper {
    /// CPU read in $4020–$FFFF. `None` when the board does not drive the data bus.
    fn cpu_read(&self, addr: u16) -> Option<u8>;
    /// CPU write in $4020–$FFFF. Boards without registers or RAM there reject it.
    fn cpu_write(&mut self, addr: u16, data: u8) -> Result<(), MapperError>;
    /// PPU read in $0000–$1FFF (pattern tables). Unmapped reads return 0.
    fn ppu_read(&self, addr: u16) -> u8;
    /// PPU write in $0000–$1FFF; only CHR RAM boards accept it.
    fn ppu_write(&mut self, addr: u16, data: u8) -> Result<(), MapperError>;
    /// Nametable mirroring for the PPU.
    fn mirroring(&self) -> Mirroring;
    /// Board name for diagnostics.
    fn name(&self) -> &'static str;
}
