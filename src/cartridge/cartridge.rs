//! Cartridge loading from iNES images (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) layout: 16-byte header (magic "NES\x1A",
//! PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6–7 for mirroring, trainer, and mapper
//! number), an optional 512-byte trainer, then PRG ROM, then CHR ROM. A CHR size of 0 means the
//! board carries 8 KiB of CHR RAM instead.

use std::{fs, path::Path};

use tracing::{debug, warn};

use crate::{
    cartridge::mapper::{self, Mirroring, mapper::Mapper},
    error::{CartridgeError, MapperError},
};

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const PRG_BANK_SIZE: usize = 16 * 1024;
pub const CHR_BANK_SIZE: usize = 8 * 1024;

const MAGIC: [u8; 4] = *b"NES\x1A";

/// Parsed contents of an iNES file. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct RomImage {
    pub prg_rom: Vec<u8>,
    /// CHR ROM, or a zeroed 8 KiB buffer when `chr_is_ram`.
    pub chr_rom: Vec<u8>,
    pub chr_is_ram: bool,
    /// PRG size in 16 KiB banks.
    pub prg_banks: u8,
    /// CHR size in 8 KiB banks (0 for CHR RAM).
    pub chr_banks: u8,
    pub mirroring: Mirroring,
    pub mapper_id: u8,
    pub has_trainer: bool,
}

impl RomImage {
    /// Parse an iNES image. Fails fast on anything malformed.
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_SIZE {
            return Err(CartridgeError::TooShort(data.len()));
        }
        if data[0..4] != MAGIC {
            return Err(CartridgeError::BadMagic);
        }

        let prg_banks = data[4];
        let chr_banks = data[5];
        let flags6 = data[6];
        let flags7 = data[7];

        // Flags 6: bit 0 mirroring (1 = vertical), bit 2 trainer, bit 3 four-screen.
        let mirroring = if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        let has_trainer = flags6 & 0x04 != 0;
        if flags6 & 0x08 != 0 {
            warn!("four-screen VRAM requested; using {:?} mirroring", mirroring);
        }
        let mapper_id = (flags7 & 0xF0) | (flags6 >> 4);

        let prg_start = HEADER_SIZE + if has_trainer { TRAINER_SIZE } else { 0 };
        let prg_size = prg_banks as usize * PRG_BANK_SIZE;
        let chr_size = chr_banks as usize * CHR_BANK_SIZE;

        if prg_size == 0 {
            return Err(CartridgeError::Truncated {
                section: "PRG ROM",
                expected: PRG_BANK_SIZE,
                actual: 0,
            });
        }

        let prg_rom = section(data, prg_start, prg_size, "PRG ROM")?.to_vec();
        let chr_is_ram = chr_size == 0;
        let chr_rom = if chr_is_ram {
            vec![0; CHR_BANK_SIZE]
        } else {
            section(data, prg_start + prg_size, chr_size, "CHR ROM")?.to_vec()
        };

        debug!(
            "iNES header: mapper {} PRG {}x16K CHR {}x8K trainer={} flags6={:08b} flags7={:08b}",
            mapper_id, prg_banks, chr_banks, has_trainer, flags6, flags7
        );

        Ok(Self {
            prg_rom,
            chr_rom,
            chr_is_ram,
            prg_banks,
            chr_banks,
            mirroring,
            mapper_id,
            has_trainer,
        })
    }
}

fn section<'a>(
    data: &'a [u8],
    start: usize,
    len: usize,
    name: &'static str,
) -> Result<&'a [u8], CartridgeError> {
    let available = data.len().saturating_sub(start);
    if available < len {
        return Err(CartridgeError::Truncated {
            section: name,
            expected: len,
            actual: available,
        });
    }
    Ok(&data[start..start + len])
}

/// Cartridge: the mapper that implements CPU ($4020–$FFFF) and PPU ($0000–$1FFF) access
/// and nametable mirroring.
pub struct Cartridge {
    pub mapper: Box<dyn Mapper>,
    pub prg_banks: u8,
    pub chr_banks: u8,
    pub mapper_id: u8,
}

impl Cartridge {
    /// Load a cartridge from an iNES file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartridgeError> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Parse an in-memory iNES image and select its mapper.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let rom = RomImage::parse(data)?;
        let prg_banks = rom.prg_banks;
        let chr_banks = rom.chr_banks;
        let mapper_id = rom.mapper_id;
        let mapper = mapper::create(rom)?;
        Ok(Self {
            mapper,
            prg_banks,
            chr_banks,
            mapper_id,
        })
    }

    /// CPU read in cartridge space. `None` means nothing drives the bus.
    pub fn cpu_read(&self, addr: u16) -> Option<u8> {
        self.mapper.cpu_read(addr)
    }

    pub fn cpu_write(&mut self, addr: u16, data: u8) -> Result<(), MapperError> {
        self.mapper.cpu_write(addr, data)
    }

    /// PPU read in pattern-table space ($0000–$1FFF).
    pub fn ppu_read(&self, addr: u16) -> u8 {
        self.mapper.ppu_read(addr)
    }

    pub fn ppu_write(&mut self, addr: u16, data: u8) -> Result<(), MapperError> {
        self.mapper.ppu_write(addr, data)
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }
}

/// Build a minimal iNES image in memory for tests.
#[cfg(test)]
pub(crate) fn build_ines(prg: &[u8], chr: &[u8], flags6: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_SIZE + prg.len() + chr.len());
    data.extend_from_slice(&MAGIC);
    data.push((prg.len() / PRG_BANK_SIZE) as u8);
    data.push((chr.len() / CHR_BANK_SIZE) as u8);
    data.push(flags6);
    data.extend_from_slice(&[0; 9]);
    data.extend_from_slice(prg);
    data.extend_from_slice(chr);
    data
}
