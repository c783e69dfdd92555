//! Mapper 0 ([NROM](https://www.nesdev.org/wiki/NROM)): no bank switching, 16/32 KiB PRG,
//! 8 KiB CHR ROM or RAM.

use crate::{
    cartridge::{
        cartridge::{PRG_BANK_SIZE, RomImage},
        mapper::{Mirroring, mapper::Mapper},
    },
    error::MapperError,
};

const NAME: &str = "NROM";

/// NROM board: fixed PRG and CHR; a single 16 KiB PRG bank is mirrored into $C000–$FFFF.
pub struct Mapper0 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
}

impl Mapper0 {
    pub fn new(rom: RomImage) -> Self {
        Self {
            prg_rom: rom.prg_rom,
            chr: rom.chr_rom,
            chr_is_ram: rom.chr_is_ram,
            mirroring: rom.mirroring,
        }
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let offset = (addr - 0x8000) as usize;
        if self.prg_rom.len() > PRG_BANK_SIZE {
            offset
        } else {
            offset % PRG_BANK_SIZE
        }
    }
}

impl Mapper for Mapper0 {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            0x8000..=0xFFFF => self.prg_rom.get(self.prg_offset(addr)).copied(),
            // No PRG RAM on this board.
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) -> Result<(), MapperError> {
        Err(MapperError::UnsupportedCpuWrite {
            mapper: NAME,
            addr,
            value: data,
        })
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.chr.get(addr as usize).copied().unwrap_or(0),
            _ => 0,
        }
    }

    fn ppu_write(&mut self, addr: u16, data: u8) -> Result<(), MapperError> {
        match addr {
            0x0000..=0x1FFF if self.chr_is_ram => {
                self.chr[addr as usize] = data;
                Ok(())
            }
            _ => Err(MapperError::UnsupportedPpuWrite {
                mapper: NAME,
                addr,
                value: data,
            }),
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::cartridge::{CHR_BANK_SIZE, build_ines};

    fn nrom(prg_banks: usize, chr_ram: bool) -> Mapper0 {
        let mut prg = vec![0; prg_banks * PRG_BANK_SIZE];
        prg[0] = 0xA0;
        prg[PRG_BANK_SIZE - 1] = 0xA1;
        if prg_banks == 2 {
            prg[PRG_BANK_SIZE] = 0xB0;
        }
        let chr = if chr_ram { vec![] } else { vec![0x33; CHR_BANK_SIZE] };
        Mapper0::new(RomImage::parse(&build_ines(&prg, &chr, 0)).unwrap())
    }

    #[test]
    fn single_bank_is_mirrored() {
        let m = nrom(1, false);
        assert_eq!(m.cpu_read(0x8000), Some(0xA0));
        assert_eq!(m.cpu_read(0xC000), Some(0xA0));
        assert_eq!(m.cpu_read(0xFFFF), Some(0xA1));
    }

    #[test]
    fn two_banks_map_linearly() {
        let m = nrom(2, false);
        assert_eq!(m.cpu_read(0x8000), Some(0xA0));
        assert_eq!(m.cpu_read(0xC000), Some(0xB0));
    }

    #[test]
    fn unmapped_cpu_space_reads_none() {
        let m = nrom(1, false);
        assert_eq!(m.cpu_read(0x6000), None);
        assert_eq!(m.cpu_read(0x4020), None);
    }

    #[test]
    fn writes_to_rom_are_contract_violations() {
        let mut m = nrom(1, false);
        assert_eq!(
            m.cpu_write(0x8000, 1),
            Err(MapperError::UnsupportedCpuWrite {
                mapper: "NROM",
                addr: 0x8000,
                value: 1
            })
        );
        assert!(m.ppu_write(0x0000, 1).is_err());
        assert_eq!(m.ppu_read(0x0000), 0x33);
    }

    #[test]
    fn chr_ram_accepts_ppu_writes() {
        let mut m = nrom(1, true);
        assert_eq!(m.ppu_write(0x1234, 0x5A), Ok(()));
        assert_eq!(m.ppu_read(0x1234), 0x5A);
    }
}
