//! Internal work RAM.
//!
//! 2 KiB at $0000-$07FF, mirrored through $1FFF
//! ([CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map)).

pub const RAM_SIZE: usize = 0x0800;

/// The console's 2 KiB of work RAM.
pub struct Memory {
    ram: [u8; RAM_SIZE],
}

impl Memory {
    pub fn new() -> Self {
        Self { ram: [0; RAM_SIZE] }
    }

    /// Read from any address in $0000-$1FFF; higher bits beyond the mirror are ignored.
    pub fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize & (RAM_SIZE - 1)]
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        self.ram[addr as usize & (RAM_SIZE - 1)] = data;
    }

    /// 256-byte page `page` ($XX00-$XXFF), used as the OAM-DMA source. Pages $00-$1F mirror.
    pub fn page(&self, page: u8) -> &[u8] {
        let start = (usize::from(page) << 8) & (RAM_SIZE - 1);
        &self.ram[start..start + 0x100]
    }

    pub fn clear(&mut self) {
        self.ram.fill(0);
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
