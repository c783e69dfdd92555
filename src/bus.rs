//! CPU memory bus and address decoding.
//!
//! Maps CPU addresses to work RAM, PPU registers, APU registers, the controller, and the
//! cartridge ([CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map)). Reads that
//! nothing answers return the last value seen on the data bus.

use tracing::{debug, error};

use crate::{
    apu::apu::APU, cartridge::cartridge::Cartridge, controller::Controller, error::MapperError,
    memory::Memory, ppu::ppu::PPU,
};

/// Trait for memory-mapped I/O and bus access used by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
}

/// Main console bus: owns every device the CPU can reach.
pub struct NesBus {
    pub memory: Memory,
    pub ppu: PPU,
    pub apu: APU,
    pub controller: Controller,
    pub cart: Option<Cartridge>,
    /// Last value driven on the data bus (open-bus latch).
    open_bus: u8,
    /// First mapper contract violation since the last cartridge insertion.
    fault: Option<MapperError>,
}

impl NesBus {
    pub fn new(apu: APU) -> Self {
        Self {
            memory: Memory::new(),
            ppu: PPU::new(),
            apu,
            controller: Controller::new(),
            cart: None,
            open_bus: 0,
            fault: None,
        }
    }

    /// Swap in a new cartridge and bring the PPU, APU, and RAM to power-on state.
    pub fn insert_cartridge(&mut self, cart: Cartridge) {
        self.memory.clear();
        self.ppu.reset(&cart);
        self.apu.reset();
        self.controller = Controller::new();
        self.cart = Some(cart);
        self.open_bus = 0;
        self.fault = None;
    }

    pub fn open_bus(&self) -> u8 {
        self.open_bus
    }

    /// Latched contract violation, if any.
    pub fn fault(&self) -> Option<&MapperError> {
        self.fault.as_ref()
    }

    pub fn take_fault(&mut self) -> Option<MapperError> {
        self.fault.take()
    }

    fn record(&mut self, result: Result<(), MapperError>) {
        if let Err(err) = result {
            error!("{}", err);
            self.fault.get_or_insert(err);
        }
    }

    /// Copy a 256-byte page into OAM. RAM pages are copied verbatim; other pages go
    /// through the normal read path. Completes instantly.
    fn oam_dma(&mut self, page: u8) {
        if page < 0x20 {
            self.ppu.oam_dma(self.memory.page(page));
        } else {
            let base = (page as u16) << 8;
            let data: Vec<u8> = (0..=0xFF).map(|i| self.read(base | i)).collect();
            self.ppu.oam_dma(&data);
        }
    }

    /// PPU-side read: pattern space goes to the mapper, the rest stays in the PPU.
    pub fn ppu_read(&self, addr: u16) -> u8 {
        self.ppu.read_vram(addr, self.cart.as_ref())
    }

    pub fn ppu_write(&mut self, addr: u16, data: u8) {
        let result = self.ppu.write_vram(addr, data, self.cart.as_mut());
        self.record(result);
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            // Internal RAM (mirrored 4x in 0x0000-0x1FFF)
            0x0000..=0x1FFF => self.memory.read(addr),
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => self.ppu.read_register(addr, self.cart.as_ref()),
            0x4015 => self.apu.read_status(),
            // Upper bits of $4016 are not driven.
            0x4016 => (self.open_bus & 0xE0) | self.controller.read(),
            // Second controller port is not connected.
            0x4017 => 0,
            0x4000..=0x4014 | 0x4018..=0x401F => {
                debug!("open-bus read at ${:04X}", addr);
                self.open_bus
            }
            0x4020..=0xFFFF => match self.cart.as_ref().and_then(|c| c.cpu_read(addr)) {
                Some(value) => value,
                None => {
                    debug!("open-bus read at ${:04X}", addr);
                    self.open_bus
                }
            },
        };
        self.open_bus = value;
        value
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.open_bus = data;
        match addr {
            0x0000..=0x1FFF => self.memory.write(addr, data),
            0x2000..=0x3FFF => {
                let result = self.ppu.write_register(addr, data, self.cart.as_mut());
                self.record(result);
            }
            0x4014 => self.oam_dma(data),
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, data),
            0x4016 => self.controller.write(data),
            0x4018..=0x401F => debug!("write ${:02X} to unused ${:04X}", data, addr),
            0x4020..=0xFFFF => match self.cart.as_mut() {
                Some(cart) => {
                    let result = cart.cpu_write(addr, data);
                    self.record(result);
                }
                None => debug!("write ${:02X} to ${:04X} with no cartridge", data, addr),
            },
        }
    }
}
