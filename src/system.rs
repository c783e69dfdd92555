//! The console aggregate: owns the CPU and the bus (and through it every other chip) and
//! paces execution from wall-clock time.
//!
//! One call to [`System::run_frame`] turns an elapsed host duration into a CPU cycle budget,
//! runs the pre-vblank slice, enters vblank (compose the frame, raise NMI), runs the short
//! post-vblank slice, and leaves vblank. The PPU works at frame granularity; the APU is
//! clocked with each instruction's cycle count.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::{
    apu::apu::APU,
    bus::NesBus,
    cartridge::cartridge::Cartridge,
    config::SystemConfig,
    cpu::cpu::CPU,
    error::{EmuError, MapperError},
    ppu::ppu::PPU,
};

/// Work done by one [`System::run_frame`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub cycles: u64,
    pub instructions: u64,
}

pub struct System {
    cpu: CPU,
    bus: NesBus,
    config: SystemConfig,
    paused: bool,
    step_requested: bool,
    /// Contract violation that stopped the machine. Cleared by inserting a cartridge.
    faulted: Option<MapperError>,
}

impl System {
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    pub fn with_config(config: SystemConfig) -> Self {
        Self {
            cpu: CPU::new(),
            bus: NesBus::new(APU::with_clock(config.cpu_clock_hz, config.sample_rate)),
            config,
            paused: false,
            step_requested: false,
            faulted: None,
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Cartridge
    // ------------------------------------------------------------------

    /// Insert a cartridge and power-cycle the console around it.
    pub fn insert_cartridge(&mut self, cart: Cartridge) {
        let name = cart.mapper.name();
        let (prg_banks, chr_banks) = (cart.prg_banks, cart.chr_banks);
        let mirroring = cart.mirroring();

        self.bus.insert_cartridge(cart);
        self.cpu.reset(&mut self.bus);
        self.faulted = None;
        self.step_requested = false;

        info!(
            "inserted {} cartridge: {} x 16K PRG, {} x 8K CHR, {:?} mirroring, entry ${:04X}",
            name, prg_banks, chr_banks, mirroring, self.cpu.pc
        );
    }

    /// Parse an iNES image from memory and insert it.
    pub fn load_rom_bytes(&mut self, data: &[u8]) -> Result<(), EmuError> {
        let cart = Cartridge::from_bytes(data)?;
        self.insert_cartridge(cart);
        Ok(())
    }

    pub fn load_rom(&mut self, path: impl AsRef<Path>) -> Result<(), EmuError> {
        let cart = Cartridge::load(path)?;
        self.insert_cartridge(cart);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Convert elapsed host time to a cycle budget, capped to avoid catch-up bursts.
    pub fn cycle_budget(&self, elapsed: Duration) -> u64 {
        let cycles = (elapsed.as_secs_f64() * self.config.cpu_clock_hz) as u64;
        cycles.min(u64::from(self.config.max_cycles_per_step))
    }

    /// Run one frame's worth of emulation for `elapsed` host time.
    pub fn run_frame(&mut self, elapsed: Duration) -> Result<FrameStats, EmuError> {
        if let Some(fault) = &self.faulted {
            return Err(EmuError::Mapper(fault.clone()));
        }
        if self.bus.cart.is_none() {
            return Err(EmuError::NoCartridge);
        }

        let mut stats = FrameStats::default();

        if self.paused {
            if self.step_requested {
                self.step_requested = false;
                self.run_slice(1, &mut stats)?;
            }
            self.bus.ppu.render();
            return Ok(stats);
        }

        let budget = self.cycle_budget(elapsed);
        let fraction = self.config.vblank_fraction.clamp(0.0, 1.0);
        let post = (budget as f64 * fraction) as u64;
        let pre = budget.saturating_sub(post);

        self.run_slice(pre, &mut stats)?;

        if self.bus.ppu.begin_vblank() {
            let cycles = self.cpu.request_nmi(&mut self.bus);
            self.bus.apu.tick(cycles);
            stats.cycles += u64::from(cycles);
        }

        self.run_slice(post, &mut stats)?;
        self.bus.ppu.end_vblank();

        Ok(stats)
    }

    /// Step the CPU until `budget` cycles are spent. The last instruction may overshoot.
    fn run_slice(&mut self, budget: u64, stats: &mut FrameStats) -> Result<(), EmuError> {
        let mut spent = 0u64;
        while spent < budget {
            if self.cpu.halted {
                debug!("CPU halted at ${:04X}", self.cpu.pc);
                break;
            }

            let mut cycles = self.cpu.step(&mut self.bus);
            stats.instructions += 1;

            if self.bus.apu.irq_pending() {
                cycles += self.cpu.request_interrupt(&mut self.bus);
            }
            self.bus.apu.tick(cycles);
            spent += u64::from(cycles);

            if let Some(fault) = self.bus.take_fault() {
                stats.cycles += spent;
                self.faulted = Some(fault.clone());
                return Err(EmuError::Mapper(fault));
            }
        }
        stats.cycles += spent;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Debug control
    // ------------------------------------------------------------------

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if !paused {
            self.step_requested = false;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Run exactly one instruction on the next frame while paused.
    pub fn request_step(&mut self) {
        if self.paused {
            self.step_requested = true;
        }
    }

    // ------------------------------------------------------------------
    // Observers and input
    // ------------------------------------------------------------------

    pub fn background_buffer(&self) -> &[u8] {
        self.bus.ppu.background_buffer()
    }

    pub fn sprite_buffer(&self) -> &[u8] {
        self.bus.ppu.sprite_buffer()
    }

    pub fn composite_frame(&self) -> &[u32] {
        self.bus.ppu.composite_frame()
    }

    pub fn drain_samples(&mut self) -> Vec<i16> {
        self.bus.apu.drain_samples()
    }

    /// Set controller 1 buttons (bit 0 = A ... bit 7 = Right).
    pub fn set_buttons(&mut self, buttons: u8) {
        self.bus.controller.set_buttons(buttons);
    }

    pub fn cpu(&self) -> &CPU {
        &self.cpu
    }

    pub fn ppu(&self) -> &PPU {
        &self.bus.ppu
    }

    pub fn apu(&self) -> &APU {
        &self.bus.apu
    }

    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    pub fn fault(&self) -> Option<&MapperError> {
        self.faulted.as_ref()
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}
