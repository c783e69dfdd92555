//! Famicore: an emulation core for the NES / Famicom 8-bit console.
//!
//! Implements the chipset as documented on the
//! [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide): the 2A03 CPU core and APU,
//! a frame-granular 2C02 PPU, NROM cartridges, and controller I/O, tied together by a
//! [`system::System`] aggregate that paces execution from wall-clock time.
//!
//! ## Modules (NESdev references)
//!
//! - **apu** – [APU](https://www.nesdev.org/wiki/APU): pulse×2, triangle, noise, DMC, frame
//!   counter, [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer)
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): RAM, PPU, APU,
//!   controller, cartridge; open-bus latch
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) loading; [Mapper](https://www.nesdev.org/wiki/Mapper) NROM (0)
//! - **config** – clock rate, scheduler slicing, audio sample rate
//! - **controller** – [Controller reading](https://www.nesdev.org/wiki/Controller_reading): $4016 strobe, shift-out
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) / 2A03: full + undocumented opcodes, [NMI](https://www.nesdev.org/wiki/NMI)
//! - **error** – load errors and mapper contract violations
//! - **memory** – 2 KiB work RAM, mirrored to $1FFF
//! - **ppu** – [PPU](https://www.nesdev.org/wiki/PPU), [PPU registers](https://www.nesdev.org/wiki/PPU_registers), OAM, nametables, 256×240
//! - **system** – console aggregate and per-frame scheduler

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod config;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod ppu;
pub mod system;
