//! PPU (Picture Processing Unit) emulation.
//!
//! See [PPU](https://www.nesdev.org/wiki/PPU), [PPU registers](https://www.nesdev.org/wiki/PPU_registers),
//! [PPU memory map](https://www.nesdev.org/wiki/PPU_memory_map). Handles the v/t/x/w scroll latch,
//! nametable mirroring, palette RAM, OAM, the decoded tile cache, and once-per-frame composition of
//! the background and sprite layers.

#[allow(clippy::module_inception)]
pub mod ppu;
