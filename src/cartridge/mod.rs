//! Cartridge loading and mapper support.
//!
//! - **cartridge**: parses iNES (.nes) images into a [`cartridge::RomImage`] and wraps the mapper.
//! - **mapper**: the [`mapper::mapper::Mapper`] contract, nametable mirroring, and NROM (0).

#[allow(clippy::module_inception)]
pub mod cartridge;
pub mod mapper;
