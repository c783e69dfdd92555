//! 6502 CPU emulation for the console.
//!
//! Full instruction set including unofficial opcodes. Decode is a static 256-entry
//! table ([`opcodes`]); execution is in [`cpu`]. All memory and I/O goes through the
//! [`crate::bus::Bus`] trait.

#[allow(clippy::module_inception)]
pub mod cpu;
pub mod flags;
pub mod opcodes;

#[cfg(test)]
mod tests;
