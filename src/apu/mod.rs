//! APU (Audio Processing Unit) emulation.
//!
//! - **Pulse** (×2): square waves with duty, envelope, sweep, length counter.
//! - **Triangle**: 32-step wave, linear counter, length counter.
//! - **Noise**: LFSR-based, envelope, length counter.
//! - **DMC**: direct output level and byte counter; sample fetches are not emulated.
//! - **Frame counter**: 4-step or 5-step mode; clocks envelope/linear/length/sweep.
//! - **Mixer**: non-linear mix into signed 16-bit samples at a configurable rate.

#[allow(clippy::module_inception)]
pub mod apu;
