//! Standard controller on port 1 ($4016).
//!
//! Implements the [controller shift register protocol](https://www.nesdev.org/wiki/Standard_controller):
//! while bit 0 of the last $4016 write is 1 the register keeps reloading and reads report button A;
//! once it is 0, each read shifts out the next button (A, B, Select, Start, Up, Down, Left, Right).

use bitflags::bitflags;

bitflags! {
    /// Button mask as seen by the shift register (bit 0 shifts out first).
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const A      = 1 << 0;
        const B      = 1 << 1;
        const SELECT = 1 << 2;
        const START  = 1 << 3;
        const UP     = 1 << 4;
        const DOWN   = 1 << 5;
        const LEFT   = 1 << 6;
        const RIGHT  = 1 << 7;
    }
}

/// A single controller connected to port 1.
pub struct Controller {
    /// Buttons currently held, set by the frontend.
    pub state: Buttons,
    /// Shift register, latched from `state` while strobing.
    shift: u8,
    /// Number of bits shifted out since strobe was released.
    reads: u8,
    strobe: bool,
}

impl Controller {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Controller {
            state: Buttons::empty(),
            shift: 0,
            reads: 0,
            strobe: false,
        }
    }

    pub fn set_buttons(&mut self, buttons: u8) {
        self.state = Buttons::from_bits_retain(buttons);
    }

    /// Read one bit from $4016. Bit 0 carries the button; after eight reads the
    /// official controller reports 1.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.state.bits() & 1;
        }
        if self.reads >= 8 {
            return 1;
        }
        let bit = self.shift & 1;
        self.shift >>= 1;
        self.reads += 1;
        bit
    }

    /// Write to $4016. Bit 0 set selects strobe mode, clear selects shift mode.
    pub fn write(&mut self, data: u8) {
        self.strobe = data & 1 != 0;
        self.shift = self.state.bits();
        self.reads = 0;
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}
