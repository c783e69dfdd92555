//! 6502 processor status register (P).
//!
//! See [Status flags](https://www.nesdev.org/wiki/Status_flags). Bits 4 (B) and 5 only
//! exist in the byte pushed to the stack; they are kept here so a pushed/pulled byte
//! round-trips through one type.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const CARRY             = 1 << 0;
        const ZERO              = 1 << 1;
        const INTERRUPT_DISABLE = 1 << 2;
        const DECIMAL           = 1 << 3; // stored, but the 2A03 has no BCD unit
        const BREAK             = 1 << 4;
        const UNUSED            = 1 << 5;
        const OVERFLOW          = 1 << 6;
        const NEGATIVE          = 1 << 7;
    }
}

impl Status {
    /// Unpack a raw P byte.
    pub fn from_byte(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }

    /// Pack into a raw P byte. Bit 5 always reads back as 1.
    pub fn to_byte(self) -> u8 {
        (self | Self::UNUSED).bits()
    }

    /// Byte pushed by PHP and BRK: B and bit 5 set.
    pub fn to_byte_brk(self) -> u8 {
        self.to_byte() | Self::BREAK.bits()
    }

    /// Byte pushed by NMI and IRQ: B clear, bit 5 set.
    pub fn to_byte_irq(self) -> u8 {
        self.to_byte() & !Self::BREAK.bits()
    }

    /// Byte pulled by PLP and RTI: B dropped, bit 5 set.
    pub fn from_stack(byte: u8) -> Self {
        (Self::from_byte(byte) - Self::BREAK) | Self::UNUSED
    }

    /// Recompute Z and N from a result byte.
    pub fn update_zero_negative(&mut self, value: u8) {
        self.set(Self::ZERO, value == 0);
        self.set(Self::NEGATIVE, value & 0x80 != 0);
    }
}
