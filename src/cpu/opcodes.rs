//! Opcode decode table.
//!
//! Every byte value maps to an ([`Operation`], [`AddressingMode`]) pair, including the
//! [unofficial opcodes](https://www.nesdev.org/wiki/CPU_unofficial_opcodes). Decoding is a
//! pure lookup; execution lives in [`crate::cpu::cpu`].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    // Official
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Unofficial
    Alr, Anc, Anc2, Ane, Arr, Dcp, Isc, Jam, Las, Lax, Lxa, Rla, Rra, Sax,
    Sbx, Sha, Shx, Shy, Slo, Sre, Tas, Usbc,
}

impl Operation {
    /// True for opcodes outside the documented 6502 set.
    pub fn is_unofficial(self) -> bool {
        self >= Operation::Alr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub operation: Operation,
    pub mode: AddressingMode,
}

const fn ins(operation: Operation, mode: AddressingMode) -> Instruction {
    Instruction { operation, mode }
}

/// Look up the instruction for an opcode byte.
pub fn decode(opcode: u8) -> Instruction {
    OPCODE_TABLE[opcode as usize]
}

#[rustfmt::skip]
pub static OPCODE_TABLE: [Instruction; 256] = {
    use AddressingMode::*;
    use Operation::*;
    [
        // 0x00
        ins(Brk, Implied),   ins(Ora, IndirectX), ins(Jam, Implied),   ins(Slo, IndirectX),
        ins(Nop, ZeroPage),  ins(Ora, ZeroPage),  ins(Asl, ZeroPage),  ins(Slo, ZeroPage),
        ins(Php, Implied),   ins(Ora, Immediate), ins(Asl, Accumulator), ins(Anc, Immediate),
        ins(Nop, Absolute),  ins(Ora, Absolute),  ins(Asl, Absolute),  ins(Slo, Absolute),
        // 0x10
        ins(Bpl, Relative),  ins(Ora, IndirectY), ins(Jam, Implied),   ins(Slo, IndirectY),
        ins(Nop, ZeroPageX), ins(Ora, ZeroPageX), ins(Asl, ZeroPageX), ins(Slo, ZeroPageX),
        ins(Clc, Implied),   ins(Ora, AbsoluteY), ins(Nop, Implied),   ins(Slo, AbsoluteY),
        ins(Nop, AbsoluteX), ins(Ora, AbsoluteX), ins(Asl, AbsoluteX), ins(Slo, AbsoluteX),
        // 0x20
        ins(Jsr, Absolute),  ins(And, IndirectX), ins(Jam, Implied),   ins(Rla, IndirectX),
        ins(Bit, ZeroPage),  ins(And, ZeroPage),  ins(Rol, ZeroPage),  ins(Rla, ZeroPage),
        ins(Plp, Implied),   ins(And, Immediate), ins(Rol, Accumulator), ins(Anc2, Immediate),
        ins(Bit, Absolute),  ins(And, Absolute),  ins(Rol, Absolute),  ins(Rla, Absolute),
        // 0x30
        ins(Bmi, Relative),  ins(And, IndirectY), ins(Jam, Implied),   ins(Rla, IndirectY),
        ins(Nop, ZeroPageX), ins(And, ZeroPageX), ins(Rol, ZeroPageX), ins(Rla, ZeroPageX),
        ins(Sec, Implied),   ins(And, AbsoluteY), ins(Nop, Implied),   ins(Rla, AbsoluteY),
        ins(Nop, AbsoluteX), ins(And, AbsoluteX), ins(Rol, AbsoluteX), ins(Rla, AbsoluteX),
        // 0x40
        ins(Rti, Implied),   ins(Eor, IndirectX), ins(Jam, Implied),   ins(Sre, IndirectX),
        ins(Nop, ZeroPage),  ins(Eor, ZeroPage),  ins(Lsr, ZeroPage),  ins(Sre, ZeroPage),
        ins(Pha, Implied),   ins(Eor, Immediate), ins(Lsr, Accumulator), ins(Alr, Immediate),
        ins(Jmp, Absolute),  ins(Eor, Absolute),  ins(Lsr, Absolute),  ins(Sre, Absolute),
        // 0x50
        ins(Bvc, Relative),  ins(Eor, IndirectY), ins(Jam, Implied),   ins(Sre, IndirectY),
        ins(Nop, ZeroPageX), ins(Eor, ZeroPageX), ins(Lsr, ZeroPageX), ins(Sre, ZeroPageX),
        ins(Cli, Implied),   ins(Eor, AbsoluteY), ins(Nop, Implied),   ins(Sre, AbsoluteY),
        ins(Nop, AbsoluteX), ins(Eor, AbsoluteX), ins(Lsr, AbsoluteX), ins(Sre, AbsoluteX),
        // 0x60
        ins(Rts, Implied),   ins(Adc, IndirectX), ins(Jam, Implied),   ins(Rra, IndirectX),
        ins(Nop, ZeroPage),  ins(Adc, ZeroPage),  ins(Ror, ZeroPage),  ins(Rra, ZeroPage),
        ins(Pla, Implied),   ins(Adc, Immediate), ins(Ror, Accumulator), ins(Arr, Immediate),
        ins(Jmp, Indirect),  ins(Adc, Absolute),  ins(Ror, Absolute),  ins(Rra, Absolute),
        // 0x70
        ins(Bvs, Relative),  ins(Adc, IndirectY), ins(Jam, Implied),   ins(Rra, IndirectY),
        ins(Nop, ZeroPageX), ins(Adc, ZeroPageX), ins(Ror, ZeroPageX), ins(Rra, ZeroPageX),
        ins(Sei, Implied),   ins(Adc, AbsoluteY), ins(Nop, Implied),   ins(Rra, AbsoluteY),
        ins(Nop, AbsoluteX), ins(Adc, AbsoluteX), ins(Ror, AbsoluteX), ins(Rra, AbsoluteX),
        // 0x80
        ins(Nop, Immediate), ins(Sta, IndirectX), ins(Nop, Immediate), ins(Sax, IndirectX),
        ins(Sty, ZeroPage),  ins(Sta, ZeroPage),  ins(Stx, ZeroPage),  ins(Sax, ZeroPage),
        ins(Dey, Implied),   ins(Nop, Immediate), ins(Txa, Implied),   ins(Ane, Immediate),
        ins(Sty, Absolute),  ins(Sta, Absolute),  ins(Stx, Absolute),  ins(Sax, Absolute),
        // 0x90
        ins(Bcc, Relative),  ins(Sta, IndirectY), ins(Jam, Implied),   ins(Sha, IndirectY),
        ins(Sty, ZeroPageX), ins(Sta, ZeroPageX), ins(Stx, ZeroPageY), ins(Sax, ZeroPageY),
        ins(Tya, Implied),   ins(Sta, AbsoluteY), ins(Txs, Implied),   ins(Tas, AbsoluteY),
        ins(Shy, AbsoluteX), ins(Sta, AbsoluteX), ins(Shx, AbsoluteY), ins(Sha, AbsoluteY),
        // 0xA0
        ins(Ldy, Immediate), ins(Lda, IndirectX), ins(Ldx, Immediate), ins(Lax, IndirectX),
        ins(Ldy, ZeroPage),  ins(Lda, ZeroPage),  ins(Ldx, ZeroPage),  ins(Lax, ZeroPage),
        ins(Tay, Implied),   ins(Lda, Immediate), ins(Tax, Implied),   ins(Lxa, Immediate),
        ins(Ldy, Absolute),  ins(Lda, Absolute),  ins(Ldx, Absolute),  ins(Lax, Absolute),
        // 0xB0
        ins(Bcs, Relative),  ins(Lda, IndirectY), ins(Jam, Implied),   ins(Lax, IndirectY),
        ins(Ldy, ZeroPageX), ins(Lda, ZeroPageX), ins(Ldx, ZeroPageY), ins(Lax, ZeroPageY),
        ins(Clv, Implied),   ins(Lda, AbsoluteY), ins(Tsx, Implied),   ins(Las, AbsoluteY),
        ins(Ldy, AbsoluteX), ins(Lda, AbsoluteX), ins(Ldx, AbsoluteY), ins(Lax, AbsoluteY),
        // 0xC0
        ins(Cpy, Immediate), ins(Cmp, IndirectX), ins(Nop, Immediate), ins(Dcp, IndirectX),
        ins(Cpy, ZeroPage),  ins(Cmp, ZeroPage),  ins(Dec, ZeroPage),  ins(Dcp, ZeroPage),
        ins(Iny, Implied),   ins(Cmp, Immediate), ins(Dex, Implied),   ins(Sbx, Immediate),
        ins(Cpy, Absolute),  ins(Cmp, Absolute),  ins(Dec, Absolute),  ins(Dcp, Absolute),
        // 0xD0
        ins(Bne, Relative),  ins(Cmp, IndirectY), ins(Jam, Implied),   ins(Dcp, IndirectY),
        ins(Nop, ZeroPageX), ins(Cmp, ZeroPageX), ins(Dec, ZeroPageX), ins(Dcp, ZeroPageX),
        ins(Cld, Implied),   ins(Cmp, AbsoluteY), ins(Nop, Implied),   ins(Dcp, AbsoluteY),
        ins(Nop, AbsoluteX), ins(Cmp, AbsoluteX), ins(Dec, AbsoluteX), ins(Dcp, AbsoluteX),
        // 0xE0
        ins(Cpx, Immediate), ins(Sbc, IndirectX), ins(Nop, Immediate), ins(Isc, IndirectX),
        ins(Cpx, ZeroPage),  ins(Sbc, ZeroPage),  ins(Inc, ZeroPage),  ins(Isc, ZeroPage),
        ins(Inx, Implied),   ins(Sbc, Immediate), ins(Nop, Implied),   ins(Usbc, Immediate),
        ins(Cpx, Absolute),  ins(Sbc, Absolute),  ins(Inc, Absolute),  ins(Isc, Absolute),
        // 0xF0
        ins(Beq, Relative),  ins(Sbc, IndirectY), ins(Jam, Implied),   ins(Isc, IndirectY),
        ins(Nop, ZeroPageX), ins(Sbc, ZeroPageX), ins(Inc, ZeroPageX), ins(Isc, ZeroPageX),
        ins(Sed, Implied),   ins(Sbc, AbsoluteY), ins(Nop, Implied),   ins(Isc, AbsoluteY),
        ins(Nop, AbsoluteX), ins(Sbc, AbsoluteX), ins(Inc, AbsoluteX), ins(Isc, AbsoluteX),
    ]
};
