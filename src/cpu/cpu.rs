use tracing::{trace, warn};

use crate::{
    bus::Bus,
    cpu::{
        flags::Status,
        opcodes::{AddressingMode, Instruction, Operation, decode},
    },
};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

const STACK_BASE: u16 = 0x0100;

/// Resolved operand of one instruction.
#[derive(Debug, Clone, Copy)]
enum Operand {
    Implied,
    Accumulator,
    /// Effective address, plus the un-indexed base the SHx family needs.
    Memory { addr: u16, base: u16 },
}

/// Ricoh 2A03 CPU core (6502 without decimal mode).
///
/// Holds registers only; every memory access goes through the [`Bus`] passed to
/// [`CPU::step`], so the CPU never owns or references its siblings.
pub struct CPU {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: Status,
    /// Cycles consumed by the last instruction or interrupt entry.
    pub cycles: u32,
    pub total_cycles: u64,
    pub halted: bool,
}

impl CPU {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: Status::empty(),
            cycles: 0,
            total_cycles: 0,
            halted: false,
        }
    }

    /// Load PC from the reset vector and clear registers and status.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.cycles = 0;
        self.pc = self.read_word(bus, RESET_VECTOR);

        self.sp = 0xFD;
        self.status = Status::empty();

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.halted = false;

        self.total_cycles = 0;
    }

    /// Non-maskable interrupt: push PC and P, set I, jump through $FFFA.
    pub fn request_nmi(&mut self, bus: &mut impl Bus) -> u32 {
        self.interrupt(bus, NMI_VECTOR)
    }

    /// Maskable interrupt; ignored while I is set. Returns the cycles spent.
    pub fn request_interrupt(&mut self, bus: &mut impl Bus) -> u32 {
        if self.status.contains(Status::INTERRUPT_DISABLE) {
            return 0;
        }
        self.interrupt(bus, IRQ_VECTOR)
    }

    /// Software break: push PC+1 and P with B set, set I, jump through $FFFE.
    pub fn request_break(&mut self, bus: &mut impl Bus) {
        self.push_word(bus, self.pc.wrapping_add(1));
        self.push(bus, self.status.to_byte_brk());
        self.status.insert(Status::INTERRUPT_DISABLE);
        self.pc = self.read_word(bus, IRQ_VECTOR);
    }

    fn interrupt(&mut self, bus: &mut impl Bus, vector: u16) -> u32 {
        // A jammed CPU does not respond to interrupts.
        if self.halted {
            return 0;
        }
        self.cycles = 2;
        self.push_word(bus, self.pc);
        self.push(bus, self.status.to_byte_irq());
        self.status.insert(Status::INTERRUPT_DISABLE);
        self.pc = self.read_word(bus, vector);
        self.total_cycles += u64::from(self.cycles);
        self.cycles
    }

    /// Execute exactly one instruction and return the cycles it consumed.
    /// A halted CPU consumes nothing.
    pub fn step(&mut self, bus: &mut impl Bus) -> u32 {
        if self.halted {
            return 0;
        }
        self.cycles = 0;

        let pc = self.pc;
        let opcode = self.fetch_byte(bus);
        let instruction = decode(opcode);
        trace!(
            "{:04X}  {:02X}  {:?} {:?}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            opcode,
            instruction.operation,
            instruction.mode,
            self.a,
            self.x,
            self.y,
            self.status.to_byte(),
            self.sp,
            self.total_cycles
        );

        let operand = self.resolve(bus, instruction.mode);
        self.execute(bus, instruction, operand);

        self.total_cycles += u64::from(self.cycles);
        self.cycles
    }

    // ------------------------------------------------------------------
    // Bus access; every access costs one cycle
    // ------------------------------------------------------------------

    fn read(&mut self, bus: &mut impl Bus, addr: u16) -> u8 {
        self.cycles += 1;
        bus.read(addr)
    }

    fn write(&mut self, bus: &mut impl Bus, addr: u16, data: u8) {
        self.cycles += 1;
        bus.write(addr, data);
    }

    fn read_word(&mut self, bus: &mut impl Bus, addr: u16) -> u16 {
        let lo = self.read(bus, addr) as u16;
        let hi = self.read(bus, addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Read a pointer from zero page; the high byte wraps within page 0.
    fn read_word_zero_page(&mut self, bus: &mut impl Bus, ptr: u8) -> u16 {
        let lo = self.read(bus, ptr as u16) as u16;
        let hi = self.read(bus, ptr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    fn fetch_byte(&mut self, bus: &mut impl Bus) -> u8 {
        let byte = self.read(bus, self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.fetch_byte(bus) as u16;
        let hi = self.fetch_byte(bus) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn push(&mut self, bus: &mut impl Bus, data: u8) {
        self.write(bus, STACK_BASE | self.sp as u16, data);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pop(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(bus, STACK_BASE | self.sp as u16)
    }

    /// Push high byte first, so the low byte ends up at the lower address.
    pub(crate) fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    pub(crate) fn pop_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.pop(bus) as u16;
        let hi = self.pop(bus) as u16;
        (hi << 8) | lo
    }

    // ------------------------------------------------------------------
    // Addressing modes
    // ------------------------------------------------------------------

    fn resolve(&mut self, bus: &mut impl Bus, mode: AddressingMode) -> Operand {
        let (addr, base) = match mode {
            AddressingMode::Implied => {
                self.cycles += 1;
                return Operand::Implied;
            }
            AddressingMode::Accumulator => {
                self.cycles += 1;
                return Operand::Accumulator;
            }
            AddressingMode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, addr)
            }
            AddressingMode::ZeroPage => {
                let addr = self.fetch_byte(bus) as u16;
                (addr, addr)
            }
            AddressingMode::ZeroPageX => {
                let zp = self.fetch_byte(bus);
                self.cycles += 1;
                (zp.wrapping_add(self.x) as u16, zp as u16)
            }
            AddressingMode::ZeroPageY => {
                let zp = self.fetch_byte(bus);
                self.cycles += 1;
                (zp.wrapping_add(self.y) as u16, zp as u16)
            }
            AddressingMode::Relative => {
                let offset = self.fetch_byte(bus) as i8;
                let target = self.pc.wrapping_add(offset as u16);
                (target, self.pc)
            }
            AddressingMode::Absolute => {
                let addr = self.fetch_word(bus);
                (addr, addr)
            }
            AddressingMode::AbsoluteX => {
                let base = self.fetch_word(bus);
                (base.wrapping_add(self.x as u16), base)
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_word(bus);
                (base.wrapping_add(self.y as u16), base)
            }
            AddressingMode::Indirect => {
                // The pointer's high byte is fetched without carrying into the next page.
                let ptr = self.fetch_word(bus);
                let lo = self.read(bus, ptr) as u16;
                let hi = self.read(bus, (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                let addr = (hi << 8) | lo;
                (addr, addr)
            }
            AddressingMode::IndirectX => {
                let zp = self.fetch_byte(bus).wrapping_add(self.x);
                self.cycles += 1;
                let addr = self.read_word_zero_page(bus, zp);
                (addr, addr)
            }
            AddressingMode::IndirectY => {
                let zp = self.fetch_byte(bus);
                let base = self.read_word_zero_page(bus, zp);
                (base.wrapping_add(self.y as u16), base)
            }
        };
        Operand::Memory { addr, base }
    }

    fn load(&mut self, bus: &mut impl Bus, operand: Operand) -> u8 {
        match operand {
            Operand::Memory { addr, .. } => self.read(bus, addr),
            Operand::Accumulator => self.a,
            Operand::Implied => 0,
        }
    }

    fn store(&mut self, bus: &mut impl Bus, operand: Operand, data: u8) {
        match operand {
            Operand::Memory { addr, .. } => self.write(bus, addr, data),
            Operand::Accumulator => self.a = data,
            Operand::Implied => {}
        }
    }

    /// Read, transform, and write back (one internal cycle for the modify step).
    fn modify(
        &mut self,
        bus: &mut impl Bus,
        operand: Operand,
        f: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u8 {
        let value = self.load(bus, operand);
        if matches!(operand, Operand::Memory { .. }) {
            self.cycles += 1;
        }
        let result = f(self, value);
        self.store(bus, operand, result);
        result
    }

    // ------------------------------------------------------------------
    // Execute
    // ------------------------------------------------------------------

    fn execute(&mut self, bus: &mut impl Bus, instruction: Instruction, operand: Operand) {
        use Operation::*;

        match instruction.operation {
            // Load / store
            Lda => {
                self.a = self.load(bus, operand);
                self.status.update_zero_negative(self.a);
            }
            Ldx => {
                self.x = self.load(bus, operand);
                self.status.update_zero_negative(self.x);
            }
            Ldy => {
                self.y = self.load(bus, operand);
                self.status.update_zero_negative(self.y);
            }
            Sta => self.store(bus, operand, self.a),
            Stx => self.store(bus, operand, self.x),
            Sty => self.store(bus, operand, self.y),

            // Transfers
            Tax => self.transfer_to_x(self.a),
            Tay => {
                self.y = self.a;
                self.status.update_zero_negative(self.y);
            }
            Tsx => self.transfer_to_x(self.sp),
            Txa => self.transfer_to_a(self.x),
            Tya => self.transfer_to_a(self.y),
            Txs => self.sp = self.x,

            // Arithmetic and logic
            Adc => {
                let value = self.load(bus, operand);
                self.adc(value);
            }
            Sbc | Usbc => {
                let value = self.load(bus, operand);
                self.sbc(value);
            }
            And => {
                let value = self.load(bus, operand);
                self.transfer_to_a(self.a & value);
            }
            Ora => {
                let value = self.load(bus, operand);
                self.transfer_to_a(self.a | value);
            }
            Eor => {
                let value = self.load(bus, operand);
                self.transfer_to_a(self.a ^ value);
            }
            Bit => {
                let value = self.load(bus, operand);
                self.status.set(Status::ZERO, self.a & value == 0);
                self.status.set(Status::OVERFLOW, value & 0x40 != 0);
                self.status.set(Status::NEGATIVE, value & 0x80 != 0);
            }
            Cmp => {
                let value = self.load(bus, operand);
                self.compare(self.a, value);
            }
            Cpx => {
                let value = self.load(bus, operand);
                self.compare(self.x, value);
            }
            Cpy => {
                let value = self.load(bus, operand);
                self.compare(self.y, value);
            }

            // Shifts and rotates
            Asl => {
                self.modify(bus, operand, Self::asl);
            }
            Lsr => {
                self.modify(bus, operand, Self::lsr);
            }
            Rol => {
                self.modify(bus, operand, Self::rol);
            }
            Ror => {
                self.modify(bus, operand, Self::ror);
            }

            // Increment / decrement
            Inc => {
                self.modify(bus, operand, |cpu, v| cpu.set_zn(v.wrapping_add(1)));
            }
            Dec => {
                self.modify(bus, operand, |cpu, v| cpu.set_zn(v.wrapping_sub(1)));
            }
            Inx => self.transfer_to_x(self.x.wrapping_add(1)),
            Dex => self.transfer_to_x(self.x.wrapping_sub(1)),
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.status.update_zero_negative(self.y);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.status.update_zero_negative(self.y);
            }

            // Branches
            Bcc => self.branch(operand, !self.status.contains(Status::CARRY)),
            Bcs => self.branch(operand, self.status.contains(Status::CARRY)),
            Bne => self.branch(operand, !self.status.contains(Status::ZERO)),
            Beq => self.branch(operand, self.status.contains(Status::ZERO)),
            Bpl => self.branch(operand, !self.status.contains(Status::NEGATIVE)),
            Bmi => self.branch(operand, self.status.contains(Status::NEGATIVE)),
            Bvc => self.branch(operand, !self.status.contains(Status::OVERFLOW)),
            Bvs => self.branch(operand, self.status.contains(Status::OVERFLOW)),

            // Jumps and calls
            Jmp => {
                if let Operand::Memory { addr, .. } = operand {
                    self.pc = addr;
                }
            }
            Jsr => {
                if let Operand::Memory { addr, .. } = operand {
                    self.cycles += 1;
                    self.push_word(bus, self.pc.wrapping_sub(1));
                    self.pc = addr;
                }
            }
            Rts => {
                self.cycles += 1;
                self.pc = self.pop_word(bus).wrapping_add(1);
                self.cycles += 1;
            }
            Rti => {
                self.cycles += 1;
                let p = self.pop(bus);
                self.status = Status::from_stack(p);
                self.pc = self.pop_word(bus);
            }
            Brk => self.request_break(bus),

            // Stack
            Pha => self.push(bus, self.a),
            Php => self.push(bus, self.status.to_byte_brk()),
            Pla => {
                self.cycles += 1;
                let value = self.pop(bus);
                self.transfer_to_a(value);
            }
            Plp => {
                self.cycles += 1;
                let p = self.pop(bus);
                self.status = Status::from_stack(p);
            }

            // Flags
            Clc => self.status.remove(Status::CARRY),
            Sec => self.status.insert(Status::CARRY),
            Cli => self.status.remove(Status::INTERRUPT_DISABLE),
            Sei => self.status.insert(Status::INTERRUPT_DISABLE),
            Cld => self.status.remove(Status::DECIMAL),
            Sed => self.status.insert(Status::DECIMAL),
            Clv => self.status.remove(Status::OVERFLOW),

            Nop => {
                if let Operand::Memory { addr, .. } = operand {
                    self.read(bus, addr);
                }
            }

            // Unofficial: read-modify-write combos
            Slo => {
                let value = self.modify(bus, operand, Self::asl);
                self.transfer_to_a(self.a | value);
            }
            Rla => {
                let value = self.modify(bus, operand, Self::rol);
                self.transfer_to_a(self.a & value);
            }
            Sre => {
                let value = self.modify(bus, operand, Self::lsr);
                self.transfer_to_a(self.a ^ value);
            }
            Rra => {
                let value = self.modify(bus, operand, Self::ror);
                self.adc(value);
            }
            Isc => {
                let value = self.modify(bus, operand, |_, v| v.wrapping_add(1));
                self.sbc(value);
            }
            Dcp => {
                let value = self.modify(bus, operand, |_, v| v.wrapping_sub(1));
                self.compare(self.a, value);
            }

            // Unofficial: loads and stores
            Lax => {
                let value = self.load(bus, operand);
                self.a = value;
                self.transfer_to_x(value);
            }
            Sax => self.store(bus, operand, self.a & self.x),
            Las => {
                let value = self.load(bus, operand) & self.sp;
                self.a = value;
                self.sp = value;
                self.transfer_to_x(value);
            }
            Sha => self.store_high_and(bus, operand, self.a & self.x),
            Shx => self.store_high_and(bus, operand, self.x),
            Shy => self.store_high_and(bus, operand, self.y),
            Tas => {
                self.sp = self.a & self.x;
                self.store_high_and(bus, operand, self.sp);
            }

            // Unofficial: immediate combos
            Anc | Anc2 => {
                let value = self.load(bus, operand);
                self.transfer_to_a(self.a & value);
                self.status.set(Status::CARRY, self.a & 0x80 != 0);
            }
            Alr => {
                let value = self.load(bus, operand);
                let masked = self.a & value;
                self.a = self.lsr(masked);
            }
            Arr => {
                let value = self.load(bus, operand);
                let carry = self.status.contains(Status::CARRY) as u8;
                let result = ((self.a & value) >> 1) | (carry << 7);
                self.transfer_to_a(result);
                self.status.set(Status::CARRY, result & 0x40 != 0);
                self.status.set(Status::OVERFLOW, ((result >> 6) ^ (result >> 5)) & 1 != 0);
            }
            Ane => {
                let value = self.load(bus, operand);
                self.transfer_to_a((self.a | 0xEE) & self.x & value);
            }
            Lxa => {
                let value = (self.a | 0xEE) & self.load(bus, operand);
                self.a = value;
                self.transfer_to_x(value);
            }
            Sbx => {
                let value = self.load(bus, operand);
                let masked = self.a & self.x;
                self.status.set(Status::CARRY, masked >= value);
                self.transfer_to_x(masked.wrapping_sub(value));
            }

            Jam => {
                self.pc = self.pc.wrapping_sub(1);
                self.halted = true;
                warn!("CPU jammed at ${:04X}", self.pc);
            }
        }
    }

    // ------------------------------------------------------------------
    // ALU helpers
    // ------------------------------------------------------------------

    fn set_zn(&mut self, value: u8) -> u8 {
        self.status.update_zero_negative(value);
        value
    }

    fn transfer_to_a(&mut self, value: u8) {
        self.a = value;
        self.status.update_zero_negative(value);
    }

    fn transfer_to_x(&mut self, value: u8) {
        self.x = value;
        self.status.update_zero_negative(value);
    }

    /// Binary add with carry; the 2A03 ignores the decimal flag.
    fn adc(&mut self, value: u8) {
        let carry = self.status.contains(Status::CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry;
        let result = sum as u8;

        self.status.set(Status::CARRY, sum > 0xFF);
        self.status.set(
            Status::OVERFLOW,
            (self.a ^ value) & 0x80 == 0 && (self.a ^ result) & 0x80 != 0,
        );
        self.transfer_to_a(result);
    }

    fn sbc(&mut self, value: u8) {
        self.adc(!value);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.status.set(Status::CARRY, register >= value);
        self.status.update_zero_negative(register.wrapping_sub(value));
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.status.set(Status::CARRY, value & 0x80 != 0);
        self.set_zn(value << 1)
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.status.set(Status::CARRY, value & 0x01 != 0);
        self.set_zn(value >> 1)
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry = self.status.contains(Status::CARRY) as u8;
        self.status.set(Status::CARRY, value & 0x80 != 0);
        self.set_zn((value << 1) | carry)
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry = self.status.contains(Status::CARRY) as u8;
        self.status.set(Status::CARRY, value & 0x01 != 0);
        self.set_zn((value >> 1) | (carry << 7))
    }

    fn branch(&mut self, operand: Operand, condition: bool) {
        if let (true, Operand::Memory { addr, .. }) = (condition, operand) {
            self.cycles += 1;
            self.pc = addr;
        }
    }

    /// SHA/SHX/SHY/TAS: store `value & (H + 1)` where H is the base address high byte.
    /// When indexing crosses a page, the stored value also replaces the target's high byte.
    fn store_high_and(&mut self, bus: &mut impl Bus, operand: Operand, value: u8) {
        let Operand::Memory { addr, base } = operand else {
            return;
        };
        let high = ((base >> 8) as u8).wrapping_add(1);
        let data = value & high;
        let target = if (addr ^ base) & 0xFF00 != 0 {
            ((data as u16) << 8) | (addr & 0x00FF)
        } else {
            addr
        };
        self.write(bus, target, data);
    }
}

impl Default for CPU {
    fn default() -> Self {
        Self::new()
    }
}
