use crate::{
    bus::Bus,
    cpu::{
        cpu::CPU,
        flags::Status,
        opcodes::{AddressingMode, OPCODE_TABLE, Operation, decode},
    },
};

struct TestBus {
    mem: [u8; 65536],
}

impl TestBus {
    fn new() -> Self {
        Self { mem: [0; 65536] }
    }

    /// Place `program` at $8000 and point the reset vector at it.
    fn with_program(program: &[u8]) -> Self {
        let mut bus = Self::new();
        bus.mem[0x8000..0x8000 + program.len()].copy_from_slice(program);
        bus.mem[0xFFFC] = 0x00;
        bus.mem[0xFFFD] = 0x80;
        bus
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.mem[addr as usize] = data;
    }
}

fn boot(program: &[u8]) -> (CPU, TestBus) {
    let mut bus = TestBus::with_program(program);
    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    (cpu, bus)
}

#[test]
fn every_opcode_decodes() {
    assert_eq!(OPCODE_TABLE.len(), 256);
    for opcode in 0..=255u8 {
        let ins = decode(opcode);
        // Accumulator mode only belongs to the shift/rotate group.
        if ins.mode == AddressingMode::Accumulator {
            assert!(matches!(
                ins.operation,
                Operation::Asl | Operation::Lsr | Operation::Rol | Operation::Ror
            ));
        }
    }
    assert_eq!(decode(0xA9).operation, Operation::Lda);
    assert_eq!(decode(0xA9).mode, AddressingMode::Immediate);
    assert_eq!(decode(0x6C).mode, AddressingMode::Indirect);
    assert_eq!(decode(0xCB).operation, Operation::Sbx);
    assert_eq!(decode(0xEB).operation, Operation::Usbc);
    assert!(decode(0x8B).operation.is_unofficial());
    assert!(!decode(0xEA).operation.is_unofficial());

    let jams = (0..=255u8).filter(|&op| decode(op).operation == Operation::Jam).count();
    assert_eq!(jams, 12);
}

#[test]
fn reset_loads_vector_and_clears_state() {
    let mut bus = TestBus::new();
    bus.mem[0xFFFC] = 0x34;
    bus.mem[0xFFFD] = 0x12;

    let mut cpu = CPU::new();
    cpu.a = 9;
    cpu.status = Status::CARRY | Status::NEGATIVE;
    cpu.reset(&mut bus);

    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(cpu.sp, 0xFD);
    assert_eq!(cpu.a, 0);
    assert_eq!(cpu.status, Status::empty());
}

#[test]
fn lda_immediate_loads_value() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x42]); // LDA #$42
    let cycles = cpu.step(&mut bus);

    assert_eq!(cpu.a, 0x42);
    assert_eq!(cycles, 2);
    assert_eq!(cpu.pc, 0x8002);
}

#[test]
fn lda_sets_zero_and_negative_flags() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x00, 0xA9, 0x80]);

    cpu.step(&mut bus);
    assert!(cpu.status.contains(Status::ZERO));

    cpu.step(&mut bus);
    assert!(cpu.status.contains(Status::NEGATIVE));
    assert!(!cpu.status.contains(Status::ZERO));
}

#[test]
fn sta_writes_to_memory() {
    let (mut cpu, mut bus) = boot(&[
        0xA9, 0x33, // LDA #$33
        0x8D, 0x00, 0x02, // STA $0200
    ]);
    cpu.step(&mut bus);
    let cycles = cpu.step(&mut bus);

    assert_eq!(bus.mem[0x0200], 0x33);
    assert_eq!(cycles, 4);
}

#[test]
fn adc_signed_overflow() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x50, 0x69, 0x50]); // LDA #$50; ADC #$50
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.a, 0xA0);
    assert!(!cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::OVERFLOW));
    assert!(cpu.status.contains(Status::NEGATIVE));
    assert!(!cpu.status.contains(Status::ZERO));
}

#[test]
fn adc_ignores_decimal_flag() {
    let (mut cpu, mut bus) = boot(&[0xF8, 0xA9, 0x09, 0x69, 0x01]); // SED; LDA #9; ADC #1
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.a, 0x0A);
}

#[test]
fn sbc_borrows_when_carry_clear() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x10, 0x18, 0xE9, 0x01]); // LDA #$10; CLC; SBC #1
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.a, 0x0E);
    assert!(cpu.status.contains(Status::CARRY));
}

#[test]
fn cmp_sets_carry_when_greater_or_equal() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x40, 0xC9, 0x40, 0xC9, 0x41]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(cpu.status.contains(Status::CARRY | Status::ZERO));

    cpu.step(&mut bus);
    assert!(!cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn beq_taken_and_not_taken() {
    // LDA #0 sets Z; BEQ +4 is taken.
    let (mut cpu, mut bus) = boot(&[0xA9, 0x00, 0xF0, 0x04]);
    cpu.step(&mut bus);
    let taken = cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x8004 + 4);
    assert_eq!(taken, 3);

    // LDA #1 clears Z; BEQ +4 falls through.
    let (mut cpu, mut bus) = boot(&[0xA9, 0x01, 0xF0, 0x04]);
    cpu.step(&mut bus);
    let not_taken = cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x8004);
    assert_eq!(not_taken, 2);
}

#[test]
fn bne_loops_until_zero() {
    let (mut cpu, mut bus) = boot(&[
        0xA2, 0x03, // LDX #3
        0xCA, // DEX
        0xD0, 0xFD, // BNE -3
    ]);

    for _ in 0..7 {
        cpu.step(&mut bus);
    }

    assert_eq!(cpu.x, 0x00);
    assert_eq!(cpu.pc, 0x8005);
}

#[test]
fn stack_word_round_trip_pushes_high_byte_first() {
    let mut bus = TestBus::new();
    let mut cpu = CPU::new();
    cpu.sp = 0xFF;

    cpu.push_word(&mut bus, 0x1234);
    assert_eq!(bus.mem[0x01FF], 0x12);
    assert_eq!(bus.mem[0x01FE], 0x34);
    assert_eq!(cpu.sp, 0xFD);

    assert_eq!(cpu.pop_word(&mut bus), 0x1234);
    assert_eq!(cpu.sp, 0xFF);
}

#[test]
fn stack_pointer_wraps_within_page_one() {
    let mut bus = TestBus::new();
    let mut cpu = CPU::new();
    cpu.sp = 0x00;

    cpu.push(&mut bus, 0xAB);
    assert_eq!(bus.mem[0x0100], 0xAB);
    assert_eq!(cpu.sp, 0xFF);
    assert_eq!(cpu.pop(&mut bus), 0xAB);
}

#[test]
fn jsr_and_rts_work() {
    let mut bus = TestBus::with_program(&[
        0x20, 0x00, 0x90, // JSR $9000
        0xA9, 0x11, // LDA #$11
    ]);
    bus.mem[0x9000] = 0xA9; // LDA #$22
    bus.mem[0x9001] = 0x22;
    bus.mem[0x9002] = 0x60; // RTS

    let mut cpu = CPU::new();
    cpu.reset(&mut bus);

    cpu.step(&mut bus); // JSR
    assert_eq!(bus.mem[0x01FD], 0x80);
    assert_eq!(bus.mem[0x01FC], 0x02);
    cpu.step(&mut bus); // LDA #$22
    cpu.step(&mut bus); // RTS
    assert_eq!(cpu.pc, 0x8003);
    cpu.step(&mut bus); // LDA #$11

    assert_eq!(cpu.a, 0x11);
}

#[test]
fn jmp_indirect_wraps_within_page() {
    let mut bus = TestBus::with_program(&[0x6C, 0xFF, 0x02]); // JMP ($02FF)
    bus.mem[0x02FF] = 0x00;
    bus.mem[0x0200] = 0x90; // high byte comes from $0200, not $0300
    bus.mem[0x0300] = 0xA0;

    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.pc, 0x9000);
}

#[test]
fn zero_page_x_wraps() {
    let mut bus = TestBus::with_program(&[0xA2, 0x10, 0xB5, 0xF8]); // LDX #$10; LDA $F8,X
    bus.mem[0x0008] = 0x77;
    bus.mem[0x0108] = 0x11;

    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.a, 0x77);
}

#[test]
fn indirect_y_reads_through_zero_page_pointer() {
    let mut bus = TestBus::with_program(&[0xA0, 0x04, 0xB1, 0x10]); // LDY #4; LDA ($10),Y
    bus.mem[0x0010] = 0x00;
    bus.mem[0x0011] = 0x03;
    bus.mem[0x0304] = 0x5A;

    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.a, 0x5A);
}

#[test]
fn brk_jumps_to_irq_vector_and_rti_returns() {
    let mut bus = TestBus::with_program(&[0x00, 0xEA, 0xEA]); // BRK; padding; NOP
    bus.mem[0xFFFE] = 0x00;
    bus.mem[0xFFFF] = 0x90;
    bus.mem[0x9000] = 0x40; // RTI

    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    let cycles = cpu.step(&mut bus);

    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(cycles, 7);
    assert!(cpu.status.contains(Status::INTERRUPT_DISABLE));
    // Pushed P has B and bit 5 set.
    assert_eq!(bus.mem[0x01FB] & 0x30, 0x30);

    cpu.step(&mut bus); // RTI
    assert_eq!(cpu.pc, 0x8002);
    assert!(!cpu.status.contains(Status::BREAK));
}

#[test]
fn nmi_pushes_state_and_jumps_to_vector() {
    let mut bus = TestBus::with_program(&[0xEA]);
    bus.mem[0xFFFA] = 0x00;
    bus.mem[0xFFFB] = 0xC0;

    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.status.insert(Status::INTERRUPT_DISABLE);
    let cycles = cpu.request_nmi(&mut bus);

    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc, 0xC000);
    assert_eq!(bus.mem[0x01FD], 0x80);
    assert_eq!(bus.mem[0x01FC], 0x00);
    // NMI frames have B clear.
    assert_eq!(bus.mem[0x01FB] & 0x10, 0);
}

#[test]
fn irq_is_masked_by_interrupt_disable() {
    let mut bus = TestBus::with_program(&[0x78]); // SEI
    bus.mem[0xFFFE] = 0x00;
    bus.mem[0xFFFF] = 0xD0;

    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.request_interrupt(&mut bus), 0);
    assert_eq!(cpu.pc, 0x8001);

    cpu.status.remove(Status::INTERRUPT_DISABLE);
    assert_eq!(cpu.request_interrupt(&mut bus), 7);
    assert_eq!(cpu.pc, 0xD000);
}

#[test]
fn php_plp_round_trip_drops_break() {
    let (mut cpu, mut bus) = boot(&[0x38, 0x08, 0x18, 0x28]); // SEC; PHP; CLC; PLP
    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(bus.mem[0x01FD], 0x31);
    assert!(cpu.status.contains(Status::CARRY));
    assert!(!cpu.status.contains(Status::BREAK));
}

#[test]
fn jam_halts_and_rewinds_pc() {
    let (mut cpu, mut bus) = boot(&[0x02]);
    cpu.step(&mut bus);

    assert!(cpu.halted);
    assert_eq!(cpu.pc, 0x8000);
    assert_eq!(cpu.step(&mut bus), 0);
    assert_eq!(cpu.pc, 0x8000);
}

// ----------------------------------------------------------------------
// Unofficial opcodes
// ----------------------------------------------------------------------

#[test]
fn lax_loads_a_and_x() {
    let mut bus = TestBus::with_program(&[0xA7, 0x20]); // LAX $20
    bus.mem[0x0020] = 0x81;
    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.a, 0x81);
    assert_eq!(cpu.x, 0x81);
    assert!(cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn sax_stores_a_and_x() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0xF0, 0xA2, 0x3C, 0x87, 0x10]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(bus.mem[0x0010], 0x30);
}

#[test]
fn slo_shifts_memory_and_ors_into_a() {
    let mut bus = TestBus::with_program(&[0xA9, 0x01, 0x07, 0x10]); // LDA #1; SLO $10
    bus.mem[0x0010] = 0x81;
    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(bus.mem[0x0010], 0x02);
    assert_eq!(cpu.a, 0x03);
    assert!(cpu.status.contains(Status::CARRY));
}

#[test]
fn dcp_decrements_and_compares() {
    let mut bus = TestBus::with_program(&[0xA9, 0x05, 0xC7, 0x10]); // LDA #5; DCP $10
    bus.mem[0x0010] = 0x06;
    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(bus.mem[0x0010], 0x05);
    assert!(cpu.status.contains(Status::ZERO | Status::CARRY));
}

#[test]
fn isc_increments_and_subtracts() {
    let mut bus = TestBus::with_program(&[0x38, 0xA9, 0x10, 0xE7, 0x10]); // SEC; LDA #$10; ISC $10
    bus.mem[0x0010] = 0x01;
    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }

    assert_eq!(bus.mem[0x0010], 0x02);
    assert_eq!(cpu.a, 0x0E);
}

#[test]
fn rla_rotates_memory_and_ands_into_a() {
    // SEC; LDA #$0F; RLA $10
    let mut bus = TestBus::with_program(&[0x38, 0xA9, 0x0F, 0x27, 0x10]);
    bus.mem[0x0010] = 0x81;
    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }

    assert_eq!(bus.mem[0x0010], 0x03);
    assert_eq!(cpu.a, 0x03);
    assert!(cpu.status.contains(Status::CARRY));
    assert_eq!(cpu.cycles, 5);
}

#[test]
fn sre_shifts_memory_and_eors_into_a() {
    let mut bus = TestBus::with_program(&[0xA9, 0xFF, 0x47, 0x10]); // LDA #$FF; SRE $10
    bus.mem[0x0010] = 0x03;
    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(bus.mem[0x0010], 0x01);
    assert_eq!(cpu.a, 0xFE);
    assert!(cpu.status.contains(Status::CARRY | Status::NEGATIVE));
}

#[test]
fn rra_rotates_memory_and_adds_with_carry_out() {
    let mut bus = TestBus::with_program(&[0xA9, 0x10, 0x67, 0x10]); // LDA #$10; RRA $10
    bus.mem[0x0010] = 0x03;
    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    // ROR leaves $01 with carry set, which feeds the add: $10 + $01 + 1.
    assert_eq!(bus.mem[0x0010], 0x01);
    assert_eq!(cpu.a, 0x12);
    assert!(!cpu.status.contains(Status::CARRY));
}

#[test]
fn sha_stores_a_and_x_masked_by_high_byte() {
    // LDA #$0E; LDX #$FF; LDY #$01; SHA $0200,Y -> $0E & $FF & $03 at $0201
    let (mut cpu, mut bus) = boot(&[0xA9, 0x0E, 0xA2, 0xFF, 0xA0, 0x01, 0x9F, 0x00, 0x02]);
    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(bus.mem[0x0201], 0x02);
    assert_eq!(cpu.a, 0x0E);
    assert_eq!(cpu.x, 0xFF);

    // SHA ($10),Y crossing from $02FF: value $01 also becomes the high byte.
    let (mut cpu, mut bus) = boot(&[0xA9, 0x01, 0xA2, 0xFF, 0xA0, 0x01, 0x93, 0x10]);
    bus.mem[0x0010] = 0xFF;
    bus.mem[0x0011] = 0x02;
    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(bus.mem[0x0100], 0x01);
    assert_eq!(bus.mem[0x0300], 0x00);
}

#[test]
fn anc_copies_negative_into_carry() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0xFF, 0x0B, 0x80]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x80);
    assert!(cpu.status.contains(Status::CARRY | Status::NEGATIVE));
}

#[test]
fn alr_ands_then_shifts_right() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0xFF, 0x4B, 0x03]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x01);
    assert!(cpu.status.contains(Status::CARRY));
}

#[test]
fn arr_sets_carry_and_overflow_from_result_bits() {
    let (mut cpu, mut bus) = boot(&[0x38, 0xA9, 0xFF, 0x6B, 0x80]); // SEC; LDA #$FF; ARR #$80
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    // (0xFF & 0x80) >> 1 | 0x80 = 0xC0: bit 6 set, bit 5 clear.
    assert_eq!(cpu.a, 0xC0);
    assert!(cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::OVERFLOW));
}

#[test]
fn sbx_subtracts_from_a_and_x() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x0F, 0xA2, 0x0C, 0xCB, 0x04]); // SBX #4
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.x, 0x08);
    assert!(cpu.status.contains(Status::CARRY));
}

#[test]
fn ane_and_lxa_use_magic_constant() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x01, 0xA2, 0xFF, 0x8B, 0xFF]); // ANE #$FF
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.a, 0xEF);

    let (mut cpu, mut bus) = boot(&[0xA9, 0x00, 0xAB, 0x0F]); // LXA #$0F
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x0E);
    assert_eq!(cpu.x, 0x0E);
}

#[test]
fn shx_stores_x_and_high_byte_plus_one() {
    // LDX #$FF; LDY #$01; SHX $0200,Y -> stores $FF & $03 at $0201
    let (mut cpu, mut bus) = boot(&[0xA2, 0xFF, 0xA0, 0x01, 0x9E, 0x00, 0x02]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(bus.mem[0x0201], 0x03);
}

#[test]
fn shy_page_cross_replaces_high_byte() {
    // LDY #$01; LDX #$01; SHY $02FF,X -> value $01 & $03 = $01, address high byte becomes $01
    let (mut cpu, mut bus) = boot(&[0xA0, 0x01, 0xA2, 0x01, 0x9C, 0xFF, 0x02]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(bus.mem[0x0100], 0x01);
    assert_eq!(bus.mem[0x0300], 0x00);
}

#[test]
fn tas_and_las_move_through_stack_pointer() {
    // LDA #$F3; LDX #$3F; TAS $0200,Y
    let (mut cpu, mut bus) = boot(&[0xA9, 0xF3, 0xA2, 0x3F, 0x9B, 0x00, 0x02]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.sp, 0x33);
    assert_eq!(bus.mem[0x0200], 0x33 & 0x03);

    // LAS $0300,Y with SP = $33
    bus.mem[0x8007] = 0xBB;
    bus.mem[0x8008] = 0x00;
    bus.mem[0x8009] = 0x03;
    bus.mem[0x0300] = 0x0F;
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x03);
    assert_eq!(cpu.x, 0x03);
    assert_eq!(cpu.sp, 0x03);
}

#[test]
fn unofficial_nops_consume_operands() {
    let (mut cpu, mut bus) = boot(&[0x04, 0x10, 0x0C, 0x00, 0x02, 0x80, 0x01, 0x1A]);
    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.pc, 0x8008);
    assert_eq!(cpu.a, 0);
}
