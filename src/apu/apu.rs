//! 2A03 APU (Audio Processing Unit) implementation.
//!
//! Five channels (pulse×2, triangle, noise, DMC), the [frame counter](https://www.nesdev.org/wiki/APU_Frame_Counter)
//! (4-step or 5-step), and the non-linear [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer).
//! Registers $4000–$4013, $4015, $4017. See [APU registers](https://www.nesdev.org/wiki/APU_registers).
//!
//! ## Timing
//!
//! - The APU is advanced once per CPU instruction with that instruction's cycle count.
//! - Pulse timers are clocked every 2 CPU cycles; triangle, noise, and DMC every CPU cycle.
//! - Envelopes/linear counter (quarter frame) and length/sweep (half frame) follow the frame counter.
//! - DMC sample fetches are not performed: the output unit only ever sees silent bits, while the
//!   byte counter still drains at the selected rate so status and IRQ behave.

use tracing::trace;

use crate::config::SystemConfig;

/// Length counter lookup table: 5-bit index from register → count. APU_Length_Counter.
pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Noise channel period table (NTSC): 4-bit index from $400E → period in CPU cycles.
const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// Pulse duty sequences (8 steps). Duty 0=12.5%, 1=25%, 2=50%, 3=25% negated.
const PULSE_DUTY: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// Triangle 32-step waveform: 15 down to 0, then 0 up to 15.
const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
    13, 14, 15,
];

/// DMC rate table (NTSC): 4-bit index from $4010 → CPU cycles per output bit.
const DMC_RATE_TABLE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

/// 4-step frame counter: resets every 29830 CPU cycles.
const FRAME_4STEP_RESET: u32 = 29830;
/// 5-step frame counter: no IRQ; resets every 37282 cycles.
const FRAME_5STEP_RESET: u32 = 37282;

const STATUS_FRAME_IRQ: u8 = 0x40;
const STATUS_DMC_IRQ: u8 = 0x80;

/// Common per-channel interface: advance the timer one tick, report the current waveform value.
pub trait Channel {
    /// Advance by one timer clock.
    fn process(&mut self);
    /// Current output level fed to the mixer.
    fn sample(&self) -> u8;
    /// Length counter (or DMC byte counter) is non-zero.
    fn active(&self) -> bool;
    /// Enable bit from $4015. Disabling silences the channel immediately.
    fn set_enabled(&mut self, enabled: bool);
}

// -----------------------------------------------------------------------------
// Envelope and length counter (shared by pulse and noise)
// -----------------------------------------------------------------------------

/// Volume envelope: either a constant volume or a 15→0 decay clocked at quarter frames.
#[derive(Default)]
struct Envelope {
    start: bool,
    looping: bool,
    constant: bool,
    volume: u8,
    divider: u8,
    decay: u8,
}

impl Envelope {
    /// Bits 0–5 of $4000/$4004/$400C.
    fn write(&mut self, data: u8) {
        self.looping = data & 0x20 != 0;
        self.constant = data & 0x10 != 0;
        self.volume = data & 0x0F;
    }

    fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.volume;
        } else if self.divider > 0 {
            self.divider -= 1;
        } else {
            self.divider = self.volume;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looping {
                self.decay = 15;
            }
        }
    }

    fn output(&self) -> u8 {
        if self.constant { self.volume } else { self.decay }
    }
}

#[derive(Default)]
struct LengthCounter {
    enabled: bool,
    halt: bool,
    value: u8,
}

impl LengthCounter {
    /// Load from the top 5 bits of a length-load register; ignored while the channel is disabled.
    fn load(&mut self, data: u8) {
        if self.enabled {
            self.value = LENGTH_TABLE[(data >> 3) as usize];
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.value = 0;
        }
    }

    fn clock(&mut self) {
        if !self.halt && self.value > 0 {
            self.value -= 1;
        }
    }

    fn active(&self) -> bool {
        self.value > 0
    }
}

// -----------------------------------------------------------------------------
// Pulse channel ($4000–$4003 = pulse 1, $4004–$4007 = pulse 2)
// -----------------------------------------------------------------------------

/// Pulse channel: square wave with duty, envelope, sweep, and length counter.
#[derive(Default)]
struct Pulse {
    /// Pulse 1 negates with one's complement, pulse 2 with two's complement.
    ones_complement: bool,
    duty: u8,
    envelope: Envelope,
    length: LengthCounter,
    sweep_enable: bool,
    sweep_period: u8,
    sweep_negate: bool,
    sweep_shift: u8,
    sweep_divider: u8,
    sweep_reload: bool,
    timer_period: u16,
    timer: u16,
    sequencer_step: u8,
}

impl Pulse {
    fn new(ones_complement: bool) -> Self {
        Self {
            ones_complement,
            ..Self::default()
        }
    }

    /// $4000/$4004: duty, length halt, constant volume, volume/envelope period.
    fn write_control(&mut self, data: u8) {
        self.duty = (data >> 6) & 3;
        self.length.halt = data & 0x20 != 0;
        self.envelope.write(data);
    }

    /// $4001/$4005: sweep enable, period, negate, shift.
    fn write_sweep(&mut self, data: u8) {
        self.sweep_enable = data & 0x80 != 0;
        self.sweep_period = (data >> 4) & 7;
        self.sweep_negate = data & 0x08 != 0;
        self.sweep_shift = data & 7;
        self.sweep_reload = true;
    }

    /// $4002/$4006: timer low 8 bits.
    fn write_timer_low(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x0700) | data as u16;
    }

    /// $4003/$4007: length load, timer high 3 bits; restarts envelope and sequencer.
    fn write_timer_high(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | ((data & 7) as u16) << 8;
        self.length.load(data);
        self.envelope.start = true;
        self.sequencer_step = 0;
    }

    /// Period the sweep unit is steering towards.
    fn sweep_target(&self) -> u16 {
        let delta = self.timer_period >> self.sweep_shift;
        if self.sweep_negate {
            let delta = if self.ones_complement { delta + 1 } else { delta };
            self.timer_period.saturating_sub(delta)
        } else {
            self.timer_period + delta
        }
    }

    fn muted(&self) -> bool {
        self.timer_period < 8 || self.sweep_target() > 0x7FF
    }

    fn clock_sweep(&mut self) {
        if self.sweep_divider == 0 && self.sweep_enable && self.sweep_shift > 0 && !self.muted() {
            self.timer_period = self.sweep_target();
        }
        if self.sweep_divider == 0 || self.sweep_reload {
            self.sweep_divider = self.sweep_period;
            self.sweep_reload = false;
        } else {
            self.sweep_divider -= 1;
        }
    }
}

impl Channel for Pulse {
    /// One APU cycle (every second CPU cycle).
    fn process(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
        } else {
            self.timer = self.timer_period;
            self.sequencer_step = (self.sequencer_step + 1) & 7;
        }
    }

    fn sample(&self) -> u8 {
        if !self.length.active()
            || self.muted()
            || PULSE_DUTY[self.duty as usize][self.sequencer_step as usize] == 0
        {
            return 0;
        }
        self.envelope.output()
    }

    fn active(&self) -> bool {
        self.length.active()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }
}

// -----------------------------------------------------------------------------
// Triangle channel ($4008–$400B)
// -----------------------------------------------------------------------------

/// Triangle channel: 32-step ramp, linear counter + length counter, no volume control.
#[derive(Default)]
struct Triangle {
    length: LengthCounter,
    control: bool,
    linear_load: u8,
    linear_counter: u8,
    linear_reload: bool,
    timer_period: u16,
    timer: u16,
    sequencer_step: u8,
}

impl Triangle {
    /// $4008: control (length halt), linear counter load value.
    fn write_linear(&mut self, data: u8) {
        self.control = data & 0x80 != 0;
        self.length.halt = self.control;
        self.linear_load = data & 0x7F;
    }

    /// $400A: timer low 8 bits.
    fn write_timer_low(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x0700) | data as u16;
    }

    /// $400B: length load, timer high 3 bits; sets the linear reload flag.
    fn write_timer_high(&mut self, data: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | ((data & 7) as u16) << 8;
        self.length.load(data);
        self.linear_reload = true;
    }

    fn clock_linear(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_load;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }
}

impl Channel for Triangle {
    fn process(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.timer_period;
        if self.length.active() && self.linear_counter > 0 {
            self.sequencer_step = (self.sequencer_step + 1) & 31;
        }
    }

    fn sample(&self) -> u8 {
        // Ultrasonic periods are silenced instead of aliasing.
        if self.timer_period < 2 {
            return 0;
        }
        TRIANGLE_SEQUENCE[self.sequencer_step as usize]
    }

    fn active(&self) -> bool {
        self.length.active()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }
}

// -----------------------------------------------------------------------------
// Noise channel ($400C–$400F)
// -----------------------------------------------------------------------------

/// Noise channel: 15-bit LFSR; mode bit selects tap 6 (short, metallic) instead of tap 1.
struct Noise {
    envelope: Envelope,
    length: LengthCounter,
    mode: bool,
    period: u16,
    timer: u16,
    shift: u16,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            mode: false,
            period: NOISE_PERIOD_TABLE[0],
            timer: 0,
            shift: 1,
        }
    }
}

impl Noise {
    /// $400C: length halt, constant volume, volume/envelope.
    fn write_control(&mut self, data: u8) {
        self.length.halt = data & 0x20 != 0;
        self.envelope.write(data);
    }

    /// $400E: mode (bit 7), period index (bits 0–3).
    fn write_period(&mut self, data: u8) {
        self.mode = data & 0x80 != 0;
        self.period = NOISE_PERIOD_TABLE[(data & 0x0F) as usize];
    }

    /// $400F: length load; restarts envelope.
    fn write_length(&mut self, data: u8) {
        self.length.load(data);
        self.envelope.start = true;
    }
}

impl Channel for Noise {
    fn process(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.period;
        let tap = if self.mode { 6 } else { 1 };
        let feedback = (self.shift & 1) ^ ((self.shift >> tap) & 1);
        self.shift = (self.shift >> 1) | (feedback << 14);
    }

    fn sample(&self) -> u8 {
        if !self.length.active() || self.shift & 1 != 0 {
            return 0;
        }
        self.envelope.output()
    }

    fn active(&self) -> bool {
        self.length.active()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }
}

// -----------------------------------------------------------------------------
// DMC channel ($4010–$4013)
// Sample address $C000 + (byte*64); length (byte*16)+1.
// -----------------------------------------------------------------------------

#[derive(Default)]
struct Dmc {
    irq_enable: bool,
    irq: bool,
    loop_flag: bool,
    rate: u16,
    timer: u16,
    output_level: u8,
    sample_address: u16,
    sample_length: u16,
    current_address: u16,
    bytes_remaining: u16,
    bits_remaining: u8,
}

impl Dmc {
    /// $4010: IRQ enable (bit 7), loop (bit 6), rate index (bits 0–3).
    fn write_control(&mut self, data: u8) {
        self.irq_enable = data & 0x80 != 0;
        if !self.irq_enable {
            self.irq = false;
        }
        self.loop_flag = data & 0x40 != 0;
        self.rate = DMC_RATE_TABLE[(data & 0x0F) as usize];
    }

    /// $4011: direct load of the 7-bit output level.
    fn write_direct(&mut self, data: u8) {
        self.output_level = data & 0x7F;
    }

    /// $4012: sample address = $C000 + value × 64.
    fn write_address(&mut self, data: u8) {
        self.sample_address = 0xC000 + (data as u16) * 64;
    }

    /// $4013: sample length = value × 16 + 1 bytes.
    fn write_length(&mut self, data: u8) {
        self.sample_length = (data as u16) * 16 + 1;
    }

    fn restart(&mut self) {
        self.current_address = self.sample_address;
        self.bytes_remaining = self.sample_length;
    }

    /// Account for one consumed sample byte (the fetch itself is not emulated).
    fn consume_byte(&mut self) {
        if self.bytes_remaining == 0 {
            return;
        }
        self.current_address = self.current_address.checked_add(1).unwrap_or(0x8000);
        self.bytes_remaining -= 1;
        if self.bytes_remaining == 0 {
            if self.loop_flag {
                self.restart();
            } else if self.irq_enable {
                self.irq = true;
            }
        }
    }
}

impl Channel for Dmc {
    fn process(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.rate.saturating_sub(1);

        // The shift register only ever holds silent bits, so the level holds.
        if self.bits_remaining > 0 {
            self.bits_remaining -= 1;
        }
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            self.consume_byte();
        }
    }

    fn sample(&self) -> u8 {
        self.output_level
    }

    fn active(&self) -> bool {
        self.bytes_remaining > 0
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.irq = false;
        if !enabled {
            self.bytes_remaining = 0;
        } else if self.bytes_remaining == 0 {
            self.restart();
        }
    }
}

// -----------------------------------------------------------------------------
// Mixer
// -----------------------------------------------------------------------------

/// Non-linear mix of all five channel levels, scaled into `0..=i16::MAX`.
///
/// The output is unipolar like the console's DAC: silence is exactly 0 and full scale is
/// about `i16::MAX`, so the stream carries a DC offset proportional to the active levels.
/// Hosts that want a centred signal should high-pass it.
pub fn mix(pulse1: u8, pulse2: u8, triangle: u8, noise: u8, dmc: u8) -> i16 {
    let pulse_sum = f32::from(pulse1) + f32::from(pulse2);
    let pulse_out = if pulse_sum > 0.0 {
        95.88 / (8128.0 / pulse_sum + 100.0)
    } else {
        0.0
    };

    let tnd_sum =
        f32::from(triangle) / 8227.0 + f32::from(noise) / 12241.0 + f32::from(dmc) / 22638.0;
    let tnd_out = if tnd_sum > 0.0 {
        159.79 / (1.0 / tnd_sum + 100.0)
    } else {
        0.0
    };

    ((pulse_out + tnd_out) * f32::from(i16::MAX)).clamp(0.0, f32::from(i16::MAX)) as i16
}

// -----------------------------------------------------------------------------
// APU: register dispatch, frame counter, tick, sample buffer
// -----------------------------------------------------------------------------

/// APU state: pulse×2, triangle, noise, DMC; frame counter; IRQ flags; output sample buffer.
/// `tick(cycles)` advances the frame counter and channels and pushes samples when due.
pub struct APU {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    frame_irq: bool,
    frame_irq_inhibit: bool,
    frame_4step: bool,
    frame_cycle: u32,
    /// Parity of the CPU cycle; pulse timers run on odd ones.
    odd_cycle: bool,
    cycles_per_sample: f64,
    sample_phase: f64,
    sample_buffer: Vec<i16>,
}

impl Default for APU {
    fn default() -> Self {
        Self::new()
    }
}

impl APU {
    pub fn new() -> Self {
        let config = SystemConfig::default();
        Self::with_clock(config.cpu_clock_hz, config.sample_rate)
    }

    /// APU whose output resamples a `cpu_clock_hz` cycle stream down to `sample_rate` Hz.
    pub fn with_clock(cpu_clock_hz: f64, sample_rate: u32) -> Self {
        Self {
            pulse1: Pulse::new(true),
            pulse2: Pulse::new(false),
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc {
                rate: DMC_RATE_TABLE[0],
                ..Dmc::default()
            },
            frame_irq: false,
            frame_irq_inhibit: false,
            frame_4step: true,
            frame_cycle: 0,
            odd_cycle: false,
            cycles_per_sample: cpu_clock_hz / f64::from(sample_rate.max(1)),
            sample_phase: 0.0,
            sample_buffer: Vec::new(),
        }
    }

    /// Power-on state with the same output rate.
    pub fn reset(&mut self) {
        let cycles_per_sample = self.cycles_per_sample;
        *self = Self::new();
        self.cycles_per_sample = cycles_per_sample;
    }

    /// Write to APU registers $4000–$4013, $4015 (enable), and $4017 (frame counter).
    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000 => self.pulse1.write_control(data),
            0x4001 => self.pulse1.write_sweep(data),
            0x4002 => self.pulse1.write_timer_low(data),
            0x4003 => self.pulse1.write_timer_high(data),
            0x4004 => self.pulse2.write_control(data),
            0x4005 => self.pulse2.write_sweep(data),
            0x4006 => self.pulse2.write_timer_low(data),
            0x4007 => self.pulse2.write_timer_high(data),
            0x4008 => self.triangle.write_linear(data),
            0x400A => self.triangle.write_timer_low(data),
            0x400B => self.triangle.write_timer_high(data),
            0x400C => self.noise.write_control(data),
            0x400E => self.noise.write_period(data),
            0x400F => self.noise.write_length(data),
            0x4010 => self.dmc.write_control(data),
            0x4011 => self.dmc.write_direct(data),
            0x4012 => self.dmc.write_address(data),
            0x4013 => self.dmc.write_length(data),
            0x4015 => {
                self.pulse1.set_enabled(data & 0x01 != 0);
                self.pulse2.set_enabled(data & 0x02 != 0);
                self.triangle.set_enabled(data & 0x04 != 0);
                self.noise.set_enabled(data & 0x08 != 0);
                self.dmc.set_enabled(data & 0x10 != 0);
            }
            0x4017 => {
                self.frame_4step = data & 0x80 == 0;
                self.frame_irq_inhibit = data & 0x40 != 0;
                self.frame_cycle = 0;
                if self.frame_irq_inhibit {
                    self.frame_irq = false;
                }
                // Selecting 5-step mode clocks a quarter and half frame immediately.
                if !self.frame_4step {
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                }
            }
            _ => trace!("ignored APU write ${:02X} to ${:04X}", data, addr),
        }
    }

    /// Read $4015: bits 0–3 = length counter > 0 per channel; bit 4 = DMC active; bit 6 = frame IRQ;
    /// bit 7 = DMC IRQ. Reading clears both interrupt flags.
    pub fn read_status(&mut self) -> u8 {
        let mut r = 0;
        r |= self.pulse1.active() as u8;
        r |= (self.pulse2.active() as u8) << 1;
        r |= (self.triangle.active() as u8) << 2;
        r |= (self.noise.active() as u8) << 3;
        r |= (self.dmc.active() as u8) << 4;
        if self.frame_irq {
            r |= STATUS_FRAME_IRQ;
        }
        if self.dmc.irq {
            r |= STATUS_DMC_IRQ;
        }
        self.frame_irq = false;
        self.dmc.irq = false;
        r
    }

    /// Frame or DMC interrupt is asserted.
    pub fn irq_pending(&self) -> bool {
        self.frame_irq || self.dmc.irq
    }

    /// Quarter frame: envelopes and triangle linear counter.
    fn clock_quarter_frame(&mut self) {
        self.pulse1.envelope.clock();
        self.pulse2.envelope.clock();
        self.noise.envelope.clock();
        self.triangle.clock_linear();
    }

    /// Half frame: length counters and sweep units.
    fn clock_half_frame(&mut self) {
        self.pulse1.length.clock();
        self.pulse2.length.clock();
        self.triangle.length.clock();
        self.noise.length.clock();
        self.pulse1.clock_sweep();
        self.pulse2.clock_sweep();
    }

    fn clock_frame_counter(&mut self) {
        self.frame_cycle += 1;
        match (self.frame_cycle, self.frame_4step) {
            (7457, _) | (22371, _) => self.clock_quarter_frame(),
            (14913, _) | (37281, false) => {
                self.clock_quarter_frame();
                self.clock_half_frame();
            }
            (29829, true) => {
                self.clock_quarter_frame();
                self.clock_half_frame();
                if !self.frame_irq_inhibit {
                    self.frame_irq = true;
                }
            }
            _ => {}
        }
        let reset = if self.frame_4step { FRAME_4STEP_RESET } else { FRAME_5STEP_RESET };
        if self.frame_cycle >= reset {
            self.frame_cycle = 0;
        }
    }

    /// Current mixer output for the five channel levels.
    pub fn output(&self) -> i16 {
        mix(
            self.pulse1.sample(),
            self.pulse2.sample(),
            self.triangle.sample(),
            self.noise.sample(),
            self.dmc.sample(),
        )
    }

    /// Advance by `cycles` CPU cycles: frame counter, channel timers, and sample output.
    pub fn tick(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock_frame_counter();

            if self.odd_cycle {
                self.pulse1.process();
                self.pulse2.process();
            }
            self.odd_cycle = !self.odd_cycle;
            self.triangle.process();
            self.noise.process();
            self.dmc.process();

            self.sample_phase += 1.0;
            if self.sample_phase >= self.cycles_per_sample {
                self.sample_phase -= self.cycles_per_sample;
                let sample = self.output();
                self.sample_buffer.push(sample);
            }
        }
    }

    /// Samples produced since the last drain.
    pub fn pending_samples(&self) -> usize {
        self.sample_buffer.len()
    }

    /// Take all buffered samples.
    pub fn drain_samples(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.sample_buffer)
    }

    /// Length counters of pulse 1, pulse 2, triangle, and noise, for observers.
    pub fn length_counters(&self) -> [u8; 4] {
        [
            self.pulse1.length.value,
            self.pulse2.length.value,
            self.triangle.length.value,
            self.noise.length.value,
        ]
    }

    /// Timer periods of pulse 1 and pulse 2, as steered by their sweep units.
    pub fn pulse_timer_periods(&self) -> [u16; 2] {
        [self.pulse1.timer_period, self.pulse2.timer_period]
    }

    pub fn triangle_linear_counter(&self) -> u8 {
        self.triangle.linear_counter
    }

    /// Noise LFSR state, for observers.
    pub fn noise_shift_register(&self) -> u16 {
        self.noise.shift
    }
}
