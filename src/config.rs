//! System configuration: clock rate, scheduler slicing, and audio output rate.

/// Video region. Only NTSC timing is emulated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// 60.0988 Hz, 1,789,773 Hz CPU.
    #[default]
    Ntsc,
}

impl Region {
    /// CPU clock in Hz.
    #[must_use]
    pub const fn cpu_hz(self) -> u32 {
        match self {
            Self::Ntsc => 1_789_773,
        }
    }

    /// Frames per second.
    #[must_use]
    pub const fn frame_rate(self) -> f64 {
        match self {
            Self::Ntsc => 60.0988,
        }
    }

    /// CPU cycles in one frame, rounded down.
    #[must_use]
    pub fn cycles_per_frame(self) -> u32 {
        (f64::from(self.cpu_hz()) / self.frame_rate()) as u32
    }
}

/// Scheduler and audio settings for [`crate::system::System`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemConfig {
    pub region: Region,
    /// Reference clock used to turn elapsed wall-clock time into a cycle budget.
    pub cpu_clock_hz: f64,
    /// Upper bound on one step's budget, so a stalled host does not trigger a catch-up burst.
    pub max_cycles_per_step: u32,
    /// Share of the budget executed after vblank starts. The rest runs before it.
    /// Values outside `0.0..=1.0` are clamped.
    pub vblank_fraction: f64,
    /// APU output sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let region = Region::Ntsc;
        Self {
            region,
            cpu_clock_hz: f64::from(region.cpu_hz()),
            max_cycles_per_step: region.cycles_per_frame() * 2,
            vblank_fraction: 0.08,
            sample_rate: 44_100,
        }
    }
}
