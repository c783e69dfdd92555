//! Famicore desktop frontend.
//!
//! Loads a cartridge, shows the composited frame in a window, plays the APU output, and maps
//! the keyboard to controller 1.
//! Usage: famicore <path/to/game.nes> [--scale N] [--paused] [--log-level LEVEL] [--mute]

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use famicore::{
    controller::Buttons,
    ppu::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
    system::System,
};
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};
use rodio::{OutputStream, Sink, buffer::SamplesBuffer};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Queued audio chunks beyond which new samples are dropped, so latency stays bounded.
const MAX_QUEUED_CHUNKS: usize = 4;

/// NES emulator
#[derive(Parser, Debug)]
#[command(name = "famicore")]
#[command(about = "An NES emulator", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Window scale factor (1, 2, 4, or 8)
    #[arg(short, long, default_value = "2")]
    scale: u8,

    /// Start paused (P toggles, N steps one instruction)
    #[arg(long)]
    paused: bool,

    /// Maximum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Disable audio output
    #[arg(long)]
    mute: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install logger")?;

    let mut system = System::new();
    system
        .load_rom(&args.rom)
        .with_context(|| format!("failed to load {}", args.rom.display()))?;
    system.set_paused(args.paused);

    let scale = match args.scale {
        0 | 1 => Scale::X1,
        2 | 3 => Scale::X2,
        4..=7 => Scale::X4,
        _ => Scale::X8,
    };
    let mut window = Window::new(
        "Famicore",
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        WindowOptions {
            scale,
            ..WindowOptions::default()
        },
    )
    .context("failed to create window")?;
    window.set_target_fps(60);

    // The stream must outlive the sink.
    let audio = if args.mute {
        None
    } else {
        match OutputStream::try_default() {
            Ok((stream, handle)) => match Sink::try_new(&handle) {
                Ok(sink) => Some((stream, sink)),
                Err(err) => {
                    warn!("audio disabled: {}", err);
                    None
                }
            },
            Err(err) => {
                warn!("audio disabled: {}", err);
                None
            }
        }
    };
    let sample_rate = system.config().sample_rate;

    let mut last_frame = Instant::now();
    while window.is_open() && !window.is_key_down(Key::Escape) {
        if window.is_key_pressed(Key::P, KeyRepeat::No) {
            let paused = !system.is_paused();
            system.set_paused(paused);
            info!("{}", if paused { "paused" } else { "resumed" });
        }
        if window.is_key_pressed(Key::N, KeyRepeat::Yes) {
            system.request_step();
        }
        system.set_buttons(read_buttons(&window).bits());

        let now = Instant::now();
        let elapsed = now - last_frame;
        last_frame = now;

        if let Err(err) = system.run_frame(elapsed) {
            error!("emulation stopped: {}", err);
            return Err(err).context("emulation stopped");
        }

        let samples = system.drain_samples();
        if let Some((_, sink)) = &audio {
            if !samples.is_empty() && sink.len() < MAX_QUEUED_CHUNKS {
                sink.append(SamplesBuffer::new(1, sample_rate, samples));
            }
        }

        window
            .update_with_buffer(system.composite_frame(), SCREEN_WIDTH, SCREEN_HEIGHT)
            .context("failed to update window")?;
    }

    Ok(())
}

/// Keyboard to controller 1: Z=A, X=B, Right Shift=Select, Enter=Start, arrows=D-pad.
fn read_buttons(window: &Window) -> Buttons {
    const KEYMAP: [(Key, Buttons); 8] = [
        (Key::Z, Buttons::A),
        (Key::X, Buttons::B),
        (Key::RightShift, Buttons::SELECT),
        (Key::Enter, Buttons::START),
        (Key::Up, Buttons::UP),
        (Key::Down, Buttons::DOWN),
        (Key::Left, Buttons::LEFT),
        (Key::Right, Buttons::RIGHT),
    ];

    KEYMAP
        .iter()
        .filter(|(key, _)| window.is_key_down(*key))
        .fold(Buttons::empty(), |acc, (_, button)| acc | *button)
}
