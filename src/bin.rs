use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{debug, info, warn};

use chip8_host::{logger, render, HostConfig};
use plum8::{disassemble, Context, Quirks, Scheduler, Synth};

/// Run a CHIP-8 program headless and print its final screen
#[derive(Parser, Debug)]
#[command(name = "chip8", version)]
struct Args {
    /// Program image to load at 0x200
    rom: PathBuf,

    /// TOML host configuration
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Quirks as `Name:bool,...`, replacing the configured ones
    #[arg(long, value_name = "QUIRKS")]
    quirks: Option<String>,

    /// Instructions per 60Hz frame
    #[arg(long, value_name = "N")]
    cycles: Option<usize>,

    /// Wall clock time to run for, unless the program exits first
    #[arg(long, default_value_t = 2.0)]
    seconds: f64,

    /// Print a disassembly instead of running
    #[arg(long, default_value_t = false)]
    disassemble: bool,

    /// Write a snapshot of the stopped machine to this file
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// More logging, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logger::init(args.verbose)?;

    let rom = fs::read(&args.rom)?;
    if args.disassemble {
        println!("{}", disassemble(&rom));
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => HostConfig::from_file(path)?,
        None => HostConfig::default(),
    };
    if let Some(quirks) = &args.quirks {
        config.quirks = quirks.parse::<Quirks>()?;
    }
    if let Some(cycles) = args.cycles {
        config.cycles_per_tick = cycles;
    }
    debug!("{:?}", config);

    let synth = Arc::new(Synth::new(config.sample_rate));
    let context = Context::new().with_sound(synth.clone());
    let mut scheduler = Scheduler::new(context, config.scheduler());
    scheduler.load(&rom, config.quirks)?;
    scheduler.run();

    let deadline = Instant::now() + Duration::from_secs_f64(args.seconds.max(0.0));
    while scheduler.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
        if let Some(samples) = synth.take_pending() {
            debug!("Beep of {} samples", samples.len());
        }
    }
    scheduler.pause();

    match scheduler.halt() {
        Some(halt) => info!("Stopped: {}", halt),
        None => info!("Still running after {}s", args.seconds),
    }
    print!("{}", render::ascii(&scheduler.display().next_frame(None)));

    if let Some(path) = &args.snapshot {
        match scheduler.snapshot() {
            Some(snapshot) => {
                fs::write(path, snapshot.to_bytes()?)?;
                info!("Snapshot written to {}", path.display());
            }
            None => warn!("No machine to snapshot"),
        }
    }
    Ok(())
}
