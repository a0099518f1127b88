//! # Lockbox CLI
//!
//! Inspect and configure the lockbox register blocks from a shell.
//!
//! # Usage
//!
//! ```bash
//! # Print every loop and limit parameter
//! lockbox --config /etc/lockbox/lockbox.toml status
//!
//! # Same, as JSON, without touching hardware
//! lockbox --simulate --json status
//!
//! # Persist and restore the parameter set
//! lockbox save params.toml
//! lockbox load params.toml
//!
//! # Slow analog pins and fast channel readback
//! lockbox -v pins
//! ```

#![deny(warnings)]

use clap::{Parser, Subcommand};
use lockbox_common::config::{ConfigError, ConfigLoader, LockboxConfig, LogLevel};
use lockbox_common::consts::DEFAULT_CONFIG_PATH;
use lockbox_common::types::{AnalogPin, Channel};
use lockbox_hal::{Lockbox, LockboxSnapshot};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Lockbox - PID lockbox register control
#[derive(Parser, Debug)]
#[command(name = "lockbox")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Configure and inspect the PID lockbox register blocks")]
#[command(long_about = None)]
struct Args {
    /// Path to the lockbox configuration file (lockbox.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Use in-memory register blocks instead of the memory device
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and reports in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every loop and limit parameter (default)
    Status,
    /// Capture all parameters into a TOML file
    Save {
        /// Destination file
        file: PathBuf,
    },
    /// Apply all parameters from a TOML file
    Load {
        /// Source file
        file: PathBuf,
    },
    /// Print slow analog pin values and fast channel voltages
    Pins,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("lockbox failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = LockboxConfig::load(&args.config);
    let log_level = loaded
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("Lockbox v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(config) => {
            info!("Loaded configuration from {:?}", args.config);
            config
        }
        Err(ConfigError::FileNotFound) => {
            warn!("No configuration at {:?}, using defaults", args.config);
            LockboxConfig::default()
        }
        Err(e) => return Err(e.into()),
    };
    if args.simulate {
        info!("Simulation mode enabled");
        config.mapping.simulate = true;
    }
    config.validate()?;

    let lockbox = Lockbox::open(&config)?;

    match args.command.unwrap_or(Command::Status) {
        Command::Status => {
            let snapshot = LockboxSnapshot::capture(&lockbox)?;
            print_report(&snapshot, args.json)?;
        }
        Command::Save { file } => {
            LockboxSnapshot::capture(&lockbox)?.save(&file)?;
        }
        Command::Load { file } => {
            LockboxSnapshot::load(&file)?.apply(&lockbox)?;
        }
        Command::Pins => {
            let report = PinReport::read(&lockbox)?;
            print_report(&report, args.json)?;
        }
    }

    Ok(())
}

/// Slow pin and fast channel readings, for `lockbox pins`.
#[derive(Debug, Serialize)]
struct PinReport {
    pins: Vec<PinReading>,
    fast: Vec<FastReading>,
}

#[derive(Debug, Serialize)]
struct PinReading {
    pin: AnalogPin,
    volts: f64,
}

#[derive(Debug, Serialize)]
struct FastReading {
    channel: Channel,
    input_volts: f64,
    output_volts: f64,
}

impl PinReport {
    fn read(lockbox: &Lockbox) -> Result<Self, lockbox_common::error::LockboxError> {
        let ams = lockbox.ams();
        let pins = AnalogPin::ALL
            .into_iter()
            .map(|pin| Ok(PinReading { pin, volts: ams.pin_value(pin)? }))
            .collect::<Result<_, lockbox_common::error::LockboxError>>()?;
        let fast = Channel::ALL
            .into_iter()
            .map(|channel| {
                Ok(FastReading {
                    channel,
                    input_volts: ams.in_voltage(channel)?,
                    output_volts: ams.out_voltage(channel)?,
                })
            })
            .collect::<Result<_, lockbox_common::error::LockboxError>>()?;
        Ok(Self { pins, fast })
    }
}

/// Print a report as pretty JSON or TOML.
fn print_report<T: Serialize>(report: &T, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = if json {
        serde_json::to_string_pretty(report)?
    } else {
        toml::to_string_pretty(report)?
    };
    println!("{text}");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match log_level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
