//! # Newton Station Binary
//!
//! Brings up the camera and motor axes described by a station
//! configuration, supervises them until interrupted, then halts every axis
//! and stops the camera.
//!
//! # Usage
//!
//! ```bash
//! # Run against the simulation drivers
//! newton_hal --config config/station.toml --simulate
//!
//! # Override the driver of every device
//! newton_hal --config config/station.toml --driver simulation
//!
//! # Save the first frame and log verbosely
//! newton_hal -c config/station.toml -s -v --snapshot /tmp/first.png
//! ```

use clap::Parser;
use newton_common::config::{LogLevel, StationConfig};
use newton_common::consts::{DEFAULT_CONFIG_PATH, STATION_SERVICE_NAME};
use newton_hal::{DriverRegistry, Station};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Newton Station - camera acquisition and fieldbus drive control
#[derive(Parser, Debug)]
#[command(name = "newton_hal")]
#[command(author = "Newton Laboratories")]
#[command(version)]
#[command(about = "Camera acquisition and CiA 402 drive control with pluggable drivers")]
#[command(long_about = None)]
struct Args {
    /// Path to the station configuration file (station.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force the simulation drivers for every device
    #[arg(short = 's', long)]
    simulate: bool,

    /// Use this driver for every device (ignored with --simulate)
    #[arg(short, long)]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Save the first captured frame to this path
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Station startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The configured level seeds the filter, so load before installing it.
    let loaded = StationConfig::load_validated(&args.config);
    let level = loaded
        .as_ref()
        .map_or(LogLevel::Info, |config| config.shared.log_level);
    setup_tracing(&args, level);

    info!(
        "Newton {} v{} starting...",
        STATION_SERVICE_NAME,
        env!("CARGO_PKG_VERSION")
    );

    let mut config = loaded?;
    info!("Loaded configuration from {:?}", args.config);

    let driver_override = if args.simulate {
        info!("Simulation mode enabled (exclusive)");
        Some("simulation".to_string())
    } else {
        args.driver.clone()
    };
    if let Some(driver) = driver_override {
        if let Some(camera) = config.camera.as_mut() {
            camera.driver = driver.clone();
        }
        for axis in &mut config.axes {
            axis.driver = driver.clone();
        }
    }

    let registry = DriverRegistry::with_builtin_drivers();
    let mut station = Station::new(config, &registry)?;

    // Setup signal handler.
    let running = station.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    if let Err(e) = station.bring_up() {
        station.shutdown();
        return Err(e.into());
    }

    station.run(args.snapshot.clone());
    station.shutdown();

    info!("Newton {} shutdown complete", STATION_SERVICE_NAME);
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match configured {
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
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
