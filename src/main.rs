// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use kinect_sandbox::backends::{self, SensorBackendType};
use kinect_sandbox::constants::{FATAL_EXIT_CODE, app_version};
use kinect_sandbox::errors::{AppError, AppResult};
use kinect_sandbox::{Config, app};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

mod cli;

#[derive(Parser)]
#[command(name = "kinect-sandbox")]
#[command(about = "Project Kinect colour or depth images through a calibrated quad")]
#[command(version = app_version())]
#[command(subcommand_required = false)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Sensor backend (auto, freedepth, v4l2, synthetic)
    #[arg(short, long, global = true)]
    backend: Option<SensorBackendType>,

    /// Sensor index (from 'kinect-sandbox list')
    #[arg(short, long, global = true)]
    device: Option<usize>,

    /// Decorated window instead of a borderless projector window
    #[arg(long, global = true)]
    windowed: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Open the projector window (default)
    Run,

    /// List detected sensors
    List,
}

fn main() {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=kinect_sandbox=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli),
        Commands::List => cli::list_sensors(cli.backend.unwrap_or_default()),
    };

    if let Err(e) = result {
        error!(error = %e, "Fatal error");
        eprintln!("Fatal error: {}", e);
        std::process::exit(FATAL_EXIT_CODE);
    }
}

/// Configuration file with command-line overrides applied
fn load_config(cli: &Cli) -> AppResult<Config> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.sensor.backend = backend;
    }
    if cli.device.is_some() {
        config.sensor.device_index = cli.device;
    }
    if cli.windowed {
        config.window.borderless = false;
    }
    Ok(config)
}

fn run(cli: &Cli) -> AppResult<()> {
    let config = load_config(cli)?;
    info!(version = app_version(), backend = %config.sensor.backend, "Starting");

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|e| AppError::Other(format!("Failed to install Ctrl+C handler: {}", e)))?;

    let source = backends::open_sensor(&config.sensor_options())?;
    info!(source = %source.description(), "Sensor opened");

    app::window::run(config.window.clone(), config.initial_state(), source, interrupt)
}
