// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use multicam::backends::camera::types::{DeviceId, PlatformType};
use multicam::constants::DEFAULT_LOG_FILTER;
use multicam::{Config, PairingPolicy};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "multicam")]
#[command(about = "Live preview from several cameras at once")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: ~/.config/multicam/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Camera platform, overrides the config file
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Stream every paired camera into its own preview surface (default)
    Preview {
        /// Number of render targets
        #[arg(short, long)]
        targets: Option<usize>,

        /// Stop after this many seconds (default: until Ctrl+C)
        #[arg(short, long)]
        duration: Option<u64>,

        /// How cameras are paired with targets
        #[arg(short, long, value_enum)]
        pairing: Option<PairingArg>,

        /// Pair these camera ids in order (repeatable)
        #[arg(long = "device")]
        devices: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Simulated,
    V4l2,
}

#[derive(Clone, Copy, ValueEnum)]
enum PairingArg {
    /// First cameras in enumeration order
    First,
    /// A built-in camera, then an external one
    BuiltInExternal,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=multicam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = match backend {
            BackendArg::Simulated => PlatformType::Simulated,
            BackendArg::V4l2 => PlatformType::V4l2,
        };
    }

    match cli.command {
        Some(Commands::List) => cli::list_cameras(&config),
        Some(Commands::Preview {
            targets,
            duration,
            pairing,
            devices,
        }) => {
            if let Some(targets) = targets {
                config.targets = targets;
            }
            if let Some(pairing) = pairing {
                config.pairing = match pairing {
                    PairingArg::First => PairingPolicy::FirstEnumerated,
                    PairingArg::BuiltInExternal => PairingPolicy::BuiltInThenExternal,
                };
            }
            if !devices.is_empty() {
                config.pairing = PairingPolicy::Explicit {
                    ids: devices.into_iter().map(DeviceId::from).collect(),
                };
            }
            cli::run_preview(&config, duration)
        }
        None => cli::run_preview(&config, None),
    }
}
