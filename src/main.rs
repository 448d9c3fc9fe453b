// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use codescan::{Symbology, TargetRegion};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "codescan")]
#[command(about = "Scan barcodes and QR codes from a camera or an image file")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Scan codes from a camera
    Scan(ScanArgs),

    /// Decode a single image file
    Decode {
        /// Image to decode
        file: PathBuf,

        /// Print the text exactly as decoded
        #[arg(long)]
        raw: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Spend extra passes on hard images
        #[arg(long)]
        try_harder: bool,
    },
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// Camera device to use (from 'codescan list')
    #[arg(short, long)]
    pub device: Option<String>,

    /// Stream an image file through a virtual camera instead
    #[arg(long = "virtual", value_name = "FILE")]
    pub virtual_file: Option<PathBuf>,

    /// Decode attempts per second
    #[arg(long)]
    pub fps: Option<f64>,

    /// Only scan a centered region, in percent (e.g. 60x40)
    #[arg(long, value_name = "WxH")]
    pub region: Option<TargetRegion>,

    /// Symbology to accept (repeatable, default: all supported)
    #[arg(long = "format", value_name = "NAME")]
    pub formats: Vec<Symbology>,

    /// Keep scanning after the first code
    #[arg(short, long)]
    pub continuous: bool,

    /// Print the text exactly as decoded
    #[arg(long)]
    pub raw: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Spend extra passes on hard frames
    #[arg(long)]
    pub try_harder: bool,

    /// Options file (default: ~/.config/codescan/config.json if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=codescan=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_cameras(),
        Commands::Scan(args) => cli::scan(args),
        Commands::Decode {
            file,
            raw,
            json,
            try_harder,
        } => cli::decode_file(file, raw, json, try_harder),
    }
}
