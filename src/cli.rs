// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanning
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Scanning from a camera or a virtual camera
//! - Decoding a single image file

use crate::ScanArgs;
use codescan::config::{self, load_options};
use codescan::{
    MediaCaptureProvider, OnError, OnResult, QrDetector, ScanResult, Scanner, ScannerError,
    ScannerOptions, V4l2Provider, VirtualCameraProvider, VideoSurface,
};
use futures::StreamExt;
use futures::channel::mpsc;
use std::path::PathBuf;
use std::sync::Arc;

/// Events delivered to the scan command's main loop
enum ScanEvent {
    Found(ScanResult),
    Failed(ScannerError),
    Interrupted,
}

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let scanner = Scanner::new(V4l2Provider::new(), QrDetector::new(), ScannerOptions::default())?;

    let rt = tokio::runtime::Runtime::new()?;
    let cameras = rt.block_on(scanner.list_cameras());

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        match camera.facing {
            Some(facing) => println!("  {}  {} ({})", camera.id, camera.label, facing),
            None => println!("  {}  {}", camera.id, camera.label),
        }
    }

    Ok(())
}

/// Scan from a camera until a code is found (or Ctrl+C with `--continuous`)
pub fn scan(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = scan_options(&args)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match args.virtual_file.clone() {
            Some(path) => {
                let provider = VirtualCameraProvider::from_file(path);
                run_scan(Scanner::new(provider, QrDetector::new(), options)?, &args).await
            }
            None => {
                let scanner = Scanner::new(V4l2Provider::new(), QrDetector::new(), options)?;
                run_scan(scanner, &args).await
            }
        }
    })
}

/// Decode a single image file
pub fn decode_file(
    file: PathBuf,
    raw: bool,
    json: bool,
    try_harder: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ScannerOptions {
        auto_normalize: !raw,
        try_harder,
        ..Default::default()
    };
    let scanner = Scanner::new(V4l2Provider::new(), QrDetector::new(), options)?;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(scanner.scan_image(&file))?;
    print_result(&result, json)
}

/// Config file values with command line overrides applied
fn scan_options(args: &ScanArgs) -> Result<ScannerOptions, Box<dyn std::error::Error>> {
    let mut options = match &args.config {
        Some(path) => load_options(path)?,
        None => match config::default_config_path().filter(|p| p.exists()) {
            Some(path) => load_options(&path)?,
            None => ScannerOptions::default(),
        },
    };

    if let Some(fps) = args.fps {
        options.fps = fps;
    }
    if let Some(region) = args.region {
        options.target_region = Some(region);
    }
    if !args.formats.is_empty() {
        options.formats = Some(args.formats.clone());
    }
    options.continuous |= args.continuous;
    options.try_harder |= args.try_harder;
    if args.raw {
        options.auto_normalize = false;
    }

    Ok(options)
}

async fn run_scan<P: MediaCaptureProvider>(
    scanner: Scanner<P, QrDetector>,
    args: &ScanArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (events_tx, mut events) = mpsc::unbounded();

    // Set up Ctrl+C handler
    let interrupt_tx = events_tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.unbounded_send(ScanEvent::Interrupted);
    })?;

    let result_tx = events_tx.clone();
    let on_result: OnResult = Arc::new(move |result: ScanResult| {
        let _ = result_tx.unbounded_send(ScanEvent::Found(result));
    });
    let on_error: OnError = Arc::new(move |err: ScannerError| {
        let _ = events_tx.unbounded_send(ScanEvent::Failed(err));
    });

    let surface = VideoSurface::new();
    match &args.device {
        Some(device) => {
            scanner
                .switch_camera(device, &surface, on_result, Some(on_error))
                .await?
        }
        None => scanner.start(&surface, on_result, Some(on_error)).await?,
    }

    let continuous = scanner.options().continuous();
    if continuous {
        eprintln!("Scanning... (press Ctrl+C to stop)");
    } else {
        eprintln!("Scanning...");
    }

    while let Some(event) = events.next().await {
        match event {
            ScanEvent::Found(result) => {
                print_result(&result, args.json)?;
                if !continuous {
                    break;
                }
            }
            ScanEvent::Failed(err @ ScannerError::Acquisition(_)) => {
                scanner.stop();
                return Err(err.into());
            }
            ScanEvent::Failed(err) => eprintln!("Warning: {}", err),
            ScanEvent::Interrupted => {
                eprintln!("Stopping...");
                break;
            }
        }
    }

    scanner.stop();
    Ok(())
}

fn print_result(result: &ScanResult, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(result)?);
    } else {
        println!("{}", result.text());
    }
    Ok(())
}
