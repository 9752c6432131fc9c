//! deckview - capture card viewer CLI

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use deckview::audio::{AudioSpec, PacedSink};
use deckview::capture::{CaptureDriver, VirtualDriver};
use deckview::config::{Args, ViewerConfig};
use deckview::render::{HeadlessBackend, HeadlessDisplay, RenderLoop};
use deckview::Viewer;

fn main() -> Result<()> {
    let args = Args::parse();

    let config = ViewerConfig::load_or_default(args.config.as_deref())?;

    // Initialize logging
    init_logging(&args, &config)?;

    let driver = VirtualDriver::new(&config.virtual_devices);

    match &args.device {
        None => cmd_list(&driver),
        Some(name) => cmd_view(&driver, name, &config, args.frames),
    }
}

fn init_logging(args: &Args, config: &ViewerConfig) -> Result<()> {
    let level = if args.level_overridden() {
        args.log_level().to_string()
    } else {
        config.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if let Some(log_file) = args.log.as_deref().or(config.log_file()) {
        let file = std::fs::File::create(log_file)?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// List available capture devices
fn cmd_list(driver: &dyn CaptureDriver) -> Result<()> {
    let devices = driver.devices()?;

    if devices.is_empty() {
        println!("No capture devices found.");
        return Ok(());
    }

    for device in &devices {
        println!("Device {}: {}", device.index, device);
    }

    Ok(())
}

/// Open a device and view it until the window closes or Ctrl+C
fn cmd_view(driver: &dyn CaptureDriver, name: &str, config: &ViewerConfig, frames: Option<u64>) -> Result<()> {
    let device = match driver.open(name) {
        Ok(device) => device,
        Err(e) => {
            error!("Failed to open {}: {}", name, e);
            return Err(e.into());
        }
    };

    let mut viewer = Viewer::init(device, config, |spec: &AudioSpec| PacedSink::open(spec))?;

    // Setup Ctrl+C / SIGTERM handler
    let stop = viewer.stop_flag();
    ctrlc::set_handler(move || {
        println!("\nReceived stop signal, stopping...");
        stop.store(true, Ordering::SeqCst);
    })?;

    let mut display = HeadlessDisplay::new(config.window_width, config.window_height, config.refresh_hz);
    if let Some(limit) = frames {
        display = display.with_frame_limit(limit);
    }

    let mut render = RenderLoop::new(
        display,
        HeadlessBackend::new(),
        viewer.frames(),
        config.brightness_step,
        viewer.stop_flag(),
    )?;

    println!("Viewing {}. Press Ctrl+C to stop.", name);

    let stats = viewer.run(&mut render)?;
    info!("Rendered {} frames", stats.frames_drawn);

    println!("Bye");
    Ok(())
}
