//! usbchar daemon
//!
//! Thin startup shell around the library: parse options, load the config,
//! probe the backing store, then run the character-device service loop. The
//! kernel registration itself is platform glue that receives the
//! [`Registration`] parameters and the [`DeviceOps`] handle built here.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use usbchar::config::{BackendKind, Config};
use usbchar::transport::{FixedBuffer, GrowableBuffer, UsbTransport};
use usbchar::{
    FileBridge, HexTracer, Registration, Session, Transport, create_device_channel, logging,
    spawn_service_loop,
};

#[derive(Parser, Debug)]
#[command(name = "usbchar")]
#[command(
    author,
    version,
    about = "Expose a USB bulk device as an unprivileged character device"
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save the default configuration to the default location and exit
    #[arg(long)]
    save_config: bool,

    /// Device major number
    #[arg(short = 'M', long = "maj", value_name = "MAJ")]
    major: Option<u32>,

    /// Device minor number
    #[arg(short = 'm', long = "min", value_name = "MIN")]
    minor: Option<u32>,

    /// Device name (mandatory unless set in the config file)
    #[arg(short, long, value_name = "NAME")]
    name: Option<String>,

    /// Print a hex trace of USB activity
    #[arg(short, long)]
    trace: bool,

    /// Backing store behind the device node
    #[arg(long, value_enum, value_name = "KIND")]
    backend: Option<BackendKind>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = Config::default();
        let path = Config::default_path();
        config.save(&path).context("failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;

    // CLI flags override individual config values.
    if let Some(major) = args.major {
        config.node.major = major;
    }
    if let Some(minor) = args.minor {
        config.node.minor = minor;
    }
    if let Some(name) = args.name {
        config.node.name = Some(name);
    }
    if let Some(backend) = args.backend {
        config.backend.kind = backend;
    }
    if args.trace {
        config.trace = true;
    }

    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    logging::init(log_level).context("failed to setup logging")?;

    info!("usbchar v{}", env!("CARGO_PKG_VERSION"));

    let name = config
        .node
        .name
        .clone()
        .context("device name is required (--name or [node] name in the config)")?;

    // A missing device is fatal before registration: there would be nothing
    // behind the node.
    let transport = build_transport(&config).context("failed to open backing store")?;

    let session = Session::new(transport);
    let bridge = FileBridge::new(session, HexTracer::new(config.trace));
    let (ops, service) = create_device_channel(bridge);
    let service_handle = spawn_service_loop(service);

    let registration = Registration {
        major: config.node.major,
        minor: config.node.minor,
        name,
    };
    info!(
        major = registration.major,
        minor = registration.minor,
        name = %registration.name,
        backend = ?config.backend.kind,
        "session bridge ready; registration layer takes it from here"
    );

    // The registration glue owns `ops` and calls it from its callbacks; it
    // must stay alive for as long as the node exists.
    let _registration_ops = ops;

    if service_handle.join().is_err() {
        bail!("character device service thread panicked");
    }
    Ok(())
}

fn build_transport(config: &Config) -> Result<Box<dyn Transport>> {
    Ok(match config.backend.kind {
        BackendKind::Usb => {
            let transport =
                UsbTransport::probe(&config.device).context("could not open USB device")?;
            Box::new(transport)
        }
        BackendKind::Growable => Box::new(GrowableBuffer::new()),
        BackendKind::Fixed => Box::new(FixedBuffer::new(config.backend.capacity)),
    })
}
