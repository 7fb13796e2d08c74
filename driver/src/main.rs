use anyhow::Context;
use biocore::acquisition::{ByteLink, SerialLink};
use biocore::session::Session;
use bridge::HttpBridge;
use clap::Parser;
use config::DriverConfig;
use generator::{build_stream, StreamSettings, SyntheticLink};
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;

mod bridge;
mod config;
mod generator;

#[derive(Parser)]
#[command(author, version, about = "Acquisition driver for the biocore pipeline")]
struct Args {
    /// Load a driver/session config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serial device path (overrides the config file)
    #[arg(long)]
    port: Option<String>,
    /// Baud rate (overrides the config file)
    #[arg(long)]
    baud: Option<u32>,
    /// Replay a generated packet stream instead of opening hardware
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    /// Number of packets to generate in synthetic mode
    #[arg(long, default_value_t = 2048)]
    frames: usize,
    /// Keep the HTTP bridge alive for external consumers (Ctrl+C to stop)
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut driver_config = if let Some(path) = args.config {
        DriverConfig::load(path)?
    } else {
        DriverConfig::default()
    };
    if let Some(port) = args.port {
        driver_config.port = Some(port);
    }
    if let Some(baud) = args.baud {
        driver_config.baud = baud;
    }

    let link: Box<dyn ByteLink> = if args.synthetic {
        let stream = build_stream(
            &driver_config.session.packet,
            &StreamSettings {
                frames: args.frames,
                sample_rate_hz: driver_config.session.sample_rate_hz,
                ..StreamSettings::default()
            },
        );
        Box::new(SyntheticLink::new(stream))
    } else {
        let port = driver_config
            .port
            .clone()
            .context("no serial port configured; pass --port or set it in the config")?;
        Box::new(SerialLink::open(
            &port,
            driver_config.baud,
            Duration::from_millis(driver_config.read_timeout_ms),
        )?)
    };

    let snapshot = bridge::shared_snapshot();
    let sinks = bridge::snapshot_sinks(&snapshot);
    let session = Session::start(link, driver_config.session, None, sinks)?;
    let http = HttpBridge::spawn(snapshot, session.metrics());

    let metrics = if args.serve {
        http.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
        session.stop()
    } else {
        session.wait()
    };

    println!(
        "Session complete -> samples {}, features {}, labels {}, checksum failures {}, \
         duplicates {}, packets dropped {}, queue overflows {}",
        metrics.samples_routed,
        metrics.features_emitted,
        metrics.labels_emitted,
        metrics.checksum_failures,
        metrics.duplicates,
        metrics.packets_dropped,
        metrics.queue_overflows,
    );

    Ok(())
}
