//! Audio Sender Application
//!
//! Streams a wave container to the receiver as Opus-framed UDP datagrams.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pcm_relay::{config::AppConfig, network::FrameSender, wave::WaveReader};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load_or_default();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: sender <wav-file> [target-addr]")?;
    let target: SocketAddr = args
        .next()
        .unwrap_or_else(|| config.network.target_addr.clone())
        .parse()
        .context("Invalid target address")?;

    let file = File::open(&path).with_context(|| format!("Failed to open {}", path))?;
    let source = WaveReader::new(BufReader::new(file))?;
    let format = *source.format();
    tracing::info!(
        "Streaming {} ({} Hz, {} channels, {} bits/sample) to {}",
        path,
        format.sample_rate,
        format.channels,
        format.bits_per_sample,
        target
    );

    let mut sender = FrameSender::new(&config.codec, &config.network, target)?;
    let stats = sender.stream(source)?;

    tracing::info!(
        "Done: {} datagrams, {:.1} KB sent",
        stats.datagrams_sent,
        stats.bytes_sent as f64 / 1024.0
    );
    Ok(())
}
