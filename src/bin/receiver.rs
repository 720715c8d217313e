//! Audio Receiver Application
//!
//! Receives Opus-framed datagrams and plays them on the local PCM device.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pcm_relay::{
    audio::{PlaybackBuffer, PlaybackDevice},
    codec::FrameDecoder,
    config::AppConfig,
    network::{bind_socket, FrameReceiver},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load_or_default();

    let mut args = std::env::args().skip(1);
    let bind_addr: SocketAddr = args
        .next()
        .unwrap_or_else(|| config.network.bind_addr.clone())
        .parse()
        .context("Invalid bind address")?;
    let device_name = args.next().unwrap_or_else(|| config.playback.device.clone());

    let format = config.codec.wave_format();

    // Receive path. The read timeout is the cancellation poll interval; the
    // loop treats timed-out receives as idle iterations.
    let socket = bind_socket(bind_addr, config.network.socket_buffer_bytes)?;
    socket
        .set_read_timeout(Some(Duration::from_millis(200)))
        .context("Failed to set socket timeout")?;
    let decoder = FrameDecoder::new(
        config.codec.sample_rate,
        config.codec.channels,
        config.codec.frame_size,
    )?;
    let buffer = Arc::new(PlaybackBuffer::for_latency(
        format.sample_rate,
        format.block_align,
        config.playback.max_buffered_secs,
    ));
    let receiver = FrameReceiver::new(socket, decoder, Arc::clone(&buffer));
    let stats = receiver.stats();
    let mut handle = receiver.spawn()?;
    tracing::info!("Listening on {}", bind_addr);

    // Playback path.
    let mut device = PlaybackDevice::open(&device_name)?;
    let period = device.configure(&format)?;
    tracing::info!(
        "Playback on {}: period {} frames, buffer capacity {} bytes",
        device_name,
        period.frames,
        buffer.capacity()
    );

    let reader = buffer.reader();
    let playback = tokio::task::spawn_blocking(move || -> pcm_relay::Result<()> {
        device.write_stream(reader, &period)?;
        device.close(false)?;
        Ok(())
    });

    // Periodic stats until Ctrl-C.
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                tracing::info!(
                    "Stats: {} datagrams, {} frames decoded, {} concealed, {} bytes buffered",
                    stats.datagrams_received(),
                    stats.frames_decoded(),
                    stats.frames_concealed(),
                    buffer.len()
                );
            }
        }
    }

    tracing::info!("Shutting down");
    handle.stop();
    if let Some(e) = handle.take_error() {
        tracing::error!("Receive loop error: {}", e);
    }
    // End-of-stream for the write loop; the device drains what is queued.
    buffer.close();
    playback.await.context("Playback task panicked")??;
    Ok(())
}
