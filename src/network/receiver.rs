//! Receive-decode-buffer loop
//!
//! Accepts datagrams from any peer, decodes each as exactly one frame and
//! appends the decoded PCM to the playback buffer. Runs until cancelled;
//! per-packet decode failures never terminate the loop.

use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver as ErrorReceiver};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::audio::PlaybackBuffer;
use crate::codec::FrameDecoder;
use crate::constants::MAX_PACKET_SIZE;
use crate::error::{Error, NetworkError, Result};
use crate::network::EncodedPacket;

pub struct FrameReceiver {
    socket: UdpSocket,
    decoder: FrameDecoder,
    buffer: Arc<PlaybackBuffer>,
    cancel: Arc<AtomicBool>,
    stats: Arc<ReceiverStats>,
}

/// Shared receive loop counters.
#[derive(Debug, Default)]
pub struct ReceiverStats {
    datagrams_received: AtomicU64,
    frames_decoded: AtomicU64,
    frames_concealed: AtomicU64,
}

impl ReceiverStats {
    pub fn datagrams_received(&self) -> u64 {
        self.datagrams_received.load(Ordering::Relaxed)
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded.load(Ordering::Relaxed)
    }

    /// Frames substituted with silence after a decode failure
    pub fn frames_concealed(&self) -> u64 {
        self.frames_concealed.load(Ordering::Relaxed)
    }
}

impl FrameReceiver {
    pub fn new(socket: UdpSocket, decoder: FrameDecoder, buffer: Arc<PlaybackBuffer>) -> Self {
        Self {
            socket,
            decoder,
            buffer,
            cancel: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(ReceiverStats::default()),
        }
    }

    /// Flag checked at each iteration boundary; set it to stop the loop.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn stats(&self) -> Arc<ReceiverStats> {
        Arc::clone(&self.stats)
    }

    /// Run the receive loop until cancelled.
    ///
    /// Blocking receives observe no timeout from this loop itself; for
    /// prompt cancellation the caller installs a read timeout on the socket
    /// before handing it in (timeouts surface as idle iterations here).
    ///
    /// Undecodable packets are logged and replaced with one frame of
    /// silence so the playback interval is not skipped. A reset signaled on
    /// the socket terminates the loop; a full playback buffer is a sizing
    /// error and also terminates.
    pub fn run(&mut self) -> Result<()> {
        let frame_bytes = self.decoder.frame_size() * self.decoder.channels() as usize * 2;
        let silence = vec![0u8; frame_bytes];
        let mut recv_buf = [0u8; MAX_PACKET_SIZE];

        if let Ok(addr) = self.socket.local_addr() {
            tracing::info!("Receive loop listening on {}", addr);
        }

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }

            let packet = match self.socket.recv_from(&mut recv_buf) {
                Ok((len, source)) => EncodedPacket {
                    payload: Bytes::copy_from_slice(&recv_buf[..len]),
                    source,
                },
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                    return Err(NetworkError::SocketClosed(e).into());
                }
                Err(e) => {
                    tracing::warn!("Receive error: {}", e);
                    continue;
                }
            };

            // A cancel that landed while blocked takes effect before any
            // further buffer append.
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }

            self.stats.datagrams_received.fetch_add(1, Ordering::Relaxed);

            match self.decoder.decode(&packet.payload) {
                Ok(samples) => {
                    let mut bytes = Vec::with_capacity(frame_bytes);
                    for sample in samples {
                        bytes.extend_from_slice(&sample.to_le_bytes());
                    }
                    self.buffer.append(&bytes).map_err(Error::Audio)?;
                    self.stats.frames_decoded.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::warn!(
                        "Undecodable packet from {} ({} bytes): {}",
                        packet.source,
                        packet.payload.len(),
                        e
                    );
                    self.buffer.append(&silence).map_err(Error::Audio)?;
                    self.stats.frames_concealed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        tracing::info!("Receive loop stopped");
        Ok(())
    }

    /// Run the loop on its own named thread.
    pub fn spawn(mut self) -> Result<ReceiverHandle> {
        let cancel = Arc::clone(&self.cancel);
        let stats = Arc::clone(&self.stats);
        let (error_tx, error_rx) = bounded::<Error>(1);

        let thread = std::thread::Builder::new()
            .name("frame-receiver".to_string())
            .spawn(move || {
                if let Err(e) = self.run() {
                    tracing::error!("Receive loop failed: {}", e);
                    let _ = error_tx.try_send(e);
                }
            })
            .map_err(Error::Io)?;

        Ok(ReceiverHandle {
            cancel,
            stats,
            error_rx,
            thread: Some(thread),
        })
    }
}

/// Owner of a spawned receive loop.
///
/// Joining relies on the loop observing cancellation, so the underlying
/// socket should carry a read timeout (or keep receiving traffic).
pub struct ReceiverHandle {
    cancel: Arc<AtomicBool>,
    stats: Arc<ReceiverStats>,
    error_rx: ErrorReceiver<Error>,
    thread: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    /// Signal cancellation and wait for the loop to exit.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    /// The error that terminated the loop, if any.
    pub fn take_error(&self) -> Option<Error> {
        self.error_rx.try_recv().ok()
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodecConfig, NetworkConfig};
    use crate::network::{bind_socket, FrameSender};
    use std::time::{Duration, Instant};

    fn mono_config() -> CodecConfig {
        let mut config = CodecConfig::default();
        config.channels = 1;
        config
    }

    fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn loopback_decodes_and_survives_garbage() {
        let config = mono_config();
        let frame_bytes = config.frame_bytes();

        let socket = bind_socket("127.0.0.1:0".parse().unwrap(), 1 << 16).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let target = socket.local_addr().unwrap();

        let decoder =
            FrameDecoder::new(config.sample_rate, config.channels, config.frame_size).unwrap();
        let buffer = Arc::new(PlaybackBuffer::new(frame_bytes * 64));
        let receiver = FrameReceiver::new(socket, decoder, Arc::clone(&buffer));
        let stats = receiver.stats();
        let mut handle = receiver.spawn().unwrap();

        let mut sender =
            FrameSender::new(&config, &NetworkConfig::default(), target).unwrap();
        let samples = vec![100i16; config.samples_per_frame()];

        // Two valid frames, one zero-length datagram, one more valid frame.
        sender.send_frame(&samples).unwrap();
        sender.send_frame(&samples).unwrap();
        let raw = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        raw.send_to(&[], target).unwrap();
        sender.send_frame(&samples).unwrap();

        // Three decoded frames plus one silence substitution, in order.
        wait_until("all packets processed", || {
            stats.frames_decoded() == 3 && stats.frames_concealed() == 1
        });
        assert_eq!(stats.datagrams_received(), 4);

        handle.stop();
        assert!(handle.take_error().is_none());
        assert_eq!(buffer.len(), frame_bytes * 4);
    }

    #[test]
    fn cancellation_stops_an_idle_loop() {
        let config = mono_config();
        let socket = bind_socket("127.0.0.1:0".parse().unwrap(), 1 << 16).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let decoder =
            FrameDecoder::new(config.sample_rate, config.channels, config.frame_size).unwrap();
        let buffer = Arc::new(PlaybackBuffer::new(1 << 16));
        let mut handle = FrameReceiver::new(socket, decoder, Arc::clone(&buffer))
            .spawn()
            .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        handle.stop();
        assert!(handle.take_error().is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn buffer_overflow_terminates_the_loop() {
        let config = mono_config();
        let frame_bytes = config.frame_bytes();

        let socket = bind_socket("127.0.0.1:0".parse().unwrap(), 1 << 16).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let target = socket.local_addr().unwrap();

        let decoder =
            FrameDecoder::new(config.sample_rate, config.channels, config.frame_size).unwrap();
        // Room for one frame only.
        let buffer = Arc::new(PlaybackBuffer::new(frame_bytes));
        let mut handle = FrameReceiver::new(socket, decoder, Arc::clone(&buffer))
            .spawn()
            .unwrap();

        let mut sender =
            FrameSender::new(&config, &NetworkConfig::default(), target).unwrap();
        let samples = vec![0i16; config.samples_per_frame()];
        sender.send_frame(&samples).unwrap();
        sender.send_frame(&samples).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let error = loop {
            if let Some(e) = handle.take_error() {
                break e;
            }
            assert!(Instant::now() < deadline, "loop did not terminate");
            std::thread::sleep(Duration::from_millis(10));
        };
        assert!(matches!(
            error,
            Error::Audio(crate::error::AudioError::BufferOverflow { .. })
        ));
        handle.stop();
    }
}
