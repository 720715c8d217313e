//! Encode-and-send loop
//!
//! Reads fixed-duration PCM frames from a container, encodes each with
//! Opus, and transmits the encoded bytes as one datagram per frame to a
//! fixed destination. Loss is tolerated by the receiver's framing; there is
//! no acknowledgement, retry or sequence numbering.

use std::io::Read;
use std::net::{SocketAddr, UdpSocket};

use crate::codec::FrameEncoder;
use crate::config::{CodecConfig, NetworkConfig};
use crate::error::{Error, NetworkError, Result};
use crate::wave::{WaveFormat, WaveReader};

pub struct FrameSender {
    socket: UdpSocket,
    encoder: FrameEncoder,
    frame_size: usize,
    sample_rate: u32,
    channels: u16,
}

/// Send loop statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct SenderStats {
    pub datagrams_sent: u64,
    pub bytes_sent: u64,
}

impl FrameSender {
    pub fn new(codec: &CodecConfig, network: &NetworkConfig, target: SocketAddr) -> Result<Self> {
        codec.validate()?;
        let socket = super::connect_socket(target, network.socket_buffer_bytes)?;
        let encoder = FrameEncoder::new(codec)?;
        tracing::info!(
            "Sender ready: {} Hz, {} channels, {} samples/frame ({:.1} ms) -> {}",
            codec.sample_rate,
            codec.channels,
            codec.frame_size,
            codec.frame_duration_ms(),
            target
        );
        Ok(Self {
            socket,
            encoder,
            frame_size: codec.frame_size,
            sample_rate: codec.sample_rate,
            channels: codec.channels,
        })
    }

    /// Encode one frame of samples and transmit it as a single datagram.
    /// Returns the packet size in bytes.
    pub fn send_frame(&mut self, samples: &[i16]) -> Result<usize> {
        let packet = self.encoder.encode(samples)?;
        self.socket
            .send(&packet)
            .map_err(NetworkError::SendFailed)?;
        Ok(packet.len())
    }

    /// Stream a wave container: one datagram per full frame, stopping at
    /// the last complete frame (a partial tail is discarded, not padded).
    /// A transport failure aborts the loop.
    pub fn stream<R: Read>(&mut self, source: WaveReader<R>) -> Result<SenderStats> {
        self.check_source_format(source.format())?;
        let mut frames = source.into_frames(self.frame_size);
        let mut stats = SenderStats::default();

        while let Some(frame) = frames.next_frame()? {
            let samples: Vec<i16> = frame
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            let sent = self.send_frame(&samples)?;
            stats.datagrams_sent += 1;
            stats.bytes_sent += sent as u64;
        }

        tracing::info!(
            "Send loop finished: {} datagrams, {} bytes",
            stats.datagrams_sent,
            stats.bytes_sent
        );
        Ok(stats)
    }

    /// The container must carry what the encoder was built for.
    fn check_source_format(&self, format: &WaveFormat) -> Result<()> {
        if format.bits_per_sample != 16 {
            return Err(Error::Config(format!(
                "Transport requires 16-bit PCM, container has {} bits per sample",
                format.bits_per_sample
            )));
        }
        if format.channels != self.channels {
            return Err(Error::Config(format!(
                "Container has {} channels, encoder expects {}",
                format.channels, self.channels
            )));
        }
        if format.sample_rate != self.sample_rate {
            return Err(Error::Config(format!(
                "Container is {} Hz, encoder expects {}",
                format.sample_rate, self.sample_rate
            )));
        }
        Ok(())
    }
}
