//! Opus encoder wrapper

use bytes::Bytes;
use opus::{Application, Channels, Encoder};

use crate::config::{CodecApplication, CodecConfig};
use crate::constants::MAX_PACKET_SIZE;
use crate::error::CodecError;

/// Encodes exactly one fixed-size frame of interleaved 16-bit PCM per call.
pub struct FrameEncoder {
    encoder: Encoder,
    frame_size: usize,
    channels: u16,
    /// Encoding buffer (reused to avoid allocations)
    encode_buffer: Vec<u8>,
    frames_encoded: u64,
    bytes_produced: u64,
}

impl FrameEncoder {
    pub fn new(config: &CodecConfig) -> Result<Self, CodecError> {
        let channels = match config.channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            _ => {
                return Err(CodecError::EncoderInit(format!(
                    "Unsupported channel count: {}",
                    config.channels
                )))
            }
        };

        let application = match config.application {
            CodecApplication::Voip => Application::Voip,
            CodecApplication::Audio => Application::Audio,
            CodecApplication::LowDelay => Application::LowDelay,
        };

        let mut encoder = Encoder::new(config.sample_rate, channels, application)
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;

        encoder
            .set_bitrate(opus::Bitrate::Bits(config.bitrate as i32))
            .map_err(|e| CodecError::EncoderInit(format!("Failed to set bitrate: {}", e)))?;

        encoder
            .set_complexity(config.complexity as i32)
            .map_err(|e| CodecError::EncoderInit(format!("Failed to set complexity: {}", e)))?;

        Ok(Self {
            encoder,
            frame_size: config.frame_size,
            channels: config.channels,
            encode_buffer: vec![0u8; MAX_PACKET_SIZE],
            frames_encoded: 0,
            bytes_produced: 0,
        })
    }

    /// Encode one frame of interleaved samples.
    ///
    /// The input must hold exactly `frame_size * channels` samples; the
    /// compressed packet fits one datagram.
    pub fn encode(&mut self, samples: &[i16]) -> Result<Bytes, CodecError> {
        let expected = self.samples_per_frame();
        if samples.len() != expected {
            return Err(CodecError::InvalidFrameSize {
                got: samples.len(),
                expected,
            });
        }

        let size = self
            .encoder
            .encode(samples, &mut self.encode_buffer)
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;

        self.frames_encoded += 1;
        self.bytes_produced += size as u64;

        Ok(Bytes::copy_from_slice(&self.encode_buffer[..size]))
    }

    /// Frame size in samples per channel
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Total samples per frame, across all channels
    pub fn samples_per_frame(&self) -> usize {
        self.frame_size * self.channels as usize
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
        }
    }
}

/// Encoder statistics
#[derive(Debug, Clone, Copy)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
}
