//! Opus decoder wrapper

use opus::{Channels, Decoder};

use crate::error::CodecError;

/// Decodes exactly one compressed packet into one fixed-size frame per call.
///
/// The frame size is a hint the decoder enforces: a packet that decodes to
/// any other duration is rejected, keeping the decode granularity fixed
/// regardless of what arrives off the wire.
pub struct FrameDecoder {
    decoder: Decoder,
    sample_rate: u32,
    channels: u16,
    frame_size: usize,
    /// Decoding buffer (reused to avoid allocations)
    decode_buffer: Vec<i16>,
    frames_decoded: u64,
    frames_failed: u64,
}

impl FrameDecoder {
    pub fn new(sample_rate: u32, channels: u16, frame_size: usize) -> Result<Self, CodecError> {
        let opus_channels = match channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            _ => {
                return Err(CodecError::DecoderInit(format!(
                    "Unsupported channel count: {}",
                    channels
                )))
            }
        };

        let decoder = Decoder::new(sample_rate, opus_channels)
            .map_err(|e| CodecError::DecoderInit(e.to_string()))?;

        let decode_buffer = vec![0i16; frame_size * channels as usize];

        Ok(Self {
            decoder,
            sample_rate,
            channels,
            frame_size,
            decode_buffer,
            frames_decoded: 0,
            frames_failed: 0,
        })
    }

    /// Decode one packet into one frame of interleaved samples.
    pub fn decode(&mut self, packet: &[u8]) -> Result<&[i16], CodecError> {
        if packet.is_empty() {
            self.frames_failed += 1;
            return Err(CodecError::DecodingFailed("empty packet".to_string()));
        }

        let decoded = match self.decoder.decode(packet, &mut self.decode_buffer, false) {
            Ok(n) => n,
            Err(e) => {
                self.frames_failed += 1;
                return Err(CodecError::DecodingFailed(e.to_string()));
            }
        };
        if decoded != self.frame_size {
            self.frames_failed += 1;
            return Err(CodecError::FrameSizeMismatch {
                got: decoded,
                expected: self.frame_size,
            });
        }

        self.frames_decoded += 1;
        Ok(&self.decode_buffer[..decoded * self.channels as usize])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frame size in samples per channel
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Get statistics
    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            frames_decoded: self.frames_decoded,
            frames_failed: self.frames_failed,
        }
    }
}

/// Decoder statistics
#[derive(Debug, Clone, Copy)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub frames_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FrameEncoder;
    use crate::config::CodecConfig;

    #[test]
    fn decoder_creation() {
        assert!(FrameDecoder::new(48000, 2, 480).is_ok());
        assert!(FrameDecoder::new(48000, 3, 480).is_err());
    }

    #[test]
    fn encode_decode_round_trip() {
        let config = CodecConfig::default();
        let mut encoder = FrameEncoder::new(&config).unwrap();
        let mut decoder =
            FrameDecoder::new(config.sample_rate, config.channels, config.frame_size).unwrap();

        // One frame of a 440 Hz tone.
        let mut samples = Vec::with_capacity(encoder.samples_per_frame());
        for i in 0..config.frame_size {
            let t = i as f32 / config.sample_rate as f32;
            let value = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 16000.0) as i16;
            samples.push(value); // Left
            samples.push(value); // Right
        }

        let packet = encoder.encode(&samples).unwrap();
        let decoded = decoder.decode(&packet).unwrap();

        // Lossy codec: same shape, not same values.
        assert_eq!(decoded.len(), config.samples_per_frame());
        assert_eq!(decoder.stats().frames_decoded, 1);
    }

    #[test]
    fn empty_packet_is_a_decode_failure() {
        let mut decoder = FrameDecoder::new(48000, 2, 480).unwrap();
        assert!(matches!(
            decoder.decode(&[]),
            Err(CodecError::DecodingFailed(_))
        ));
        assert_eq!(decoder.stats().frames_failed, 1);
    }

    #[test]
    fn wrong_duration_packet_is_rejected() {
        // Encode 10ms frames but expect 5ms on the decode side.
        let config = CodecConfig::default();
        let mut encoder = FrameEncoder::new(&config).unwrap();
        let mut decoder = FrameDecoder::new(config.sample_rate, config.channels, 240).unwrap();

        let samples = vec![0i16; encoder.samples_per_frame()];
        let packet = encoder.encode(&samples).unwrap();

        // The 10ms packet cannot fill a 5ms frame slot.
        assert!(decoder.decode(&packet).is_err());

        // The next well-sized packet still decodes.
        let mut small_config = config.clone();
        small_config.frame_size = 240;
        let mut small_encoder = FrameEncoder::new(&small_config).unwrap();
        let small = small_encoder
            .encode(&vec![0i16; small_encoder.samples_per_frame()])
            .unwrap();
        assert!(decoder.decode(&small).is_ok());
    }
}
