//! Wave container reading
//!
//! Parses the fixed 44-byte canonical WAV header (RIFF + fmt + data chunk
//! headers) and exposes the raw interleaved PCM payload that follows it.
//! All header fields are little-endian at fixed byte offsets; chunk walking
//! is deliberately not supported.

use bytes::Bytes;
use std::io::Read;

use crate::error::ContainerError;

/// Size of the canonical WAV header in bytes.
pub const HEADER_LEN: usize = 44;

// Field offsets within the canonical header.
const CHANNELS_OFFSET: usize = 22;
const SAMPLE_RATE_OFFSET: usize = 24;
const BLOCK_ALIGN_OFFSET: usize = 32;
const BITS_PER_SAMPLE_OFFSET: usize = 34;

/// PCM format descriptor extracted from a container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub block_align: u16,
}

impl WaveFormat {
    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Payload bytes per second of audio
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align as u32
    }

    fn validate(&self) -> Result<(), ContainerError> {
        if self.block_align != self.channels * (self.bits_per_sample / 8) {
            return Err(ContainerError::BadBlockAlign {
                block_align: self.block_align,
                channels: self.channels,
                bits_per_sample: self.bits_per_sample,
            });
        }
        Ok(())
    }
}

/// Reader over a wave container: header parsed up front, then the PCM
/// payload readable as a plain byte stream.
pub struct WaveReader<R> {
    format: WaveFormat,
    inner: R,
}

impl<R: Read> WaveReader<R> {
    pub fn new(mut inner: R) -> Result<Self, ContainerError> {
        let mut header = [0u8; HEADER_LEN];
        let got = fill_from(&mut inner, &mut header)?;
        if got < HEADER_LEN {
            return Err(ContainerError::ShortHeader {
                got,
                need: HEADER_LEN,
            });
        }
        if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
            return Err(ContainerError::BadMagic);
        }

        let format = WaveFormat {
            channels: u16::from_le_bytes([header[CHANNELS_OFFSET], header[CHANNELS_OFFSET + 1]]),
            sample_rate: u32::from_le_bytes([
                header[SAMPLE_RATE_OFFSET],
                header[SAMPLE_RATE_OFFSET + 1],
                header[SAMPLE_RATE_OFFSET + 2],
                header[SAMPLE_RATE_OFFSET + 3],
            ]),
            block_align: u16::from_le_bytes([
                header[BLOCK_ALIGN_OFFSET],
                header[BLOCK_ALIGN_OFFSET + 1],
            ]),
            bits_per_sample: u16::from_le_bytes([
                header[BITS_PER_SAMPLE_OFFSET],
                header[BITS_PER_SAMPLE_OFFSET + 1],
            ]),
        };
        format.validate()?;

        Ok(Self { format, inner })
    }

    pub fn format(&self) -> &WaveFormat {
        &self.format
    }

    /// Frame-granular view of the payload for the send path.
    pub fn into_frames(self, frame_size: usize) -> PcmFrames<R> {
        let frame_bytes = frame_size * self.format.block_align as usize;
        PcmFrames {
            inner: self.inner,
            buf: vec![0u8; frame_bytes],
        }
    }
}

// The payload is just the rest of the stream; the device write loop can
// consume a `WaveReader` directly.
impl<R: Read> Read for WaveReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Iterator-style source of fixed-size PCM frames.
///
/// Yields one full frame per call; a partial trailing read smaller than one
/// frame is discarded, not padded.
pub struct PcmFrames<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> PcmFrames<R> {
    pub fn frame_bytes(&self) -> usize {
        self.buf.len()
    }

    pub fn next_frame(&mut self) -> std::io::Result<Option<Bytes>> {
        let filled = fill_from(&mut self.inner, &mut self.buf)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < self.buf.len() {
            tracing::debug!("Discarding {} trailing bytes short of a full frame", filled);
            return Ok(None);
        }
        Ok(Some(Bytes::copy_from_slice(&self.buf)))
    }
}

/// Read until `buf` is full or the source ends; returns bytes read.
pub(crate) fn fill_from<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
