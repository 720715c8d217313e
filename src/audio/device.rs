//! ALSA playback device
//!
//! Owns exactly one PCM handle and mediates all access to it behind an
//! explicit lifecycle: `Closed -> Opened -> Configured -> Streaming ->
//! Closed`. Re-configuring a streaming device is not supported; close and
//! open a new session instead.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use std::io::Read;

use crate::error::{DeviceError, Error, Result};
use crate::wave::{fill_from, WaveFormat};

/// Negotiated transfer block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    /// Frames per hardware transfer.
    pub frames: u64,

    /// Which way the driver rounded the requested rate (-1, 0 or 1).
    pub direction: i32,
}

impl Period {
    /// Bytes per transfer for the given format.
    pub fn bytes(&self, format: &WaveFormat) -> usize {
        self.frames as usize * format.block_align as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Closed,
    Opened,
    Configured,
    Streaming,
}

/// Map bytes-per-sample to the hardware sample encoding.
fn hardware_format(bits_per_sample: u16) -> std::result::Result<Format, DeviceError> {
    match bits_per_sample / 8 {
        1 => Ok(Format::U8),
        2 => Ok(Format::S16LE),
        3 => Ok(Format::S243LE),
        _ => Err(DeviceError::UnsupportedFormat { bits_per_sample }),
    }
}

/// The byte value hardware reads as silence for the format.
fn silence_byte(bits_per_sample: u16) -> u8 {
    // Unsigned 8-bit centers at 0x80; the signed formats at zero.
    if bits_per_sample / 8 == 1 {
        0x80
    } else {
        0x00
    }
}

/// Blocking PCM output device.
pub struct PlaybackDevice {
    pcm: Option<PCM>,
    name: String,
    stage: Stage,
    block_align: usize,
    silence: u8,
    negotiated_rate: Option<u32>,
}

impl PlaybackDevice {
    /// Resolve the named device for playback. The returned device is open
    /// but not yet configured.
    pub fn open(name: &str) -> std::result::Result<Self, DeviceError> {
        let pcm = PCM::new(name, Direction::Playback, false).map_err(|e| DeviceError::Open {
            name: name.to_string(),
            source: e,
        })?;
        tracing::info!("Opened playback device {}", name);
        Ok(Self {
            pcm: Some(pcm),
            name: name.to_string(),
            stage: Stage::Opened,
            block_align: 0,
            silence: 0,
            negotiated_rate: None,
        })
    }

    /// Negotiate hardware parameters for `format` and return the driver's
    /// preferred transfer block size.
    ///
    /// An unsupported sample depth fails before any hardware state changes,
    /// leaving the device open. A driver-level negotiation failure releases
    /// the handle; the device ends up closed.
    pub fn configure(&mut self, format: &WaveFormat) -> std::result::Result<Period, DeviceError> {
        let hw_format = hardware_format(format.bits_per_sample)?;
        let pcm = match (self.stage, self.pcm.as_ref()) {
            (Stage::Opened, Some(pcm)) => pcm,
            _ => {
                return Err(DeviceError::InvalidState {
                    operation: "configure",
                    required: "an open, unconfigured device",
                })
            }
        };

        let negotiated = (|| -> alsa::Result<(u32, alsa::pcm::Frames)> {
            let hwp = HwParams::any(pcm)?;
            hwp.set_access(Access::RWInterleaved)?;
            hwp.set_format(hw_format)?;
            hwp.set_channels(format.channels as u32)?;
            hwp.set_rate(format.sample_rate, ValueOr::Nearest)?;
            pcm.hw_params(&hwp)?;
            let rate = hwp.get_rate()?;
            let period_frames = hwp.get_period_size()?;
            Ok((rate, period_frames))
        })();

        match negotiated {
            Ok((rate, period_frames)) => {
                let direction = (rate as i64 - format.sample_rate as i64).signum() as i32;
                if rate != format.sample_rate {
                    tracing::warn!(
                        "Driver snapped rate: requested {} Hz, got {} Hz",
                        format.sample_rate,
                        rate
                    );
                }
                self.block_align = format.block_align as usize;
                self.silence = silence_byte(format.bits_per_sample);
                self.negotiated_rate = Some(rate);
                self.stage = Stage::Configured;
                tracing::debug!(
                    "Configured {}: {} channels, {} Hz, period {} frames",
                    self.name,
                    format.channels,
                    rate,
                    period_frames
                );
                Ok(Period {
                    frames: period_frames as u64,
                    direction,
                })
            }
            Err(e) => {
                // Release the handle before surfacing the error.
                self.pcm = None;
                self.stage = Stage::Closed;
                Err(DeviceError::Negotiation(e))
            }
        }
    }

    /// The rate the driver actually configured, if it differs the caller
    /// decides whether to propagate it downstream.
    pub fn negotiated_rate(&self) -> Option<u32> {
        self.negotiated_rate
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.pcm.is_some()
    }

    /// Stream `source` to the device in period-sized blocking writes until
    /// the source is exhausted. A partial final read is zero-padded to a
    /// full period with the format's silence value. Returns frames written.
    ///
    /// A failed native write aborts the loop and is not retried; the handle
    /// stays owned so a subsequent [`close`](Self::close) releases it.
    pub fn write_stream<R: Read>(&mut self, mut source: R, period: &Period) -> Result<u64> {
        match self.stage {
            Stage::Configured | Stage::Streaming => {}
            _ => {
                return Err(DeviceError::InvalidState {
                    operation: "write_stream",
                    required: "a configured device",
                }
                .into())
            }
        }
        self.stage = Stage::Streaming;
        let pcm = match self.pcm.as_ref() {
            Some(pcm) => pcm,
            None => {
                return Err(DeviceError::InvalidState {
                    operation: "write_stream",
                    required: "a configured device",
                }
                .into())
            }
        };

        let period_bytes = period.frames as usize * self.block_align;
        let io = pcm.io_bytes();
        let mut buf = vec![0u8; period_bytes];
        let mut frames_written: u64 = 0;

        loop {
            let filled = fill_from(&mut source, &mut buf).map_err(Error::Io)?;
            if filled == 0 {
                break;
            }
            if filled < period_bytes {
                // Pad the short final transfer to the negotiated period.
                buf[filled..].fill(self.silence);
            }
            let written = io.writei(&buf).map_err(DeviceError::Write)?;
            frames_written += written as u64;
        }

        tracing::debug!("Source exhausted after {} frames", frames_written);
        Ok(frames_written)
    }

    /// Stop the device and release the handle.
    ///
    /// With `discard_pending` the hardware buffer is dropped immediately;
    /// otherwise playback drains first. The handle is released on every
    /// path, including a failed drain. Closing a closed device is a no-op.
    pub fn close(&mut self, discard_pending: bool) -> std::result::Result<(), DeviceError> {
        let pcm = match self.pcm.take() {
            Some(pcm) => pcm,
            None => return Ok(()),
        };
        self.stage = Stage::Closed;
        self.negotiated_rate = None;

        // `pcm` leaves scope below whatever happens, releasing the handle.
        let stopped = if discard_pending {
            pcm.drop()
        } else {
            pcm.drain()
        };
        stopped.map_err(DeviceError::Close)?;
        tracing::info!("Closed playback device {}", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn format_mapping_by_sample_depth() {
        assert!(matches!(hardware_format(8), Ok(Format::U8)));
        assert!(matches!(hardware_format(16), Ok(Format::S16LE)));
        assert!(matches!(hardware_format(24), Ok(Format::S243LE)));
        assert!(matches!(
            hardware_format(32),
            Err(DeviceError::UnsupportedFormat { bits_per_sample: 32 })
        ));
        assert!(hardware_format(0).is_err());
    }

    #[test]
    fn silence_depends_on_encoding() {
        assert_eq!(silence_byte(8), 0x80);
        assert_eq!(silence_byte(16), 0x00);
        assert_eq!(silence_byte(24), 0x00);
    }

    #[test]
    fn period_byte_size() {
        let format = WaveFormat {
            sample_rate: 48000,
            channels: 2,
            bits_per_sample: 16,
            block_align: 4,
        };
        let period = Period {
            frames: 512,
            direction: 0,
        };
        assert_eq!(period.bytes(&format), 2048);
    }

    proptest! {
        // Selection is keyed by bytes per sample: only depths mapping to
        // 1, 2 or 3 bytes are representable.
        #[test]
        fn format_mapping_accepts_only_known_depths(bits in 0u16..=512) {
            let ok = matches!(bits / 8, 1 | 2 | 3);
            prop_assert_eq!(hardware_format(bits).is_ok(), ok);
        }
    }

    // The remaining lifecycle tests need real hardware; they skip on
    // machines without a usable playback device (CI containers).
    fn open_default() -> Option<PlaybackDevice> {
        PlaybackDevice::open("default").ok()
    }

    #[test]
    fn lifecycle_on_default_device() {
        let Some(mut device) = open_default() else {
            return;
        };
        let format = WaveFormat {
            sample_rate: 48000,
            channels: 2,
            bits_per_sample: 16,
            block_align: 4,
        };
        let period = device.configure(&format).unwrap();
        assert!(period.frames > 0);
        assert!(device.negotiated_rate().is_some());

        // A configured device cannot be configured again.
        assert!(matches!(
            device.configure(&format),
            Err(DeviceError::InvalidState { .. })
        ));

        device.close(true).unwrap();
        assert!(!device.is_open());
        // Idempotent.
        device.close(true).unwrap();
        device.close(false).unwrap();
    }

    #[test]
    fn unsupported_format_leaves_device_open() {
        let Some(mut device) = open_default() else {
            return;
        };
        let bad = WaveFormat {
            sample_rate: 48000,
            channels: 2,
            bits_per_sample: 32,
            block_align: 8,
        };
        assert!(matches!(
            device.configure(&bad),
            Err(DeviceError::UnsupportedFormat { .. })
        ));
        assert!(device.is_open());

        // Still usable with a supported format afterwards.
        let good = WaveFormat {
            sample_rate: 48000,
            channels: 2,
            bits_per_sample: 16,
            block_align: 4,
        };
        assert!(device.configure(&good).is_ok());
        device.close(true).unwrap();
    }

    #[test]
    fn write_requires_configuration() {
        let Some(mut device) = open_default() else {
            return;
        };
        let period = Period {
            frames: 256,
            direction: 0,
        };
        let result = device.write_stream(std::io::empty(), &period);
        assert!(matches!(
            result,
            Err(Error::Device(DeviceError::InvalidState { .. }))
        ));
        device.close(true).unwrap();
    }

    #[test]
    fn short_final_write_is_padded() {
        let Some(mut device) = open_default() else {
            return;
        };
        let format = WaveFormat {
            sample_rate: 48000,
            channels: 2,
            bits_per_sample: 16,
            block_align: 4,
        };
        let period = device.configure(&format).unwrap();
        // One and a half periods of audio; the tail is padded, not dropped.
        let payload = vec![0u8; period.bytes(&format) * 3 / 2];
        let frames = device
            .write_stream(std::io::Cursor::new(payload), &period)
            .unwrap();
        assert_eq!(frames, period.frames * 2);
        device.close(true).unwrap();
    }
}
