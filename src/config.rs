//! Application configuration
//!
//! TOML-backed settings with sensible streaming defaults. Every section can
//! be omitted from the file; missing values fall back to the defaults below.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};
use crate::wave::WaveFormat;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub codec: CodecConfig,
    pub network: NetworkConfig,
    pub playback: PlaybackConfig,
}

/// Opus codec configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Sample rate in Hz (must be an Opus rate: 8, 12, 16, 24 or 48 kHz)
    pub sample_rate: u32,

    /// Channel count (1 or 2)
    pub channels: u16,

    /// Frame size in samples per channel
    pub frame_size: usize,

    /// Target bitrate in bits per second
    pub bitrate: u32,

    /// Encoder application profile
    pub application: CodecApplication,

    /// Encoder complexity (0-10)
    pub complexity: u8,
}

/// Opus application profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecApplication {
    Voip,
    Audio,
    LowDelay,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            frame_size: Self::frame_size_from_ms(DEFAULT_SAMPLE_RATE, DEFAULT_FRAME_SIZE_MS),
            bitrate: DEFAULT_BITRATE,
            application: CodecApplication::Audio,
            complexity: 9,
        }
    }
}

impl CodecConfig {
    /// Convert a frame duration in milliseconds to samples per channel
    pub fn frame_size_from_ms(sample_rate: u32, ms: f32) -> usize {
        (sample_rate as f32 * ms / 1000.0) as usize
    }

    /// Frame duration in milliseconds
    pub fn frame_duration_ms(&self) -> f32 {
        self.frame_size as f32 * 1000.0 / self.sample_rate as f32
    }

    /// Total samples per frame, across all channels
    pub fn samples_per_frame(&self) -> usize {
        self.frame_size * self.channels as usize
    }

    /// Bytes per frame of 16-bit interleaved PCM
    pub fn frame_bytes(&self) -> usize {
        self.samples_per_frame() * 2
    }

    /// The 16-bit PCM format descriptor matching this codec configuration
    pub fn wave_format(&self) -> WaveFormat {
        WaveFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: 16,
            block_align: self.channels * 2,
        }
    }

    /// Reject combinations Opus cannot encode
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.channels, 1 | 2) {
            return Err(Error::Config(format!(
                "Unsupported channel count: {}",
                self.channels
            )));
        }
        if !matches!(self.sample_rate, 8000 | 12000 | 16000 | 24000 | 48000) {
            return Err(Error::Config(format!(
                "{} Hz is not an Opus sample rate",
                self.sample_rate
            )));
        }
        // Legal Opus frame durations, in tenths of a millisecond. Division is
        // exact for every legal (rate, frame_size) pair.
        let tenths_ms = self.frame_size * 10_000 / self.sample_rate as usize;
        if !matches!(tenths_ms, 25 | 50 | 100 | 200 | 400 | 600)
            || self.frame_size * 10_000 % self.sample_rate as usize != 0
        {
            return Err(Error::Config(format!(
                "{} samples at {} Hz is not a legal Opus frame duration",
                self.frame_size, self.sample_rate
            )));
        }
        Ok(())
    }
}

/// UDP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Receiver bind address
    pub bind_addr: String,

    /// Default sender destination
    pub target_addr: String,

    /// Kernel socket buffer size in bytes
    pub socket_buffer_bytes: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_UDP_PORT),
            target_addr: format!("127.0.0.1:{}", DEFAULT_UDP_PORT),
            socket_buffer_bytes: SOCKET_BUFFER_BYTES,
        }
    }
}

/// Playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// ALSA device name
    pub device: String,

    /// Playback buffer capacity, in seconds of audio
    pub max_buffered_secs: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            max_buffered_secs: PLAYBACK_BUFFER_SECS,
        }
    }
}

impl AppConfig {
    /// Platform config file location, e.g. `~/.config/pcm-relay/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "pcm-relay").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        match Self::default_path() {
            Some(path) if path.exists() => match Self::load(&path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Ignoring bad config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    /// Write configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }
}
