//! # PCM Relay
//!
//! Low-latency PCM playback and Opus-framed UDP audio relay.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────── SENDER ──────────────────────────────┐
//! │  ┌───────────────┐    ┌──────────────────┐    ┌───────────────┐   │
//! │  │ Wave container│───▶│ fixed-size PCM   │───▶│ Opus encoder  │   │
//! │  │ reader        │    │ frames (partial  │    │ (one frame    │   │
//! │  └───────────────┘    │ tail discarded)  │    │  per call)    │   │
//! │                       └──────────────────┘    └───────┬───────┘   │
//! │                                                       │           │
//! │                                      one datagram per frame,      │
//! │                                      payload = raw Opus packet    │
//! └───────────────────────────────────────┬───────────────────────────┘
//!                                         │ UDP
//!                                         ▼
//! ┌───────────────────────────── RECEIVER ────────────────────────────┐
//! │  ┌───────────────┐    ┌──────────────┐    ┌────────────────────┐  │
//! │  │ UDP socket    │───▶│ Opus decoder │───▶│ PlaybackBuffer     │  │
//! │  │ (any peer)    │    │ (one packet  │    │ (bounded, FIFO)    │  │
//! │  └───────────────┘    │  per frame)  │    └─────────┬──────────┘  │
//! │                       └──────────────┘              │             │
//! │                                                     ▼             │
//! │                                        ┌────────────────────────┐ │
//! │                                        │ ALSA playback device   │ │
//! │                                        │ (blocking period-sized │ │
//! │                                        │  writes)               │ │
//! │                                        └────────────────────────┘ │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Without a network in between, the wave container reader can feed the
//! playback device directly; both paths drive the same write loop.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod wave;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for audio processing
    pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

    /// Default channel count (stereo)
    pub const DEFAULT_CHANNELS: u16 = 2;

    /// Default Opus bitrate in bits per second
    pub const DEFAULT_BITRATE: u32 = 128_000;

    /// Default frame duration in milliseconds
    pub const DEFAULT_FRAME_SIZE_MS: f32 = 10.0;

    /// Default UDP port for audio streaming
    pub const DEFAULT_UDP_PORT: u16 = 5000;

    /// Maximum packet size for UDP
    pub const MAX_PACKET_SIZE: usize = 1472; // MTU - IP/UDP headers

    /// Playback buffer capacity, in seconds of audio at the configured rate
    pub const PLAYBACK_BUFFER_SECS: u32 = 60;

    /// Default kernel socket buffer size in bytes
    pub const SOCKET_BUFFER_BYTES: usize = 1 << 20;
}
