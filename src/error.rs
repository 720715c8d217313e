//! Error types for the audio relay

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Playback device errors
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Failed to open device {name}: {source}")]
    Open { name: String, source: alsa::Error },

    #[error("Unsupported sample format: {bits_per_sample} bits per sample")]
    UnsupportedFormat { bits_per_sample: u16 },

    #[error("Hardware parameter negotiation failed: {0}")]
    Negotiation(#[source] alsa::Error),

    #[error("Device write failed: {0}")]
    Write(#[source] alsa::Error),

    #[error("Failed to stop device: {0}")]
    Close(#[source] alsa::Error),

    #[error("{operation} requires {required}")]
    InvalidState {
        operation: &'static str,
        required: &'static str,
    },
}

/// Wave container errors
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Container header truncated: got {got} bytes, need {need}")]
    ShortHeader { got: usize, need: usize },

    #[error("Not a RIFF/WAVE container")]
    BadMagic,

    #[error("Block alignment {block_align} does not match {channels} channels at {bits_per_sample} bits per sample")]
    BadBlockAlign {
        block_align: u16,
        channels: u16,
        bits_per_sample: u16,
    },

    #[error("IO error reading container: {0}")]
    Io(#[from] std::io::Error),
}

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoder initialization failed: {0}")]
    EncoderInit(String),

    #[error("Decoder initialization failed: {0}")]
    DecoderInit(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Invalid frame size: got {got} samples, expected {expected}")]
    InvalidFrameSize { got: usize, expected: usize },

    #[error("Packet decoded to {got} samples per channel, expected {expected}")]
    FrameSizeMismatch { got: usize, expected: usize },
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    #[error("Socket connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    #[error("Send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("Receive socket no longer usable: {0}")]
    SocketClosed(#[source] std::io::Error),
}

/// Playback buffer errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Playback buffer overflow: appending {attempted} bytes would exceed capacity {capacity}")]
    BufferOverflow { attempted: usize, capacity: usize },

    #[error("Playback buffer is closed")]
    BufferClosed,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
