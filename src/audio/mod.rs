//! Audio subsystem module

pub mod device;
pub mod playback;

pub use device::{Period, PlaybackDevice};
pub use playback::{BufferReader, PlaybackBuffer};
