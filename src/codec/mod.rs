//! Opus codec wrappers
//!
//! Frame-granular encoding and decoding: each call handles exactly one
//! frame, sized at construction and fixed for the session. The frame size
//! must agree between the sender's encoder and the receiver's decoder.

pub mod decoder;
pub mod encoder;

pub use decoder::FrameDecoder;
pub use encoder::FrameEncoder;
