//! Producer/consumer seams
//!
//! Push and pull adapters so the transport endpoints and the playback path
//! can be wired into an external dataflow graph without modification: a
//! graph node pushes into a [`Sink`] and pulls from a [`Source`].

use bytes::Bytes;
use std::io::Read;
use std::sync::Arc;

use crate::audio::PlaybackBuffer;
use crate::error::Result;
use crate::network::FrameSender;
use crate::wave::PcmFrames;

/// A node that consumes values pushed into it.
pub trait Sink {
    type Input;

    fn accept(&mut self, input: Self::Input) -> Result<()>;
}

/// A node that yields values on demand; `None` is end-of-stream.
pub trait Source {
    type Output;

    fn produce(&mut self) -> Result<Option<Self::Output>>;
}

/// The frame view of a wave container is a pull source of raw PCM frames.
impl<R: Read> Source for PcmFrames<R> {
    type Output = Bytes;

    fn produce(&mut self) -> Result<Option<Bytes>> {
        Ok(self.next_frame()?)
    }
}

/// Pushing into the playback buffer appends one decoded frame.
impl Sink for Arc<PlaybackBuffer> {
    type Input = Bytes;

    fn accept(&mut self, input: Bytes) -> Result<()> {
        self.append(&input)?;
        Ok(())
    }
}

/// Pushing into the sender encodes and transmits one frame of samples.
impl Sink for FrameSender {
    type Input = Vec<i16>;

    fn accept(&mut self, input: Vec<i16>) -> Result<()> {
        self.send_frame(&input)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::WaveReader;
    use std::io::Cursor;

    #[test]
    fn wave_source_feeds_buffer_sink() {
        // The local path: container frames pushed straight into playback.
        let payload: Vec<u8> = (0u8..=255).cycle().take(960 * 3).collect();
        let container = crate::wave::tests::wave_bytes(48000, 2, 16, 4, &payload);
        let mut source = WaveReader::new(Cursor::new(container))
            .unwrap()
            .into_frames(240);

        let buffer = Arc::new(PlaybackBuffer::new(1 << 16));
        let mut sink = Arc::clone(&buffer);
        while let Some(frame) = source.produce().unwrap() {
            sink.accept(frame).unwrap();
        }
        buffer.close();

        let mut drained = Vec::new();
        buffer.reader().read_to_end(&mut drained).unwrap();
        assert_eq!(drained, payload);
    }
}
