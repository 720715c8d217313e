//! Bounded playback buffer
//!
//! Byte queue between the receive loop (single writer) and the device write
//! loop (single reader). The buffer serializes its own access; callers need
//! no external locking. Capacity is fixed at construction and sized from a
//! target maximum latency; an append past capacity is an error, never a
//! silent drop.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io::Read;
use std::sync::Arc;

use crate::error::AudioError;

pub struct PlaybackBuffer {
    inner: Mutex<Inner>,
    data_ready: Condvar,
    capacity: usize,
}

struct Inner {
    queue: VecDeque<u8>,
    closed: bool,
}

impl PlaybackBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(capacity.min(1 << 20)),
                closed: false,
            }),
            data_ready: Condvar::new(),
            capacity,
        }
    }

    /// Capacity for `max_secs` seconds of audio at the given format.
    pub fn for_latency(sample_rate: u32, block_align: u16, max_secs: u32) -> Self {
        Self::new(sample_rate as usize * block_align as usize * max_secs as usize)
    }

    /// Append one decoded frame's bytes. Fails on overflow or after
    /// [`close`](Self::close); bytes are never partially appended.
    pub fn append(&self, bytes: &[u8]) -> Result<(), AudioError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(AudioError::BufferClosed);
        }
        if inner.queue.len() + bytes.len() > self.capacity {
            return Err(AudioError::BufferOverflow {
                attempted: bytes.len(),
                capacity: self.capacity,
            });
        }
        inner.queue.extend(bytes.iter().copied());
        drop(inner);
        self.data_ready.notify_one();
        Ok(())
    }

    /// Mark end-of-stream. Readers drain what is queued, then see EOF.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);
        self.data_ready.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocking reader end for the device write loop.
    pub fn reader(self: &Arc<Self>) -> BufferReader {
        BufferReader {
            buffer: Arc::clone(self),
        }
    }
}

/// Blocking [`Read`] view of a [`PlaybackBuffer`].
///
/// An empty buffer blocks the reader until data arrives (underflow stalls
/// playback rather than feeding the device garbage); a closed, drained
/// buffer reads as end-of-stream.
pub struct BufferReader {
    buffer: Arc<PlaybackBuffer>,
}

impl Read for BufferReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut inner = self.buffer.inner.lock();
        while inner.queue.is_empty() && !inner.closed {
            self.buffer.data_ready.wait(&mut inner);
        }
        if inner.queue.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(inner.queue.len());
        for (slot, byte) in buf.iter_mut().zip(inner.queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}
