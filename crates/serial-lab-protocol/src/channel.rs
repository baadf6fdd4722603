//! Byte conduits between the two endpoints.
//!
//! The state machines never see a concrete medium. The transmitter writes
//! into a [`ByteSink`] and the receiver pulls from a [`ByteSource`], so a
//! harness can hand them an in-memory [`ByteChannel`], a staging buffer, or a
//! wrapper that applies faults.

use std::collections::VecDeque;
use tracing::debug;

/// Something bytes can be written into, one at a time, in order.
pub trait ByteSink {
    fn put_byte(&mut self, byte: u8);

    fn put_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.put_byte(b);
        }
    }
}

/// Something bytes can be pulled from in FIFO order without blocking.
pub trait ByteSource {
    /// Next available byte, or `None` if nothing is waiting right now.
    fn next_byte(&mut self) -> Option<u8>;
}

impl ByteSink for Vec<u8> {
    fn put_byte(&mut self, byte: u8) {
        self.push(byte);
    }

    fn put_slice(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl ByteSource for VecDeque<u8> {
    fn next_byte(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

/// Counters kept by a [`ByteChannel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub written: u64,
    pub delivered: u64,
    /// Bytes discarded by an injected loss.
    pub dropped: u64,
    /// Bytes discarded because the channel was full.
    pub overflowed: u64,
    pub corrupted: u64,
}

/// Single-writer, single-reader FIFO byte queue.
///
/// Lossless unless told otherwise: [`ByteChannel::drop_next`] and
/// [`ByteChannel::corrupt_next`] arm one-shot faults applied to the next
/// bytes written, and an optional capacity silently discards writes that do
/// not fit.
#[derive(Debug, Clone, Default)]
pub struct ByteChannel {
    queue: VecDeque<u8>,
    capacity: Option<usize>,
    drop_remaining: usize,
    corrupt_mask: Option<u8>,
    stats: ChannelStats,
}

impl ByteChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Write one byte, subject to armed faults and capacity.
    pub fn send(&mut self, byte: u8) {
        self.stats.written += 1;

        if self.drop_remaining > 0 {
            self.drop_remaining -= 1;
            self.stats.dropped += 1;
            debug!("channel dropped byte 0x{byte:02X}");
            return;
        }

        if let Some(cap) = self.capacity
            && self.queue.len() >= cap
        {
            self.stats.overflowed += 1;
            debug!("channel full ({cap} bytes), discarding 0x{byte:02X}");
            return;
        }

        let byte = match self.corrupt_mask.take() {
            Some(mask) => {
                self.stats.corrupted += 1;
                debug!("channel corrupted byte 0x{byte:02X} with mask 0x{mask:02X}");
                byte ^ mask
            }
            None => byte,
        };
        self.queue.push_back(byte);
    }

    pub fn recv(&mut self) -> Option<u8> {
        let byte = self.queue.pop_front()?;
        self.stats.delivered += 1;
        Some(byte)
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.queue.front().copied()
    }

    /// Lose the next `count` bytes written.
    pub fn drop_next(&mut self, count: usize) {
        self.drop_remaining += count;
    }

    /// XOR `mask` into the next byte that makes it into the queue.
    pub fn corrupt_next(&mut self, mask: u8) {
        self.corrupt_mask = Some(mask);
    }

    /// Discard everything currently queued. Returns how many bytes were lost.
    pub fn discard_pending(&mut self) -> usize {
        let n = self.queue.len();
        self.stats.dropped += n as u64;
        self.queue.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }
}

impl ByteSink for ByteChannel {
    fn put_byte(&mut self, byte: u8) {
        self.send(byte);
    }
}

impl ByteSource for ByteChannel {
    fn next_byte(&mut self) -> Option<u8> {
        self.recv()
    }
}
