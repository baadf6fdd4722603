use bytes::Bytes;
use serial_lab_abstract::{LinkConfig, Pacing};
use tracing::{debug, info};

use crate::channel::ByteSource;
use crate::decoder::{DecodeState, Decoded, FrameDecoder};
use crate::error::DecodeError;

/// Frame counters kept by a [`FrameReceiver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub accepted: u32,
    pub rejected: u32,
    pub checksum_mismatches: u32,
    pub unexpected_ends: u32,
    pub oversized: u32,
    pub bytes_consumed: u64,
}

impl ReceiverStats {
    fn record_rejection(&mut self, err: DecodeError) {
        self.rejected += 1;
        match err {
            DecodeError::ChecksumMismatch { .. } => self.checksum_mismatches += 1,
            DecodeError::UnexpectedEnd { .. } => self.unexpected_ends += 1,
            DecodeError::LengthExceedsLimit { .. } => self.oversized += 1,
        }
    }
}

/// Receiving end of the link.
///
/// Pulls bytes from a [`ByteSource`] once per scheduling step, one byte or
/// everything available depending on the configured [`Pacing`]. A decoded
/// payload stays exposed through [`FrameReceiver::ready`] until the next byte
/// is processed; malformed frames are dropped and only counted.
#[derive(Debug, Clone)]
pub struct FrameReceiver {
    decoder: FrameDecoder,
    pacing: Pacing,
    ready: Option<Bytes>,
    rejected: Option<DecodeError>,
    stats: ReceiverStats,
}

impl FrameReceiver {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            decoder: FrameDecoder::new(config),
            pacing: config.rx_pacing,
            ready: None,
            rejected: None,
            stats: ReceiverStats::default(),
        }
    }

    /// Run one scheduling step. Returns the payload completed during it.
    ///
    /// In burst mode the step stops right after a valid frame so that each
    /// payload is exposed for exactly one step; remaining bytes wait for the
    /// next call.
    pub fn tick<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Option<Bytes> {
        let budget = match self.pacing {
            Pacing::PerByte => 1,
            Pacing::Burst => usize::MAX,
        };
        self.rejected = None;

        let mut consumed = 0;
        while consumed < budget {
            let Some(byte) = source.next_byte() else {
                break;
            };
            consumed += 1;
            self.stats.bytes_consumed += 1;
            self.ready = None;

            match self.decoder.push(byte) {
                Decoded::Pending => {}
                Decoded::Valid(payload) => {
                    self.stats.accepted += 1;
                    info!("frame accepted ({} bytes)", payload.len());
                    self.decoder.reset();
                    self.ready = Some(payload.clone());
                    return Some(payload);
                }
                Decoded::Invalid(err) => {
                    self.stats.record_rejection(err);
                    info!("frame rejected: {err}");
                    self.decoder.reset();
                    self.rejected = Some(err);
                }
            }
        }

        if consumed > 0 {
            debug!(
                "receiver consumed {consumed} byte(s), decoder at {:?}",
                self.decoder.state()
            );
        }
        None
    }

    /// Payload completed by the most recent step, until another byte arrives.
    pub fn ready(&self) -> Option<&Bytes> {
        self.ready.as_ref()
    }

    /// Consume the ready payload.
    pub fn take_ready(&mut self) -> Option<Bytes> {
        self.ready.take()
    }

    /// Last frame rejected during the most recent step, if any.
    pub fn rejection(&self) -> Option<DecodeError> {
        self.rejected
    }

    pub fn decoder_state(&self) -> DecodeState {
        self.decoder.state()
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Drop any partial frame and forget the ready payload.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.ready = None;
        self.rejected = None;
    }
}
