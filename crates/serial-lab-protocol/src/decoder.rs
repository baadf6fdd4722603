//! Byte-at-a-time frame decoder.
//!
//! ```text
//!  AwaitStart ──START──▶ AwaitLength ──len>0──▶ AwaitPayload ──len bytes──▶ AwaitChecksum
//!      ▲  │ other                │ len==0                                     │ match
//!      │  ▼                      └──────────────────────────────────────────▶ │
//!      │ (discard)               │ len>max                                    ▼
//!      │                         └────────▶ Error ◀──── mismatch/bad end ── AwaitEnd
//!      │                                      │                               │ END
//!      └──────────── next byte ───────────────┴──────────── Done ◀────────────┘
//! ```
//!
//! `Done` and `Error` are terminal. The next pushed byte resets the machine
//! and is then treated as a candidate START, so a stream resynchronizes on
//! its own after any outcome.

use bytes::{BufMut, Bytes, BytesMut};
use serial_lab_abstract::LinkConfig;

use crate::checksum::Checksum;
use crate::error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    AwaitStart,
    AwaitLength,
    AwaitPayload,
    AwaitChecksum,
    AwaitEnd,
    Done,
    Error(DecodeError),
}

impl DecodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DecodeState::Done | DecodeState::Error(_))
    }
}

/// Result of feeding one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// No terminal state yet; keep feeding bytes.
    Pending,
    Valid(Bytes),
    Invalid(DecodeError),
}

#[derive(Debug, Clone)]
pub struct FrameDecoder {
    start_byte: u8,
    end_byte: u8,
    max_payload: u8,
    state: DecodeState,
    declared: u8,
    payload: BytesMut,
    checksum: Checksum,
    received_checksum: Option<u8>,
}

impl FrameDecoder {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            start_byte: config.start_byte,
            end_byte: config.end_byte,
            max_payload: config.max_payload,
            state: DecodeState::AwaitStart,
            declared: 0,
            payload: BytesMut::with_capacity(usize::from(config.max_payload)),
            checksum: Checksum::new(config.checksum),
            received_checksum: None,
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Length announced by the frame in progress (0 before one is read).
    pub fn declared_len(&self) -> u8 {
        self.declared
    }

    /// How many payload bytes of the frame in progress have arrived.
    pub fn collected(&self) -> usize {
        self.payload.len()
    }

    /// Checksum byte read off the wire for the frame in progress, if any.
    pub fn received_checksum(&self) -> Option<u8> {
        self.received_checksum
    }

    /// Abandon whatever is in progress and wait for a START again.
    pub fn reset(&mut self) {
        self.state = DecodeState::AwaitStart;
        self.declared = 0;
        self.payload.clear();
        self.checksum.reset();
        self.received_checksum = None;
    }

    pub fn push(&mut self, byte: u8) -> Decoded {
        let (next, outcome) = self.transition(byte);
        self.state = next;
        outcome
    }

    /// Feed a slice and collect every terminal outcome, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Decoded> {
        bytes
            .iter()
            .map(|&b| self.push(b))
            .filter(|d| *d != Decoded::Pending)
            .collect()
    }

    fn transition(&mut self, byte: u8) -> (DecodeState, Decoded) {
        match self.state {
            DecodeState::AwaitStart => {
                if byte == self.start_byte {
                    self.checksum.reset();
                    self.payload.clear();
                    self.declared = 0;
                    self.received_checksum = None;
                    (DecodeState::AwaitLength, Decoded::Pending)
                } else {
                    (DecodeState::AwaitStart, Decoded::Pending)
                }
            }
            DecodeState::AwaitLength => {
                self.declared = byte;
                self.checksum.update(byte);
                if byte > self.max_payload {
                    self.fail(DecodeError::LengthExceedsLimit {
                        length: byte,
                        max: self.max_payload,
                    })
                } else if byte == 0 {
                    (DecodeState::AwaitChecksum, Decoded::Pending)
                } else {
                    (DecodeState::AwaitPayload, Decoded::Pending)
                }
            }
            DecodeState::AwaitPayload => {
                self.payload.put_u8(byte);
                self.checksum.update(byte);
                if self.payload.len() >= usize::from(self.declared) {
                    (DecodeState::AwaitChecksum, Decoded::Pending)
                } else {
                    (DecodeState::AwaitPayload, Decoded::Pending)
                }
            }
            DecodeState::AwaitChecksum => {
                self.received_checksum = Some(byte);
                let computed = self.checksum.value();
                if byte == computed {
                    (DecodeState::AwaitEnd, Decoded::Pending)
                } else {
                    self.fail(DecodeError::ChecksumMismatch {
                        computed,
                        received: byte,
                    })
                }
            }
            DecodeState::AwaitEnd => {
                if byte == self.end_byte {
                    (DecodeState::Done, Decoded::Valid(self.payload.split().freeze()))
                } else {
                    self.fail(DecodeError::UnexpectedEnd { received: byte })
                }
            }
            DecodeState::Done | DecodeState::Error(_) => {
                self.reset();
                self.transition(byte)
            }
        }
    }

    /// Discard the partial payload so it can never leak out.
    fn fail(&mut self, err: DecodeError) -> (DecodeState, Decoded) {
        self.payload.clear();
        (DecodeState::Error(err), Decoded::Invalid(err))
    }
}

/// One-shot decode of a buffer: the first terminal outcome, or `Pending`.
pub fn decode(config: &LinkConfig, bytes: &[u8]) -> Decoded {
    let mut decoder = FrameDecoder::new(config);
    bytes
        .iter()
        .map(|&b| decoder.push(b))
        .find(|d| *d != Decoded::Pending)
        .unwrap_or(Decoded::Pending)
}
