//! Stop-and-wait transmitter session.
//!
//! ```text
//!            request_send                 frame written
//!   Idle ──────────────────▶ Sending ────────────────────▶ AwaitingAck ──ACK──▶ Succeeded
//!    ▲                          ▲                               │
//!    │ reset / cancel           └── deadline or NACK, ──────────┤
//!    │                              attempts < max              │ deadline or NACK,
//!    └──────────────────────────────────────────────────────────┤ attempts == max
//!                                                               ▼
//!                                                             Failed
//! ```
//!
//! Attempts are counted when a transmission starts, so the first send is
//! attempt 1 and `max_attempts` allows `max_attempts - 1` retransmissions.
//! `Succeeded` and `Failed` stay put until [`Transmitter::reset`].

use bytes::Bytes;
use serial_lab_abstract::{LinkConfig, Pacing};
use tracing::{debug, info, warn};

use crate::channel::{ByteSink, ByteSource};
use crate::clock::Tick;
use crate::error::TransmitError;
use crate::frame::encode_frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    /// Putting the frame on the wire; `cursor` is the next byte to write.
    Sending { cursor: usize },
    AwaitingAck { deadline: Tick },
    Succeeded,
    Failed,
}

impl TxState {
    pub fn name(&self) -> &'static str {
        match self {
            TxState::Idle => "idle",
            TxState::Sending { .. } => "sending",
            TxState::AwaitingAck { .. } => "awaiting ack",
            TxState::Succeeded => "succeeded",
            TxState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Succeeded | TxState::Failed)
    }
}

/// What a [`Transmitter::tick`] call reports back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// The one frame in flight.
#[derive(Debug, Clone)]
struct Session {
    payload: Bytes,
    frame: Bytes,
    attempts: u32,
}

#[derive(Debug, Clone)]
pub struct Transmitter {
    config: LinkConfig,
    state: TxState,
    session: Option<Session>,
}

impl Transmitter {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            config: config.clone(),
            state: TxState::Idle,
            session: None,
        }
    }

    /// Start a session for `payload`. Only accepted while idle.
    ///
    /// The frame is encoded once here and the same bytes are reused for every
    /// retransmission.
    pub fn request_send(&mut self, payload: &[u8]) -> Result<(), TransmitError> {
        if self.state != TxState::Idle {
            return Err(TransmitError::Busy {
                state: self.state.name(),
            });
        }
        let frame = encode_frame(&self.config, payload)?;
        debug!(
            "send requested: {} byte payload, {} byte frame",
            payload.len(),
            frame.len()
        );
        self.session = Some(Session {
            payload: Bytes::copy_from_slice(payload),
            frame,
            attempts: 0,
        });
        self.state = TxState::Sending { cursor: 0 };
        Ok(())
    }

    /// Advance the session by one scheduling step at time `now`.
    ///
    /// Frame bytes go to `out`; acknowledgments are read from `acks`.
    pub fn tick<W, R>(&mut self, now: Tick, out: &mut W, acks: &mut R) -> TxStatus
    where
        W: ByteSink + ?Sized,
        R: ByteSource + ?Sized,
    {
        let state = self.state;
        self.state = match state {
            TxState::Idle => TxState::Idle,
            TxState::Sending { cursor } => self.transmit(now, cursor, out),
            TxState::AwaitingAck { deadline } => self.await_ack(now, deadline, acks),
            terminal @ (TxState::Succeeded | TxState::Failed) => terminal,
        };
        self.status()
    }

    fn transmit<W: ByteSink + ?Sized>(&mut self, now: Tick, cursor: usize, out: &mut W) -> TxState {
        let Some(session) = self.session.as_mut() else {
            return TxState::Idle;
        };

        if cursor == 0 {
            session.attempts += 1;
            info!(
                "tick {now}: transmitting frame, attempt {}/{}",
                session.attempts, self.config.max_attempts
            );
        }

        let end = match self.config.tx_pacing {
            Pacing::Burst => {
                out.put_slice(&session.frame[cursor..]);
                session.frame.len()
            }
            Pacing::PerByte => {
                out.put_byte(session.frame[cursor]);
                cursor + 1
            }
        };

        if end < session.frame.len() {
            TxState::Sending { cursor: end }
        } else {
            TxState::AwaitingAck {
                deadline: now.saturating_add(self.config.timeout_ticks),
            }
        }
    }

    fn await_ack<R: ByteSource + ?Sized>(&mut self, now: Tick, deadline: Tick, acks: &mut R) -> TxState {
        let mut nacked = false;
        while let Some(byte) = acks.next_byte() {
            if byte == self.config.ack_byte {
                info!("tick {now}: ACK after {} attempt(s)", self.attempts());
                return TxState::Succeeded;
            } else if Some(byte) == self.config.nack_byte {
                debug!("tick {now}: NACK received");
                nacked = true;
            } else {
                debug!("tick {now}: ignoring stray return byte 0x{byte:02X}");
            }
        }

        if !nacked && now < deadline {
            return TxState::AwaitingAck { deadline };
        }

        let attempts = self.attempts();
        if attempts < self.config.max_attempts {
            warn!(
                "tick {now}: {} on attempt {attempts}, retransmitting",
                if nacked { "NACK" } else { "timeout" }
            );
            TxState::Sending { cursor: 0 }
        } else {
            warn!("tick {now}: giving up after {attempts} attempts");
            TxState::Failed
        }
    }

    /// Force the session back to idle, dropping the frame in flight.
    ///
    /// Bytes already written are not retracted; the receiver has to
    /// resynchronize on its own. Returns whether anything was cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.session.is_none() {
            return false;
        }
        info!(
            "session cancelled in state {} after {} attempt(s)",
            self.state.name(),
            self.attempts()
        );
        self.reset();
        true
    }

    /// Clear a terminal (or any) state so a new payload can be sent.
    pub fn reset(&mut self) {
        self.state = TxState::Idle;
        self.session = None;
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn status(&self) -> TxStatus {
        match self.state {
            TxState::Idle => TxStatus::Idle,
            TxState::Sending { .. } | TxState::AwaitingAck { .. } => TxStatus::Pending,
            TxState::Succeeded => TxStatus::Succeeded,
            TxState::Failed => TxStatus::Failed,
        }
    }

    /// Transmissions started for the current session (0 when idle).
    pub fn attempts(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.attempts)
    }

    /// Payload of the current session.
    pub fn payload(&self) -> Option<&Bytes> {
        self.session.as_ref().map(|s| &s.payload)
    }

    /// Terminal result of the current session, if it has one.
    pub fn outcome(&self) -> Option<Result<u32, TransmitError>> {
        match self.state {
            TxState::Succeeded => Some(Ok(self.attempts())),
            TxState::Failed => Some(Err(TransmitError::AttemptsExhausted {
                attempts: self.attempts(),
            })),
            _ => None,
        }
    }
}
