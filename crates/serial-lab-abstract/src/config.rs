use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the frame checksum byte is accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumKind {
    /// Running XOR of the length byte and every payload byte.
    Xor,
    /// Wrapping 8-bit sum of the length byte and every payload byte.
    Additive,
}

/// How many bytes an endpoint moves per scheduling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Transmitter writes the whole frame, receiver drains everything available.
    Burst,
    /// One byte per step in either direction.
    PerByte,
}

/// Link parameters shared by both endpoints.
///
/// There is intentionally no `Default`: every value is part of the wire
/// contract and has to be chosen by the caller. The constants in
/// [`crate::wire`] cover the usual sentinel values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Largest payload the encoder accepts and the decoder admits.
    pub max_payload: u8,
    /// Ticks to wait for an acknowledgment before retransmitting.
    pub timeout_ticks: u64,
    /// Upper bound on transmissions of one frame, counted from 1.
    pub max_attempts: u32,
    pub start_byte: u8,
    pub end_byte: u8,
    pub ack_byte: u8,
    /// Optional negative acknowledgment. Treated like an early timeout.
    #[serde(default)]
    pub nack_byte: Option<u8>,
    pub checksum: ChecksumKind,
    pub tx_pacing: Pacing,
    pub rx_pacing: Pacing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_attempts must be at least 1")]
    NoAttempts,

    #[error("timeout_ticks must be at least 1")]
    ZeroTimeout,

    #[error("start and end sentinels must differ (both 0x{0:02X})")]
    SentinelClash(u8),

    #[error("ack and nack bytes must differ (both 0x{0:02X})")]
    AckNackClash(u8),
}

impl LinkConfig {
    /// Check the parameters that would make the state machines meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.timeout_ticks == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.start_byte == self.end_byte {
            return Err(ConfigError::SentinelClash(self.start_byte));
        }
        if self.nack_byte == Some(self.ack_byte) {
            return Err(ConfigError::AckNackClash(self.ack_byte));
        }
        Ok(())
    }

    /// Worst-case ticks a single send may take before it must be terminal.
    ///
    /// Covers every attempt's timeout plus the ticks spent putting the frame
    /// on the wire and the one-tick propagation of the acknowledgment.
    pub fn resolution_bound(&self) -> u64 {
        let frame_ticks = match self.tx_pacing {
            Pacing::Burst => 1,
            Pacing::PerByte => u64::from(self.max_payload) + 4,
        };
        u64::from(self.max_attempts) * (self.timeout_ticks + frame_ticks + 1) + 1
    }
}

/// Fault model and limits for the simulated medium.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Probability that a forward byte is silently dropped.
    pub loss_rate: f64,
    /// Probability that a forward byte gets a random bit flipped.
    pub corrupt_rate: f64,
    /// Probability that an ACK/NACK byte on the return path is dropped.
    pub ack_loss_rate: f64,
    /// Optional capacity of the forward channel in bytes.
    pub channel_capacity: Option<usize>,
    pub seed: u64,
    /// Ticks after which a run counts as livelocked.
    pub tick_budget: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            ack_loss_rate: 0.0,
            channel_capacity: None,
            seed: 0,
            tick_budget: 10_000,
        }
    }
}
