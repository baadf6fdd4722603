use serde::Serialize;
use serial_lab_abstract::{LinkConfig, SimConfig};
use serial_lab_protocol::{ChannelStats, ReceiverStats};

use crate::engine::{LinkEventSummary, SendOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub link: LinkConfig,
    pub config: SimConfig,
    pub duration_ticks: u64,
    pub delivered_data: Vec<Vec<u8>>,
    pub outcomes: Vec<SendOutcome>,
    pub forward_bytes_sent: u64,
    pub receiver: ReceiverSummary,
    pub forward_channel: ChannelSummary,
    pub link_events: Vec<LinkEventSummary>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReceiverSummary {
    pub accepted: u32,
    pub rejected: u32,
    pub checksum_mismatches: u32,
    pub unexpected_ends: u32,
    pub oversized: u32,
    pub bytes_consumed: u64,
}

impl From<ReceiverStats> for ReceiverSummary {
    fn from(stats: ReceiverStats) -> Self {
        Self {
            accepted: stats.accepted,
            rejected: stats.rejected,
            checksum_mismatches: stats.checksum_mismatches,
            unexpected_ends: stats.unexpected_ends,
            oversized: stats.oversized,
            bytes_consumed: stats.bytes_consumed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChannelSummary {
    pub written: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub overflowed: u64,
    pub corrupted: u64,
}

impl From<ChannelStats> for ChannelSummary {
    fn from(stats: ChannelStats) -> Self {
        Self {
            written: stats.written,
            delivered: stats.delivered,
            dropped: stats.dropped,
            overflowed: stats.overflowed,
            corrupted: stats.corrupted,
        }
    }
}
