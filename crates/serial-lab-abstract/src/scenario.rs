use crate::config::{LinkConfig, SimConfig};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub link: LinkConfig,
    #[serde(default)]
    pub config: SimConfigOverride,
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimConfigOverride {
    pub loss_rate: Option<f64>,
    pub corrupt_rate: Option<f64>,
    pub ack_loss_rate: Option<f64>,
    pub channel_capacity: Option<usize>,
    pub seed: Option<u64>,
    pub tick_budget: Option<u64>,
}

impl SimConfigOverride {
    pub fn apply_to(&self, config: &mut SimConfig) {
        if let Some(v) = self.loss_rate {
            config.loss_rate = v;
        }
        if let Some(v) = self.corrupt_rate {
            config.corrupt_rate = v;
        }
        if let Some(v) = self.ack_loss_rate {
            config.ack_loss_rate = v;
        }
        if let Some(v) = self.channel_capacity {
            config.channel_capacity = Some(v);
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.tick_budget {
            config.tick_budget = v;
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAction {
    /// Application asks for a text payload to be sent at `tick`
    AppSend { tick: u64, data: String },
    /// Application asks for a raw payload to be sent at `tick`
    AppSendBytes { tick: u64, bytes: Vec<u8> },
    /// Drop every forward byte written during the first transmission numbered `attempt`
    DropFrameOnAttempt { attempt: u32 },
    /// Drop the first ACK produced while the transmitter is on `attempt`
    DropAckOnAttempt { attempt: u32 },
    /// XOR `mask` into byte `offset` of the first transmission numbered `attempt`
    CorruptFrameOnAttempt { attempt: u32, offset: usize, mask: u8 },
    /// Write raw bytes onto the forward channel at `tick`
    InjectNoise { tick: u64, bytes: Vec<u8> },
    /// Force the transmitter back to idle at `tick`
    Cancel { tick: u64 },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// The payload reached the application layer at least once
    DataDelivered { data: String },
    /// Exact number of frames handed to the application layer
    DeliveredCount { count: usize },
    /// Send number `index` (in request order) ended in success
    SendSucceeded {
        #[serde(default)]
        index: usize,
        attempts: Option<u32>,
    },
    /// Send number `index` exhausted its attempts
    SendFailed {
        #[serde(default)]
        index: usize,
        attempts: Option<u32>,
    },
    /// Send number `index` was cancelled before resolving
    SendCancelled {
        #[serde(default)]
        index: usize,
    },
    /// Number of frames the receiver rejected is within range
    FramesRejected { min: u32, max: Option<u32> },
    /// Simulation resolves within this many ticks
    MaxTicks { ticks: u64 },
}
