pub mod engine;
pub mod scenario_runner;
pub mod trace;

pub use engine::{LinkEventSummary, SendOutcome, SendResult, SimError, Simulator};
pub use trace::{ChannelSummary, ReceiverSummary, SimulationReport};
