pub mod config;
pub mod scenario;
pub mod wire;

pub use config::{ChecksumKind, ConfigError, LinkConfig, Pacing, SimConfig};
pub use scenario::{SimConfigOverride, TestAction, TestAssertion, TestScenario};
