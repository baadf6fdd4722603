use anyhow::{Context, anyhow};
use serial_lab_abstract::{SimConfig, TestAction, TestAssertion, TestScenario};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::engine::{SendResult, Simulator};
use crate::trace::SimulationReport;

pub fn load_scenario(path: impl AsRef<Path>) -> anyhow::Result<TestScenario> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse scenario {}", path.display()))
}

/// Build a simulator with every action of the scenario registered.
pub fn build_simulator(scenario: &TestScenario) -> anyhow::Result<Simulator> {
    let mut config = SimConfig::default();
    scenario.config.apply_to(&mut config);

    let mut sim = Simulator::new(scenario.link.clone(), config)
        .with_context(|| format!("Scenario {:?} has an unusable link", scenario.name))?;

    // Configure actions (App sends, deterministic faults, etc.)
    for action in &scenario.actions {
        match action {
            TestAction::AppSend { tick, data } => {
                sim.schedule_app_send(*tick, data.as_bytes().to_vec())?;
            }
            TestAction::AppSendBytes { tick, bytes } => {
                sim.schedule_app_send(*tick, bytes.clone())?;
            }
            TestAction::DropFrameOnAttempt { attempt } => {
                sim.add_drop_frame_on_attempt(*attempt);
            }
            TestAction::DropAckOnAttempt { attempt } => {
                sim.add_drop_ack_on_attempt(*attempt);
            }
            TestAction::CorruptFrameOnAttempt {
                attempt,
                offset,
                mask,
            } => {
                sim.add_corrupt_frame_on_attempt(*attempt, *offset, *mask);
            }
            TestAction::InjectNoise { tick, bytes } => {
                sim.schedule_noise(*tick, bytes.clone());
            }
            TestAction::Cancel { tick } => {
                sim.schedule_cancel(*tick);
            }
        }
    }

    Ok(sim)
}

/// Run a scenario file and check its assertions.
pub fn run_scenario(path: impl AsRef<Path>) -> anyhow::Result<SimulationReport> {
    let scenario = load_scenario(path)?;
    run_loaded(&scenario)
}

pub fn run_loaded(scenario: &TestScenario) -> anyhow::Result<SimulationReport> {
    info!("Running Scenario: {}", scenario.name);
    if !scenario.description.is_empty() {
        info!("Description: {}", scenario.description);
    }

    let mut sim = build_simulator(scenario)?;
    let report = sim.run_until_complete()?;
    check_assertions(scenario, &report)?;

    info!("Test Scenario Passed!");
    Ok(report)
}

pub fn check_assertions(scenario: &TestScenario, report: &SimulationReport) -> anyhow::Result<()> {
    for assertion in &scenario.assertions {
        match assertion {
            TestAssertion::DataDelivered { data } => {
                let found = report.delivered_data.iter().any(|d| d == data.as_bytes());
                if !found {
                    return Err(anyhow!(
                        "Assertion Failed: Data {:?} was not delivered",
                        data
                    ));
                }
            }
            TestAssertion::DeliveredCount { count } => {
                if report.delivered_data.len() != *count {
                    return Err(anyhow!(
                        "Assertion Failed: {} frames delivered, expected {}",
                        report.delivered_data.len(),
                        count
                    ));
                }
            }
            TestAssertion::SendSucceeded { index, attempts } => {
                expect_outcome(report, *index, SendResult::Succeeded, *attempts)?;
            }
            TestAssertion::SendFailed { index, attempts } => {
                expect_outcome(report, *index, SendResult::Failed, *attempts)?;
            }
            TestAssertion::SendCancelled { index } => {
                expect_outcome(report, *index, SendResult::Cancelled, None)?;
            }
            TestAssertion::FramesRejected { min, max } => {
                let rejected = report.receiver.rejected;
                if rejected < *min {
                    return Err(anyhow!(
                        "Assertion Failed: Receiver rejected {} frames, expected min {}",
                        rejected,
                        min
                    ));
                }
                if let Some(max) = max
                    && rejected > *max
                {
                    return Err(anyhow!(
                        "Assertion Failed: Receiver rejected {} frames, expected max {}",
                        rejected,
                        max
                    ));
                }
            }
            TestAssertion::MaxTicks { ticks } => {
                if report.duration_ticks > *ticks {
                    return Err(anyhow!(
                        "Assertion Failed: Run took {} ticks, expected at most {}",
                        report.duration_ticks,
                        ticks
                    ));
                }
            }
        }
    }
    Ok(())
}

fn expect_outcome(
    report: &SimulationReport,
    index: usize,
    expected: SendResult,
    attempts: Option<u32>,
) -> anyhow::Result<()> {
    let outcome = report
        .outcomes
        .get(index)
        .ok_or_else(|| anyhow!("Assertion Failed: No outcome recorded for send #{index}"))?;
    if outcome.result != expected {
        return Err(anyhow!(
            "Assertion Failed: Send #{} ended {:?}, expected {:?}",
            index,
            outcome.result,
            expected
        ));
    }
    if let Some(attempts) = attempts
        && outcome.attempts != attempts
    {
        return Err(anyhow!(
            "Assertion Failed: Send #{} took {} attempts, expected {}",
            index,
            outcome.attempts,
            attempts
        ));
    }
    Ok(())
}
