use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, info};

use serial_lab_abstract::wire::{ACK, ETX, STX};
use serial_lab_abstract::{ChecksumKind, LinkConfig, Pacing, SimConfig};
use serial_lab_simulator::{SendResult, SimulationReport, Simulator, scenario_runner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Framed serial link simulator")]
struct Args {
    /// Load a scenario from disk and check its assertions.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Payload for an ad-hoc run.
    #[arg(long, default_value = "OLA")]
    payload: String,

    /// Tick at which the payload is handed to the transmitter.
    #[arg(long, default_value_t = 10)]
    send_at: u64,

    /// Ticks to wait for an ACK before retransmitting.
    #[arg(long, default_value_t = 100)]
    timeout: u64,

    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    #[arg(long, default_value_t = 10)]
    max_payload: u8,

    /// Probability that a forward byte is lost.
    #[arg(long, default_value_t = 0.0)]
    loss_rate: f64,

    /// Probability that a forward byte gets a bit flipped.
    #[arg(long, default_value_t = 0.0)]
    corrupt_rate: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Drop the ACK produced while on this attempt (repeatable).
    #[arg(long)]
    drop_ack_on_attempt: Vec<u32>,

    #[arg(long, default_value_t = 10_000)]
    tick_budget: u64,

    /// Transmit one frame byte per tick instead of the whole frame at once.
    #[arg(long, default_value_t = false)]
    per_byte: bool,

    /// Write a JSON trace of the finished simulation.
    #[arg(long)]
    trace_out: Option<PathBuf>,

    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!("serial-lab-sim-cli starting…");

    let report = if let Some(path) = &args.scenario {
        scenario_runner::run_scenario(path)?
    } else {
        run_adhoc_sim(&args)?
    };

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &report)?;
    }

    Ok(())
}

impl Args {
    fn link(&self) -> LinkConfig {
        LinkConfig {
            max_payload: self.max_payload,
            timeout_ticks: self.timeout,
            max_attempts: self.max_attempts,
            start_byte: STX,
            end_byte: ETX,
            ack_byte: ACK,
            nack_byte: None,
            checksum: ChecksumKind::Xor,
            tx_pacing: if self.per_byte {
                Pacing::PerByte
            } else {
                Pacing::Burst
            },
            rx_pacing: Pacing::PerByte,
        }
    }

    fn sim_config(&self) -> SimConfig {
        SimConfig {
            loss_rate: self.loss_rate,
            corrupt_rate: self.corrupt_rate,
            seed: self.seed,
            tick_budget: self.tick_budget,
            ..Default::default()
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn run_adhoc_sim(args: &Args) -> Result<SimulationReport> {
    let mut sim = Simulator::new(args.link(), args.sim_config())
        .context("Invalid link parameters")?;
    sim.schedule_app_send(args.send_at, args.payload.as_bytes().to_vec())?;
    for attempt in &args.drop_ack_on_attempt {
        sim.add_drop_ack_on_attempt(*attempt);
    }

    info!("Starting ad-hoc simulation…");
    let report = sim.run_until_complete()?;

    match report.outcomes.first() {
        Some(outcome) if outcome.result == SendResult::Succeeded => {
            info!(
                "Delivered {:?} after {} attempt(s), resolved at tick {}",
                args.payload, outcome.attempts, outcome.resolved_at
            );
        }
        Some(outcome) => bail!(
            "Send ended {:?} after {} attempt(s)",
            outcome.result,
            outcome.attempts
        ),
        None => bail!("Simulation finished without resolving the send"),
    }
    Ok(report)
}

fn write_trace(path: &Path, report: &SimulationReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize simulation trace")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}
