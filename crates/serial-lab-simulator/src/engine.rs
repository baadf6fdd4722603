use crate::trace::{ChannelSummary, ReceiverSummary, SimulationReport};
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serial_lab_abstract::{ConfigError, LinkConfig, SimConfig};
use serial_lab_protocol::{
    ByteChannel, FrameError, FrameReceiver, LogicalClock, Tick, TransmitError, Transmitter,
    TxState, TxStatus,
};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid link configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transmit(#[from] TransmitError),

    /// The run did not resolve within its budget. Always a defect.
    #[error("scheduling budget of {budget} ticks exceeded with {unresolved} send(s) unresolved")]
    SchedulingBudgetExceeded { budget: u64, unresolved: usize },
}

/// A compact textual summary of important link events for the trace.
#[derive(Debug, Clone, Serialize)]
pub struct LinkEventSummary {
    pub tick: u64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendResult {
    Succeeded,
    Failed,
    Cancelled,
}

/// How one application send resolved.
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub payload: Vec<u8>,
    pub requested_at: u64,
    pub resolved_at: u64,
    pub attempts: u32,
    pub result: SendResult,
}

/// Fault armed for the transmission currently going out.
#[derive(Debug, Clone, Copy)]
enum FrameFault {
    Drop,
    Corrupt { offset: usize, mask: u8 },
}

#[derive(Debug)]
struct ActiveSend {
    payload: Bytes,
    requested_at: Tick,
}

/// Tick-driven harness running one transmitter and one receiver over a pair
/// of in-memory channels.
///
/// Every step follows the same order: inject a due send if the transmitter is
/// idle, step the transmitter, push its bytes through the fault model onto the
/// forward channel, step the receiver, answer a delivered frame with an ACK on
/// the return channel, advance the clock. An ACK written at tick `t` is
/// therefore first seen by the transmitter at `t + 1`.
pub struct Simulator {
    clock: LogicalClock,
    link: LinkConfig,
    config: SimConfig,
    rng: StdRng,

    transmitter: Transmitter,
    receiver: FrameReceiver,
    forward: ByteChannel,
    acks: ByteChannel,

    pending_sends: VecDeque<(Tick, Bytes)>,
    active: Option<ActiveSend>,

    // Stats for the report
    pub delivered_data: Vec<Bytes>,
    pub outcomes: Vec<SendOutcome>,
    pub forward_bytes_sent: u64,

    /// Timeline of link events (sends, drops, corruptions, deliveries, acks).
    pub link_events: Vec<LinkEventSummary>,

    // Deterministic fault injection, each entry consumed by its first match
    drop_frame_on_attempt: Vec<u32>,
    drop_ack_on_attempt: Vec<u32>,
    corrupt_frame_on_attempt: Vec<(u32, usize, u8)>,
    noise_at: Vec<(Tick, Vec<u8>)>,
    cancel_at: Vec<Tick>,

    frame_fault: Option<FrameFault>,
    tx_offset: usize,
}

impl Simulator {
    pub fn new(link: LinkConfig, config: SimConfig) -> Result<Self, SimError> {
        link.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        let forward = match config.channel_capacity {
            Some(cap) => ByteChannel::with_capacity(cap),
            None => ByteChannel::new(),
        };

        Ok(Self {
            clock: LogicalClock::new(),
            transmitter: Transmitter::new(&link),
            receiver: FrameReceiver::new(&link),
            link,
            config,
            rng,
            forward,
            acks: ByteChannel::new(),
            pending_sends: VecDeque::new(),
            active: None,
            delivered_data: Vec::new(),
            outcomes: Vec::new(),
            forward_bytes_sent: 0,
            link_events: Vec::new(),
            drop_frame_on_attempt: Vec::new(),
            drop_ack_on_attempt: Vec::new(),
            corrupt_frame_on_attempt: Vec::new(),
            noise_at: Vec::new(),
            cancel_at: Vec::new(),
            frame_fault: None,
            tx_offset: 0,
        })
    }

    /// Queue an application send. Sends run one at a time in tick order.
    pub fn schedule_app_send(&mut self, tick: Tick, data: impl Into<Bytes>) -> Result<(), SimError> {
        let data = data.into();
        let max = usize::from(self.link.max_payload);
        if data.len() > max {
            return Err(SimError::Transmit(TransmitError::Frame(
                FrameError::PayloadTooLarge {
                    size: data.len(),
                    max,
                },
            )));
        }
        let pos = self.pending_sends.partition_point(|(t, _)| *t <= tick);
        self.pending_sends.insert(pos, (tick, data));
        Ok(())
    }

    /// Register a deterministic fault: lose every byte of the first transmission numbered `attempt`.
    pub fn add_drop_frame_on_attempt(&mut self, attempt: u32) {
        self.drop_frame_on_attempt.push(attempt);
    }

    /// Register a deterministic fault: lose the first ACK produced while the transmitter is on `attempt`.
    pub fn add_drop_ack_on_attempt(&mut self, attempt: u32) {
        self.drop_ack_on_attempt.push(attempt);
    }

    /// Register a deterministic fault: XOR `mask` into byte `offset` of the first transmission numbered `attempt`.
    pub fn add_corrupt_frame_on_attempt(&mut self, attempt: u32, offset: usize, mask: u8) {
        self.corrupt_frame_on_attempt.push((attempt, offset, mask));
    }

    /// Write raw bytes onto the forward channel at `tick`, bypassing the fault model.
    pub fn schedule_noise(&mut self, tick: Tick, bytes: Vec<u8>) {
        self.noise_at.push((tick, bytes));
    }

    /// Force the transmitter back to idle at `tick`.
    pub fn schedule_cancel(&mut self, tick: Tick) {
        self.cancel_at.push(tick);
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.now()
    }

    pub fn link(&self) -> &LinkConfig {
        &self.link
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn transmitter(&self) -> &Transmitter {
        &self.transmitter
    }

    pub fn receiver(&self) -> &FrameReceiver {
        &self.receiver
    }

    pub fn forward_channel(&self) -> &ByteChannel {
        &self.forward
    }

    pub fn return_channel(&self) -> &ByteChannel {
        &self.acks
    }

    /// Sends queued or in flight.
    pub fn unresolved_sends(&self) -> usize {
        self.pending_sends.len() + usize::from(self.active.is_some())
    }

    pub fn is_finished(&self) -> bool {
        self.unresolved_sends() == 0
    }

    /// Run one scheduling step and advance the clock.
    pub fn step(&mut self) {
        let now = self.clock.now();

        self.inject_noise(now);
        self.apply_cancellation(now);
        self.start_due_send(now);

        if self.transmitter.state() == (TxState::Sending { cursor: 0 }) {
            self.arm_frame_fault(self.transmitter.attempts() + 1);
        }
        let mut outbox: Vec<u8> = Vec::new();
        let status = self.transmitter.tick(now, &mut outbox, &mut self.acks);
        self.process_outgoing(now, outbox);

        if let Some(payload) = self.receiver.tick(&mut self.forward) {
            self.deliver(now, payload);
        } else if let Some(err) = self.receiver.rejection()
            && let Some(nack) = self.link.nack_byte
        {
            self.push_event(now, format!("[Receiver] REJECT ({err}), sending NACK"));
            self.send_return(now, nack);
        }

        if matches!(status, TxStatus::Succeeded | TxStatus::Failed) {
            self.resolve_active(now, status);
        }

        self.clock.advance();
    }

    /// Step until every queued send has resolved.
    pub fn run_until_complete(&mut self) -> Result<SimulationReport, SimError> {
        let budget = self.config.tick_budget;
        while !self.is_finished() {
            if self.clock.now() >= budget {
                warn!("tick budget {budget} exhausted");
                return Err(SimError::SchedulingBudgetExceeded {
                    budget,
                    unresolved: self.unresolved_sends(),
                });
            }
            self.step();
        }
        info!("simulation finished at tick {}", self.clock.now());
        Ok(self.export_report())
    }

    /// Produce a serializable snapshot of the current simulation state.
    pub fn export_report(&self) -> SimulationReport {
        SimulationReport {
            link: self.link.clone(),
            config: self.config.clone(),
            duration_ticks: self.clock.now(),
            delivered_data: self.delivered_data.iter().map(|b| b.to_vec()).collect(),
            outcomes: self.outcomes.clone(),
            forward_bytes_sent: self.forward_bytes_sent,
            receiver: ReceiverSummary::from(self.receiver.stats()),
            forward_channel: ChannelSummary::from(self.forward.stats()),
            link_events: self.link_events.clone(),
        }
    }

    fn inject_noise(&mut self, now: Tick) {
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.noise_at)
            .into_iter()
            .partition(|(t, _)| *t == now);
        self.noise_at = later;
        for (_, bytes) in due {
            self.push_event(now, format!("[Noise->Receiver] INJECT {} bytes", bytes.len()));
            for b in bytes {
                self.forward.send(b);
            }
        }
    }

    fn apply_cancellation(&mut self, now: Tick) {
        let Some(pos) = self.cancel_at.iter().position(|t| *t == now) else {
            return;
        };
        self.cancel_at.remove(pos);
        let attempts = self.transmitter.attempts();
        if self.transmitter.cancel() {
            self.push_event(now, format!("[Transmitter] CANCEL after {attempts} attempt(s)"));
            if let Some(active) = self.active.take() {
                self.record_outcome(active, now, attempts, SendResult::Cancelled);
            }
            self.frame_fault = None;
        }
    }

    fn start_due_send(&mut self, now: Tick) {
        let due = matches!(self.pending_sends.front(), Some((t, _)) if *t <= now);
        if !due {
            return;
        }
        if self.transmitter.state().is_terminal() {
            self.transmitter.reset();
        }
        if self.transmitter.state() != TxState::Idle {
            return;
        }
        let Some((_, payload)) = self.pending_sends.pop_front() else {
            return;
        };
        match self.transmitter.request_send(&payload) {
            Ok(()) => {
                info!("tick {now}: application send of {} bytes", payload.len());
                let stale = self.acks.discard_pending();
                if stale > 0 {
                    debug!("discarded {stale} stale return byte(s)");
                }
                self.active = Some(ActiveSend {
                    payload,
                    requested_at: now,
                });
            }
            Err(err) => {
                warn!("tick {now}: send refused: {err}");
                self.push_event(now, format!("[Transmitter] REFUSED send: {err}"));
                let refused = ActiveSend {
                    payload,
                    requested_at: now,
                };
                self.record_outcome(refused, now, 0, SendResult::Failed);
            }
        }
    }

    fn arm_frame_fault(&mut self, attempt: u32) {
        self.tx_offset = 0;
        self.frame_fault = None;
        if let Some(pos) = self
            .drop_frame_on_attempt
            .iter()
            .position(|a| *a == attempt)
        {
            self.drop_frame_on_attempt.remove(pos);
            self.frame_fault = Some(FrameFault::Drop);
        } else if let Some(pos) = self
            .corrupt_frame_on_attempt
            .iter()
            .position(|(a, _, _)| *a == attempt)
        {
            let (_, offset, mask) = self.corrupt_frame_on_attempt.remove(pos);
            self.frame_fault = Some(FrameFault::Corrupt { offset, mask });
        }
    }

    // Forward path (Channel)
    fn process_outgoing(&mut self, now: Tick, outbox: Vec<u8>) {
        if outbox.is_empty() {
            return;
        }
        let attempt = self.transmitter.attempts();
        let fault = self.frame_fault;
        let queued_before = self.forward.len();

        for byte in outbox {
            self.forward_bytes_sent += 1;
            let offset = self.tx_offset;
            self.tx_offset += 1;
            let mut lost = false;
            let mut mask = 0u8;

            match fault {
                Some(FrameFault::Drop) => {
                    if offset == 0 {
                        self.push_event(
                            now,
                            format!("[Transmitter->Receiver] DROP (deterministic) attempt={attempt}"),
                        );
                    }
                    lost = true;
                }
                Some(FrameFault::Corrupt { offset: at, mask: m }) if at == offset => {
                    self.push_event(
                        now,
                        format!(
                            "[Transmitter->Receiver] CORRUPT (deterministic) attempt={attempt} offset={offset} mask=0x{m:02X}"
                        ),
                    );
                    mask ^= m;
                }
                _ => {}
            }

            if !lost && self.config.loss_rate > 0.0 && self.rng.random::<f64>() < self.config.loss_rate {
                self.push_event(
                    now,
                    format!("[Transmitter->Receiver] DROP (random loss) offset={offset}"),
                );
                lost = true;
            }

            if !lost
                && self.config.corrupt_rate > 0.0
                && self.rng.random::<f64>() < self.config.corrupt_rate
            {
                let bit = self.rng.random_range(0..8u32);
                self.push_event(
                    now,
                    format!("[Transmitter->Receiver] CORRUPT (random) offset={offset} bit={bit}"),
                );
                mask ^= 1 << bit;
            }

            if lost {
                self.forward.drop_next(1);
            } else if mask != 0 {
                self.forward.corrupt_next(mask);
            }
            self.forward.send(byte);
        }

        // the receiver has not run yet this step, so the queue only grew
        let queued = self.forward.len() - queued_before;
        if queued > 0 {
            self.push_event(
                now,
                format!("[Transmitter->Receiver] SEND {queued} bytes (attempt={attempt})"),
            );
        }
    }

    fn deliver(&mut self, now: Tick, payload: Bytes) {
        info!("tick {now}: [Receiver] DELIVERED DATA: {} bytes", payload.len());
        self.push_event(
            now,
            format!("[Receiver] DELIVERED {} bytes to application", payload.len()),
        );
        self.delivered_data.push(payload);

        let attempt = self.transmitter.attempts();
        if let Some(pos) = self.drop_ack_on_attempt.iter().position(|a| *a == attempt) {
            self.drop_ack_on_attempt.remove(pos);
            self.push_event(
                now,
                format!("[Receiver->Transmitter] DROP (deterministic ack) attempt={attempt}"),
            );
            debug!("deterministically dropping ACK for attempt {attempt}");
            return;
        }
        self.send_return(now, self.link.ack_byte);
    }

    // Return path
    fn send_return(&mut self, now: Tick, byte: u8) {
        if self.config.ack_loss_rate > 0.0 && self.rng.random::<f64>() < self.config.ack_loss_rate {
            self.push_event(
                now,
                format!("[Receiver->Transmitter] DROP (random loss) byte=0x{byte:02X}"),
            );
            return;
        }
        self.push_event(now, format!("[Receiver->Transmitter] SEND 0x{byte:02X}"));
        self.acks.send(byte);
    }

    fn resolve_active(&mut self, now: Tick, status: TxStatus) {
        let Some(active) = self.active.take() else {
            return;
        };
        let attempts = self.transmitter.attempts();
        let result = if status == TxStatus::Succeeded {
            SendResult::Succeeded
        } else {
            SendResult::Failed
        };
        self.push_event(
            now,
            format!("[Transmitter] {result:?} after {attempts} attempt(s)"),
        );
        self.record_outcome(active, now, attempts, result);
    }

    fn record_outcome(&mut self, active: ActiveSend, now: Tick, attempts: u32, result: SendResult) {
        self.outcomes.push(SendOutcome {
            payload: active.payload.to_vec(),
            requested_at: active.requested_at,
            resolved_at: now,
            attempts,
            result,
        });
    }

    fn push_event(&mut self, tick: Tick, description: String) {
        self.link_events.push(LinkEventSummary { tick, description });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_lab_abstract::wire::{ACK, ETX, NACK, STX};
    use serial_lab_abstract::{ChecksumKind, Pacing};

    fn link() -> LinkConfig {
        LinkConfig {
            max_payload: 10,
            timeout_ticks: 100,
            max_attempts: 3,
            start_byte: STX,
            end_byte: ETX,
            ack_byte: ACK,
            nack_byte: None,
            checksum: ChecksumKind::Xor,
            tx_pacing: Pacing::Burst,
            rx_pacing: Pacing::PerByte,
        }
    }

    fn sim(link: LinkConfig) -> Simulator {
        Simulator::new(link, SimConfig::default()).unwrap()
    }

    #[test]
    fn test_first_ack_succeeds_on_attempt_one() {
        let mut sim = sim(link());
        sim.schedule_app_send(10, &b"OLA"[..]).unwrap();
        let report = sim.run_until_complete().unwrap();

        assert_eq!(sim.transmitter().state(), TxState::Succeeded);
        assert_eq!(sim.transmitter().attempts(), 1);
        assert_eq!(report.delivered_data, vec![b"OLA".to_vec()]);
        // 7 bytes read at ticks 10..=16, ACK seen at 17
        assert_eq!(report.outcomes[0].resolved_at, 17);
        assert_eq!(report.outcomes[0].result, SendResult::Succeeded);
    }

    #[test]
    fn test_lost_ack_retries_after_timeout() {
        let mut sim = sim(link());
        sim.schedule_app_send(10, &b"OLA"[..]).unwrap();
        sim.add_drop_ack_on_attempt(1);
        let report = sim.run_until_complete().unwrap();

        assert_eq!(sim.transmitter().state(), TxState::Succeeded);
        assert_eq!(sim.transmitter().attempts(), 2);
        // frame delivered twice, the second copy is acknowledged
        assert_eq!(report.delivered_data.len(), 2);
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.resolved_at > 110);
    }

    #[test]
    fn test_dropped_frames_until_last_attempt() {
        let mut sim = sim(link());
        sim.schedule_app_send(0, &b"DADO"[..]).unwrap();
        sim.add_drop_frame_on_attempt(1);
        sim.add_drop_frame_on_attempt(2);
        sim.run_until_complete().unwrap();

        assert_eq!(sim.transmitter().state(), TxState::Succeeded);
        assert_eq!(sim.transmitter().attempts(), 3);
        assert_eq!(sim.delivered_data.len(), 1);
    }

    #[test]
    fn test_no_ack_ever_fails_at_max_attempts() {
        let mut sim = sim(link());
        sim.schedule_app_send(0, &b"x"[..]).unwrap();
        for attempt in 1..=3 {
            sim.add_drop_frame_on_attempt(attempt);
        }
        let report = sim.run_until_complete().unwrap();

        assert_eq!(sim.transmitter().state(), TxState::Failed);
        assert_eq!(sim.transmitter().attempts(), 3);
        assert_eq!(report.outcomes[0].result, SendResult::Failed);
        // 3 attempts of a 5 byte frame, all lost
        assert_eq!(report.forward_channel.dropped, 15);
        assert_eq!(report.forward_bytes_sent, 15);
        assert!(report.delivered_data.is_empty());
        assert!(report.duration_ticks <= sim.link().resolution_bound());
    }

    #[test]
    fn test_corrupted_frame_is_rejected_then_retried() {
        let mut sim = sim(link());
        sim.schedule_app_send(0, &b"OLA"[..]).unwrap();
        // flip the first payload byte
        sim.add_corrupt_frame_on_attempt(1, 2, 0xFF);
        let report = sim.run_until_complete().unwrap();

        assert_eq!(sim.transmitter().attempts(), 2);
        assert_eq!(report.receiver.checksum_mismatches, 1);
        assert_eq!(report.forward_channel.corrupted, 1);
        assert_eq!(report.delivered_data, vec![b"OLA".to_vec()]);
    }

    #[test]
    fn test_nack_shortcuts_timeout() {
        let mut cfg = link();
        cfg.nack_byte = Some(NACK);
        let mut sim = sim(cfg);
        sim.schedule_app_send(0, &b"OLA"[..]).unwrap();
        sim.add_corrupt_frame_on_attempt(1, 2, 0x01);
        let report = sim.run_until_complete().unwrap();

        assert_eq!(report.outcomes[0].attempts, 2);
        assert!(report.outcomes[0].resolved_at < 100);
        assert!(
            report
                .link_events
                .iter()
                .any(|e| e.description.contains("NACK"))
        );
    }

    #[test]
    fn test_noise_before_frame_is_ignored() {
        let mut sim = sim(link());
        sim.schedule_noise(0, vec![0x55, 0x55, 0x55]);
        sim.schedule_app_send(0, &b"OLA"[..]).unwrap();
        sim.run_until_complete().unwrap();
        assert_eq!(sim.transmitter().attempts(), 1);
        assert_eq!(sim.delivered_data.len(), 1);
    }

    #[test]
    fn test_queued_sends_run_in_order() {
        let mut sim = sim(link());
        sim.schedule_app_send(50, &b"two"[..]).unwrap();
        sim.schedule_app_send(0, &b"one"[..]).unwrap();
        let report = sim.run_until_complete().unwrap();

        let payloads: Vec<&[u8]> = report.outcomes.iter().map(|o| o.payload.as_slice()).collect();
        assert_eq!(payloads, vec![&b"one"[..], &b"two"[..]]);
        assert!(report.outcomes.iter().all(|o| o.result == SendResult::Succeeded));
        assert_eq!(report.outcomes[1].requested_at, 50);
    }

    #[test]
    fn test_cancel_mid_frame_then_receiver_resyncs() {
        let mut cfg = link();
        cfg.tx_pacing = Pacing::PerByte;
        let mut sim = sim(cfg);
        sim.schedule_app_send(0, &b"abandon"[..]).unwrap();
        // only START has gone out when the cancel lands
        sim.schedule_cancel(1);
        sim.schedule_app_send(5, &b"hello"[..]).unwrap();
        let report = sim.run_until_complete().unwrap();

        assert_eq!(report.outcomes[0].result, SendResult::Cancelled);
        assert_eq!(report.outcomes[0].attempts, 1);
        // the orphaned START swallows the first copy, the retransmission gets through
        assert_eq!(report.outcomes[1].result, SendResult::Succeeded);
        assert_eq!(report.outcomes[1].attempts, 2);
        assert_eq!(report.delivered_data, vec![b"hello".to_vec()]);
        assert_eq!(report.receiver.rejected, 1);
    }

    #[test]
    fn test_budget_exceeded_is_an_error() {
        let mut sim = Simulator::new(
            link(),
            SimConfig {
                tick_budget: 20,
                ..Default::default()
            },
        )
        .unwrap();
        sim.schedule_app_send(0, &b"x"[..]).unwrap();
        sim.add_drop_ack_on_attempt(1);
        let err = sim.run_until_complete().unwrap_err();
        assert!(matches!(
            err,
            SimError::SchedulingBudgetExceeded {
                budget: 20,
                unresolved: 1
            }
        ));
    }

    #[test]
    fn test_oversized_send_is_refused_up_front() {
        let mut sim = sim(link());
        let err = sim.schedule_app_send(0, vec![0u8; 11]).unwrap_err();
        assert!(matches!(
            err,
            SimError::Transmit(TransmitError::Frame(FrameError::PayloadTooLarge { .. }))
        ));
        assert!(sim.is_finished());
    }

    #[test]
    fn test_refused_request_is_recorded_as_failed() {
        let mut sim = sim(link());
        // bypasses the check done when scheduling
        sim.pending_sends.push_back((0, Bytes::from(vec![0u8; 11])));
        let report = sim.run_until_complete().unwrap();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].result, SendResult::Failed);
        assert_eq!(report.outcomes[0].attempts, 0);
        assert_eq!(report.outcomes[0].payload.len(), 11);
        assert_eq!(report.forward_bytes_sent, 0);
    }

    #[test]
    fn test_nack_on_last_attempt_fails_without_waiting() {
        let mut cfg = link();
        cfg.nack_byte = Some(NACK);
        let mut sim = sim(cfg);
        sim.schedule_app_send(0, &b"OLA"[..]).unwrap();
        for attempt in 1..=3 {
            sim.add_corrupt_frame_on_attempt(attempt, 2, 0x01);
        }
        let report = sim.run_until_complete().unwrap();

        assert_eq!(sim.transmitter().state(), TxState::Failed);
        assert_eq!(report.outcomes[0].result, SendResult::Failed);
        assert_eq!(report.outcomes[0].attempts, 3);
        assert!(report.outcomes[0].resolved_at < 100);
        assert_eq!(report.receiver.checksum_mismatches, 3);
        assert!(report.delivered_data.is_empty());
    }

    #[test]
    fn test_return_path_loss_exhausts_attempts() {
        let mut sim = Simulator::new(
            link(),
            SimConfig {
                ack_loss_rate: 1.0,
                ..Default::default()
            },
        )
        .unwrap();
        sim.schedule_app_send(0, &b"OLA"[..]).unwrap();
        let report = sim.run_until_complete().unwrap();

        // every copy arrives, every ACK is lost
        assert_eq!(report.delivered_data.len(), 3);
        assert_eq!(report.outcomes[0].result, SendResult::Failed);
        assert_eq!(report.outcomes[0].attempts, 3);
        assert_eq!(
            report
                .link_events
                .iter()
                .filter(|e| e.description.contains("DROP (random loss) byte=0x06"))
                .count(),
            3
        );
    }

    #[test]
    fn test_bounded_forward_channel_truncates_frames() {
        let mut sim = Simulator::new(
            link(),
            SimConfig {
                channel_capacity: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
        sim.schedule_app_send(0, &b"OLA"[..]).unwrap();
        let report = sim.run_until_complete().unwrap();

        // 7 byte frame, only 3 fit per burst
        assert_eq!(report.forward_channel.overflowed, 12);
        assert_eq!(report.forward_bytes_sent, 21);
        assert!(report.delivered_data.is_empty());
        assert_eq!(report.outcomes[0].result, SendResult::Failed);
        assert_eq!(report.outcomes[0].attempts, 3);
        assert!(
            report
                .link_events
                .iter()
                .any(|e| e.tick == 0 && e.description.contains("SEND 3 bytes (attempt=1)"))
        );
    }

    #[test]
    fn test_invalid_link_is_refused() {
        let mut cfg = link();
        cfg.max_attempts = 0;
        assert!(matches!(
            Simulator::new(cfg, SimConfig::default()),
            Err(SimError::Config(ConfigError::NoAttempts))
        ));
    }

    #[test]
    fn test_seeded_random_loss_is_reproducible() {
        let run = || {
            let mut sim = Simulator::new(
                link(),
                SimConfig {
                    loss_rate: 0.05,
                    corrupt_rate: 0.05,
                    seed: 42,
                    ..Default::default()
                },
            )
            .unwrap();
            sim.schedule_app_send(0, &b"hello"[..]).unwrap();
            sim.schedule_app_send(400, &b"world"[..]).unwrap();
            sim.run_until_complete().unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.duration_ticks, b.duration_ticks);
        assert_eq!(a.outcomes.len(), 2);
        assert_eq!(
            a.outcomes.iter().map(|o| o.attempts).collect::<Vec<_>>(),
            b.outcomes.iter().map(|o| o.attempts).collect::<Vec<_>>()
        );
    }
}
