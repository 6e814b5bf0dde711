// A bandwidth-and-delay probing controller, loosely modeled on BBR: tracks
// a bottleneck-bandwidth estimate and a monotonically non-increasing
// minimum RTT, cycles through startup / steady / probe-up / probe-down /
// drain phases, and emits a paced send/receive batch schedule.

use crate::packet::{AckEvent, GroupId, InflightPacket, LossEvent};
use crate::rtt::RttStats;
use crate::time::{Duration, Timepoint};

use super::{CongestionControlType, CongestionController};

/// Construction-time configuration for `ProbingController`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbingConfig {
    /// Number of acks (once `recv_w` has grown to this) before startup may
    /// hand off to steady state. Typically in `[4, 16]`.
    pub period: u32,
    /// Gain applied to `cwnd` during a probe-up cycle. Typically `[0.1, 0.5]`.
    pub peak_gain: f64,
}

impl Default for ProbingConfig {
    fn default() -> Self {
        ProbingConfig {
            period: 8,
            peak_gain: 0.25,
        }
    }
}

/// The explicit phase the gain-cycling state machine is in.
///
/// Modeled as an enum rather than comparing `cwnd_gain` against `1.0` /
/// `1.0 + peak_gain` by floating-point equality, per the design note: the
/// cadence is identical, the equality hazard is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Startup,
    Steady,
    ProbeUp,
    ProbeDown,
    Drain,
}

const BOOTSTRAP_BDP: u32 = 10;
const RECV_ARRIVAL_ALPHA: f64 = 0.1;
/// Two packets sent within this long of each other are considered one
/// burst, so their arrival spacing reflects the bottleneck.
const BURST_SEND_GAP: Duration = Duration::from_micros(200);
const MAX_SEND_BATCH: u32 = 8;
/// The fixed pacing interval used by the `legacy-batch-size` alternative.
#[cfg(feature = "legacy-batch-size")]
const LEGACY_INTERVAL_MS: f64 = 20.0;

#[derive(Debug)]
pub struct ProbingController {
    config: ProbingConfig,

    // Bandwidth & RTT model.
    rt_prop: Duration,
    btl_bw: f64,
    avg_recv_dur: Option<Duration>,
    last_recv_at: Timepoint,
    last_sent_at: Timepoint,
    last_deflation_at: Timepoint,
    last_deflation_group: Option<GroupId>,

    // Delivery accounting.
    delivered: u64,
    inflight: u32,

    // Send/receive pacing state.
    send_w: u32,
    recv_w: u32,
    recv_num: u32,

    // Gain cycling.
    phase: Phase,
    cwnd_gain: f64,
    tic_num: u32,

    is_wait: bool,
}

impl ProbingController {
    pub fn new(config: ProbingConfig) -> Self {
        log::debug!(
            "probing: period={} peak_gain={}",
            config.period,
            config.peak_gain
        );
        ProbingController {
            config,
            rt_prop: Duration::infinite(),
            btl_bw: 0.0,
            avg_recv_dur: None,
            last_recv_at: Timepoint::uninitialized(),
            last_sent_at: Timepoint::uninitialized(),
            last_deflation_at: Timepoint::uninitialized(),
            last_deflation_group: None,
            delivered: 0,
            inflight: 0,
            send_w: 0,
            recv_w: 1,
            recv_num: 0,
            phase: Phase::Startup,
            cwnd_gain: 1.0,
            tic_num: 1,
            is_wait: false,
        }
    }

    /// Number of packets sent but not yet acked or declared lost. Exposed
    /// for diagnostics and property tests; not part of the controller
    /// contract itself.
    pub fn inflight(&self) -> u32 {
        self.inflight
    }

    /// The current minimum observed RTT; `Duration::infinite()` before the
    /// first sample.
    pub fn rt_prop(&self) -> Duration {
        self.rt_prop
    }

    fn is_startup(&self) -> bool {
        self.phase == Phase::Startup
    }

    fn is_drain(&self) -> bool {
        self.phase == Phase::Drain
    }

    /// `bdp = max(1, floor(rt_prop_ms * btl_bw))`.
    fn bdp(&self) -> u32 {
        if self.rt_prop.is_infinite() {
            return BOOTSTRAP_BDP;
        }
        let bdp = (self.rt_prop.as_millis_f64() * self.btl_bw).floor();
        (bdp as i64).max(1) as u32
    }

    fn cwnd_unbounded(&self) -> u32 {
        let bdp = self.bdp();
        bdp + self.recv_w.min(bdp / 4)
    }

    fn free_window(&self) -> u32 {
        self.cwnd_unbounded().saturating_sub(self.inflight)
    }

    fn update_bandwidth(&mut self, ack: &AckEvent, rtt_stats: &dyn RttStats) {
        self.rt_prop = self.rt_prop.min(rtt_stats.latest_rtt());

        if self.last_recv_at.is_initialized() {
            let inter_arrival = ack.received_at - self.last_recv_at;
            let inter_send = ack.sent_at - self.last_sent_at;
            if inter_send <= BURST_SEND_GAP {
                let sample = match self.avg_recv_dur {
                    None => inter_arrival,
                    Some(avg) => {
                        let blended = avg.as_micros() as f64 * (1.0 - RECV_ARRIVAL_ALPHA)
                            + inter_arrival.as_micros() as f64 * RECV_ARRIVAL_ALPHA;
                        Duration::from_micros(blended as u64)
                    }
                };
                self.avg_recv_dur = Some(sample);
                if !sample.is_zero() {
                    self.btl_bw = 1000.0 / sample.as_micros() as f64;
                }
            }
        }
        self.last_recv_at = ack.received_at;
        self.last_sent_at = ack.sent_at;

        self.maybe_deflate(ack, rtt_stats);
    }

    /// RTT-bloat-triggered bandwidth deflation: if the current smoothed RTT
    /// implies a queue has built up, and we haven't deflated since the
    /// group id last changed, scale the bandwidth estimate down.
    fn maybe_deflate(&mut self, ack: &AckEvent, rtt_stats: &dyn RttStats) {
        if self.btl_bw <= 0.0 || self.rt_prop.is_infinite() {
            return;
        }
        let serialization_budget = Duration::from_micros((2_000.0 / self.btl_bw) as u64);
        let bloat_threshold = self.rt_prop + serialization_budget;
        if rtt_stats.smoothed_rtt() <= bloat_threshold {
            return;
        }

        let group_changed = self.last_deflation_group != Some(ack.packet.group_id);
        let enough_time_passed = !self.last_deflation_at.is_initialized()
            || ack.received_at >= self.last_deflation_at + self.rt_prop;

        if group_changed && enough_time_passed {
            self.btl_bw *= 0.9;
            self.last_deflation_at = ack.received_at;
            self.last_deflation_group = Some(ack.packet.group_id);
            log::debug!(
                "probing: rtt spike ({:?} > {:?}), deflating btl_bw to {:.4}",
                rtt_stats.smoothed_rtt(),
                bloat_threshold,
                self.btl_bw
            );
        }
    }

    fn step_startup(&mut self) {
        if self.recv_w == 0 || self.recv_num % self.recv_w != 0 || self.recv_num == 0 {
            return;
        }

        self.send_w = (self.recv_w * 2).min(MAX_SEND_BATCH);

        let period = self.config.period;
        if self.recv_num + self.recv_w > period && self.recv_w <= period {
            self.recv_w += 1;
            self.recv_num = 0;
        }

        if self.recv_w > period {
            self.recv_w = period;
            let cwnd = self.cwnd_unbounded();
            if self.inflight >= cwnd.saturating_sub(self.send_w) {
                self.phase = Phase::Steady;
                self.tic_num = cwnd.max(1);
                log::debug!("probing: startup -> steady, recv_w={}", self.recv_w);
            }
        }
    }

    fn step_steady(&mut self) {
        if self.recv_num != self.recv_w {
            return;
        }
        self.recv_num = 0;

        let cwnd = self.cwnd_unbounded();
        let free = self.free_window();
        let shrink_threshold = self.recv_w.min(cwnd / 4);

        if free < shrink_threshold {
            self.send_w = 0;
            self.recv_w = 4.min(cwnd / 4).max(1);
            self.recv_num = cwnd.saturating_sub(self.inflight);
            log::debug!("probing: steady window starved, waiting for {} acks", self.recv_num);
        } else {
            self.send_w = (2 * self.recv_w).min(MAX_SEND_BATCH).min(free);
            self.recv_w = self.recv_w.min((cwnd / 2).max(1));
        }
    }

    /// Gain cycling on the send side: decrements `tic_num` on every send
    /// outside startup/drain, cycling steady -> probe-up -> probe-down ->
    /// steady as it hits zero.
    fn step_gain_cycle(&mut self) {
        if self.is_startup() || self.is_drain() {
            return;
        }

        if self.tic_num > 0 {
            self.tic_num -= 1;
        }
        if self.tic_num != 0 {
            return;
        }

        match self.phase {
            Phase::ProbeUp => {
                self.cwnd_gain = 1.0;
                self.tic_num = 1;
                self.phase = Phase::ProbeDown;
                log::debug!("probing: probing down, cwnd_gain={}", self.cwnd_gain);
            }
            Phase::ProbeDown => {
                self.cwnd_gain = 1.0;
                self.tic_num = self.cwnd_unbounded().max(1);
                self.phase = Phase::Steady;
                log::debug!("probing: probe-down complete, back to steady");
            }
            _ => {
                self.cwnd_gain = 1.0 + self.config.peak_gain;
                self.tic_num = self.cwnd_unbounded().max(1);
                self.phase = Phase::ProbeUp;
                log::debug!("probing: probing up, cwnd_gain={}", self.cwnd_gain);
            }
        }
    }

    fn step_drain(&mut self) {
        if !self.is_drain() {
            return;
        }
        if self.tic_num > 0 {
            self.tic_num -= 1;
        }
        if self.tic_num == 0 {
            self.cwnd_gain = 1.0;
            self.tic_num = self.cwnd_unbounded().max(1);
            self.phase = Phase::Steady;
            log::debug!("probing: drain complete, back to steady");
        }
    }

    #[cfg(feature = "legacy-batch-size")]
    fn legacy_batch_size(&self) -> u32 {
        let detect_bw = self.cwnd_gain * self.btl_bw;
        if self.rt_prop.is_infinite() {
            return BOOTSTRAP_BDP;
        }
        ((2.0 * LEGACY_INTERVAL_MS * detect_bw) as i64).max(1) as u32
    }
}

impl CongestionController for ProbingController {
    fn cc_type(&self) -> CongestionControlType {
        CongestionControlType::Probing
    }

    fn on_sent(&mut self, pkt: &mut InflightPacket) {
        pkt.delivered_at_send = self.delivered;
        pkt.needs_wait = self.is_wait;
        self.inflight += 1;
        self.send_w = self.send_w.saturating_sub(1);

        if self.is_drain() {
            self.step_drain();
        } else {
            self.step_gain_cycle();
        }

        log::trace!(
            "probing: sent seq={} delivered_at_send={} inflight={}",
            pkt.seq,
            pkt.delivered_at_send,
            self.inflight
        );
    }

    fn on_ack_or_loss(&mut self, ack: &AckEvent, loss: &LossEvent, rtt_stats: &dyn RttStats) {
        if !ack.valid && !loss.valid {
            log::warn!("probing: on_ack_or_loss called with no valid ack or loss, ignoring");
        }
        if loss.valid {
            self.on_loss(loss);
        }
        if ack.valid {
            self.on_ack(ack, rtt_stats);
        }
        debug_assert!(self.btl_bw >= 0.0);
    }

    fn get_cwnd(&self) -> u32 {
        // `cwnd_unbounded` (bdp + min(recv_w, bdp/4)) is exactly what the
        // sender is handed; `cwnd_gain` only drives the probe-up/drain
        // cadence (see `step_gain_cycle`) and the `legacy-batch-size`
        // pacing formula, not this value, so the pacing state machine's
        // own idea of "free window" (`free_window`, `step_steady`,
        // `on_loss`) stays consistent with what `get_cwnd` reports.
        self.cwnd_unbounded().max(1)
    }

    fn get_send_batch(&self) -> Option<u32> {
        #[cfg(feature = "legacy-batch-size")]
        {
            Some(self.legacy_batch_size())
        }
        #[cfg(not(feature = "legacy-batch-size"))]
        {
            Some(self.send_w)
        }
    }

    fn set_wait(&mut self, flag: bool) {
        self.is_wait = flag;
    }
}

impl ProbingController {
    fn on_ack(&mut self, ack: &AckEvent, rtt_stats: &dyn RttStats) {
        self.delivered += 1;
        self.inflight = self.inflight.saturating_sub(1);
        debug_assert!(ack.packet.delivered_at_send <= self.delivered);

        self.update_bandwidth(ack, rtt_stats);

        self.recv_num += 1;
        if self.is_startup() {
            self.step_startup();
        } else if self.phase == Phase::Steady {
            self.step_steady();
        }

        log::trace!(
            "probing: ack piece={} cwnd={} send_w={} phase={:?}",
            ack.packet.piece_id,
            self.get_cwnd(),
            self.send_w,
            self.phase
        );
    }

    fn on_loss(&mut self, loss: &LossEvent) {
        let lost_count = loss.len() as u32;
        self.inflight = self.inflight.saturating_sub(lost_count);

        if self.phase == Phase::ProbeUp {
            // A loss while probing for more bandwidth means the bottleneck
            // is already full; cut the probe short instead of riding the
            // gain out to a full cwnd worth of sends.
            self.cwnd_gain = 1.0;
            self.tic_num = self.cwnd_unbounded().max(1);
            self.phase = Phase::Drain;
            log::debug!("probing: loss during probe-up, entering drain early");
        }

        let cwnd = self.cwnd_unbounded();
        if self.inflight < cwnd {
            self.recv_num = 0;
            self.send_w = cwnd
                .saturating_sub(self.inflight)
                .min(lost_count)
                .min(MAX_SEND_BATCH);
        }

        log::debug!(
            "probing: loss of {} packet(s), inflight={}, send_w={}",
            lost_count,
            self.inflight,
            self.send_w
        );
    }
}
