// Classic slow-start + congestion-avoidance Reno, with a loss-burst filter
// that treats small loss bursts as link noise rather than a congestion
// signal.

use std::collections::HashMap;

use crate::packet::{max_sent_at, AckEvent, InflightPacket, LossEvent, PieceId};
use crate::rtt::RttStats;

use super::{CongestionControlType, CongestionController};

/// Construction-time configuration for `RenoController`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenoConfig {
    pub min_cwnd: u32,
    pub max_cwnd: u32,
    pub ss_thresh: u32,
}

impl Default for RenoConfig {
    fn default() -> Self {
        RenoConfig {
            min_cwnd: 1,
            max_cwnd: 64,
            ss_thresh: 32,
        }
    }
}

#[derive(Debug)]
pub struct RenoController {
    cwnd: u32,
    cwnd_cnt: u32,
    ss_thresh: u32,
    min_cwnd: u32,
    max_cwnd: u32,

    /// Diagnostic only: the CWND in effect when each piece was sent. Used
    /// to classify loss bursts; safe to clear without affecting CWND math.
    cwnd_at_send: HashMap<PieceId, u32>,
}

impl RenoController {
    pub fn new(config: RenoConfig) -> Self {
        log::debug!(
            "reno: min_cwnd={} max_cwnd={} ss_thresh={}",
            config.min_cwnd,
            config.max_cwnd,
            config.ss_thresh
        );
        RenoController {
            cwnd: config.min_cwnd.max(1),
            cwnd_cnt: 0,
            ss_thresh: config.ss_thresh,
            min_cwnd: config.min_cwnd,
            max_cwnd: config.max_cwnd,
            cwnd_at_send: HashMap::new(),
        }
    }

    fn in_slow_start(&self) -> bool {
        self.cwnd < self.ss_thresh
    }

    fn bound_cwnd(&self, cwnd: u32) -> u32 {
        cwnd.max(self.min_cwnd).min(self.max_cwnd)
    }

    fn on_ack(&mut self, ack: &AckEvent) {
        if self.in_slow_start() {
            self.cwnd += 1;
            if self.cwnd >= self.ss_thresh {
                self.ss_thresh = self.cwnd;
                log::debug!("reno: exiting slow start, ss_thresh={}", self.ss_thresh);
            }
        } else {
            // Division and the reset comparison both use the window size
            // in effect *before* this ack's increment: cwnd_cnt counts up
            // to one full window's worth of acks before granting +1 and
            // resetting, which is what yields "+1 segment per RTT".
            let window = self.cwnd;
            self.cwnd_cnt += 1;
            self.cwnd += self.cwnd_cnt / window;
            if self.cwnd_cnt == window {
                self.cwnd_cnt = 0;
            }
        }
        self.cwnd = self.bound_cwnd(self.cwnd);
        log::trace!("reno: ack for piece {} -> cwnd={}", ack.packet.piece_id, self.cwnd);
    }

    fn on_loss(&mut self, loss: &LossEvent) {
        let mut max_cwnd_at_send = 0u32;
        for pkt in &loss.lost_packets {
            if let Some(&recorded) = self.cwnd_at_send.get(&pkt.piece_id) {
                max_cwnd_at_send = max_cwnd_at_send.max(recorded);
            }
        }
        let max_loss_sent_at = max_sent_at(&loss.lost_packets);

        let burst_floor = ((self.cwnd as f64 * 0.01).ceil() as u32).max(3);
        if (loss.len() as u32) < burst_floor {
            log::debug!(
                "reno: ignoring loss burst of {} (< {}) sent up to {:?}, treating as random loss",
                loss.len(),
                burst_floor,
                max_loss_sent_at
            );
            return;
        }

        let was_in_slow_start = self.in_slow_start();
        self.cwnd = self.bound_cwnd(self.cwnd / 2);
        if !was_in_slow_start {
            self.ss_thresh = self.cwnd;
        }
        log::debug!(
            "reno: loss burst of {} sent up to {:?} (max cwnd_at_send={}), halving to cwnd={}",
            loss.len(),
            max_loss_sent_at,
            max_cwnd_at_send,
            self.cwnd
        );
    }
}

impl CongestionController for RenoController {
    fn cc_type(&self) -> CongestionControlType {
        CongestionControlType::Reno
    }

    fn on_sent(&mut self, pkt: &mut InflightPacket) {
        self.cwnd_at_send.insert(pkt.piece_id, self.cwnd);
    }

    fn on_ack_or_loss(&mut self, ack: &AckEvent, loss: &LossEvent, _rtt_stats: &dyn RttStats) {
        if !ack.valid && !loss.valid {
            log::warn!("reno: on_ack_or_loss called with no valid ack or loss, ignoring");
        }
        if loss.valid {
            self.on_loss(loss);
        }
        if ack.valid {
            self.on_ack(ack);
        }
        debug_assert!(self.cwnd >= self.min_cwnd && self.cwnd <= self.max_cwnd);
    }

    fn get_cwnd(&self) -> u32 {
        self.cwnd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtt::SampledRttStats;
    use crate::time::Timepoint;

    fn ack_for(piece_id: PieceId) -> AckEvent {
        AckEvent {
            valid: true,
            packet: InflightPacket::new(piece_id, piece_id, 0, Timepoint::zero()),
            sent_at: Timepoint::zero(),
            lost_at: Timepoint::infinite(),
            received_at: Timepoint::zero(),
            is_last_in_group: true,
        }
    }

    fn no_loss() -> LossEvent {
        LossEvent::invalid()
    }

    fn drive_acks(cc: &mut RenoController, rtt: &SampledRttStats, n: u64) {
        for i in 0..n {
            cc.on_ack_or_loss(&ack_for(i), &no_loss(), rtt);
        }
    }

    #[test]
    fn slow_start_then_congestion_avoidance() {
        let mut cc = RenoController::new(RenoConfig {
            min_cwnd: 1,
            max_cwnd: 64,
            ss_thresh: 4,
        });
        let rtt = SampledRttStats::new();

        drive_acks(&mut cc, &rtt, 8);
        assert_eq!(cc.get_cwnd(), 5);
    }

    #[test]
    fn empty_ack_and_loss_event_is_a_no_op() {
        let mut cc = RenoController::new(RenoConfig::default());
        let rtt = SampledRttStats::new();
        let before = cc.get_cwnd();
        cc.on_ack_or_loss(&AckEvent::invalid(), &LossEvent::invalid(), &rtt);
        assert_eq!(cc.get_cwnd(), before);
    }

    #[test]
    fn small_loss_bursts_are_filtered_as_noise() {
        let mut cc = RenoController::new(RenoConfig {
            min_cwnd: 1,
            max_cwnd: 64,
            ss_thresh: 1, // start directly in congestion avoidance
        });
        let rtt = SampledRttStats::new();

        // drive cwnd up to 50
        while cc.get_cwnd() < 50 {
            cc.on_ack_or_loss(&ack_for(cc.get_cwnd() as u64), &no_loss(), &rtt);
        }
        assert_eq!(cc.get_cwnd(), 50);

        let small_loss = LossEvent {
            valid: true,
            lost_packets: vec![
                InflightPacket::new(1, 1, 0, Timepoint::zero()),
                InflightPacket::new(2, 2, 0, Timepoint::zero()),
            ],
            lost_at: Timepoint::zero(),
        };
        cc.on_ack_or_loss(&AckEvent::invalid(), &small_loss, &rtt);
        assert_eq!(cc.get_cwnd(), 50, "loss below the burst floor must be ignored");

        let qualifying_loss = LossEvent {
            valid: true,
            lost_packets: vec![
                InflightPacket::new(1, 1, 0, Timepoint::zero()),
                InflightPacket::new(2, 2, 0, Timepoint::zero()),
                InflightPacket::new(3, 3, 0, Timepoint::zero()),
            ],
            lost_at: Timepoint::zero(),
        };
        cc.on_ack_or_loss(&AckEvent::invalid(), &qualifying_loss, &rtt);
        assert_eq!(cc.get_cwnd(), 25);
    }

    #[test]
    fn cwnd_never_leaves_configured_bounds() {
        let mut cc = RenoController::new(RenoConfig {
            min_cwnd: 2,
            max_cwnd: 10,
            ss_thresh: 3,
        });
        let rtt = SampledRttStats::new();
        drive_acks(&mut cc, &rtt, 100);
        assert!(cc.get_cwnd() <= 10);

        let massive_loss = LossEvent {
            valid: true,
            lost_packets: (0..20)
                .map(|i| InflightPacket::new(i, i, 0, Timepoint::zero()))
                .collect(),
            lost_at: Timepoint::zero(),
        };
        cc.on_ack_or_loss(&AckEvent::invalid(), &massive_loss, &rtt);
        assert!(cc.get_cwnd() >= 2);
    }
}
