// Time-threshold loss detection, modeled on RFC 9002 Section 6.

use crate::packet::{AckEvent, LossEvent};
use crate::registry::InflightPacketMap;
use crate::rtt::RttStats;
use crate::time::{Duration, Timepoint};

/// A lower bound on `loss_delay`, preventing a zero-RTT sample from
/// declaring every in-flight packet lost instantly.
const MIN_LOSS_DELAY: Duration = Duration::from_micros(1);

/// The fixed time factor applied to `max_rtt` to derive the loss-detection
/// threshold: a packet outstanding longer than `max_rtt * 9/4` is declared
/// lost.
const TIME_FACTOR_NUM: u64 = 9;
const TIME_FACTOR_DEN: u64 = 4;

/// Classifies in-flight packets as lost based on elapsed time since send.
///
/// Stateless: every call derives its threshold fresh from `rtt_stats`, so
/// there is nothing to construct. `ack_event` and `max_acked_seq` are part
/// of the contract (a host may use them to limit the detection window to
/// packets below the highest acknowledged sequence number) but the
/// time-threshold rule itself does not consult them directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct LossDetector;

impl LossDetector {
    pub fn new() -> Self {
        LossDetector
    }

    pub fn detect_loss<M: InflightPacketMap, R: RttStats>(
        &self,
        inflight: &M,
        now: Timepoint,
        _ack_event: &AckEvent,
        _max_acked_seq: u64,
        rtt_stats: &R,
    ) -> LossEvent {
        let mut max_rtt = rtt_stats.previous_srtt().max(rtt_stats.latest_rtt());
        if max_rtt.is_zero() {
            max_rtt = rtt_stats.smoothed_or_initial_rtt();
        }
        let loss_delay = max_rtt
            .checked_mul_ratio(TIME_FACTOR_NUM, TIME_FACTOR_DEN)
            .max(MIN_LOSS_DELAY);

        log::trace!("loss: max_rtt={:?} loss_delay={:?}", max_rtt, loss_delay);

        let mut lost_packets = Vec::new();
        for (_, pkt) in inflight.iter() {
            if pkt.sent_at + loss_delay <= now {
                lost_packets.push(*pkt);
            }
        }

        if lost_packets.is_empty() {
            return LossEvent::invalid();
        }

        log::debug!("loss: declared {} packet(s) lost at {:?}", lost_packets.len(), now);
        LossEvent {
            valid: true,
            lost_packets,
            lost_at: now,
        }
    }
}
