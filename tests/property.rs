// Randomized invariant checks over event sequences, driven by `bolero`.
//
// These complement the concrete unit tests inside each controller module;
// here the goal is to throw arbitrary interleavings of acks and losses at a
// controller and check the invariants promised in the crate's module docs
// still hold after every single event, not just in the scenarios a human
// thought to write down.

use bolero::check;
use bolero_generator::TypeGenerator;

use congestion_core::{
    AckEvent, CongestionController, GroupId, InflightPacket, LossEvent, ProbingConfig,
    ProbingController, RenoConfig, RenoController, SampledRttStats, Timepoint,
};

#[derive(Debug, Clone, TypeGenerator)]
enum Event {
    Ack { rtt_ms: u8 },
    Loss { count: u8 },
}

fn ack_for(piece_id: u64, sent_at: Timepoint, received_at: Timepoint, group_id: GroupId) -> AckEvent {
    AckEvent {
        valid: true,
        packet: InflightPacket::new(piece_id, piece_id, group_id, sent_at),
        sent_at,
        lost_at: Timepoint::infinite(),
        received_at,
        is_last_in_group: true,
    }
}

fn loss_of(count: u8, next_seq: &mut u64) -> LossEvent {
    if count == 0 {
        return LossEvent::invalid();
    }
    let lost_packets = (0..count as u64)
        .map(|_| {
            let seq = *next_seq;
            *next_seq += 1;
            InflightPacket::new(seq, seq, 0, Timepoint::zero())
        })
        .collect();
    LossEvent {
        valid: true,
        lost_packets,
        lost_at: Timepoint::zero(),
    }
}

#[test]
fn reno_cwnd_never_leaves_configured_bounds() {
    check!().with_type::<Vec<Event>>().for_each(|events| {
        let config = RenoConfig {
            min_cwnd: 1,
            max_cwnd: 64,
            ss_thresh: 32,
        };
        let mut cc = RenoController::new(config);
        let rtt = SampledRttStats::new();
        let mut next_piece = 0u64;
        let mut next_seq = 0u64;

        for event in events {
            match event {
                Event::Ack { .. } => {
                    let ack = ack_for(next_piece, Timepoint::zero(), Timepoint::zero(), 0);
                    cc.on_ack_or_loss(&ack, &LossEvent::invalid(), &rtt);
                    next_piece += 1;
                }
                Event::Loss { count } => {
                    let loss = loss_of(*count, &mut next_seq);
                    cc.on_ack_or_loss(&AckEvent::invalid(), &loss, &rtt);
                }
            }
            let cwnd = cc.get_cwnd();
            assert!(
                cwnd >= config.min_cwnd && cwnd <= config.max_cwnd,
                "cwnd {} escaped [{}, {}]",
                cwnd,
                config.min_cwnd,
                config.max_cwnd
            );
        }
    });
}

#[test]
fn reno_empty_events_are_a_no_op() {
    let config = RenoConfig::default();
    let mut cc = RenoController::new(config);
    let rtt = SampledRttStats::new();
    let before = cc.get_cwnd();
    cc.on_ack_or_loss(&AckEvent::invalid(), &LossEvent::invalid(), &rtt);
    assert_eq!(cc.get_cwnd(), before);
}

#[test]
fn probing_inflight_matches_sends_minus_acks_minus_losses() {
    check!().with_type::<Vec<Event>>().for_each(|events| {
        let mut cc = ProbingController::new(ProbingConfig::default());
        let mut rtt = SampledRttStats::new();
        let mut next_seq = 0u64;
        let mut sent = 0i64;
        let mut acked = 0i64;
        let mut lost = 0i64;
        let mut t = Timepoint::from_micros(1);

        for event in events {
            // Every event is preceded by a fresh send, mirroring a sender
            // that always keeps at least one packet outstanding to ack.
            let mut pkt = InflightPacket::new(next_seq, next_seq, 0, t);
            next_seq += 1;
            cc.on_sent(&mut pkt);
            sent += 1;
            t = t + congestion_core::Duration::from_millis(1);

            match event {
                Event::Ack { rtt_ms } => {
                    let sample = congestion_core::Duration::from_millis(1 + *rtt_ms as u64);
                    rtt.update(sample, t);
                    let ack = ack_for(pkt.piece_id, pkt.sent_at, t, 0);
                    cc.on_ack_or_loss(&ack, &LossEvent::invalid(), &rtt);
                    acked += 1;
                }
                Event::Loss { count } => {
                    let count = (*count % 4) as u8; // keep loss bursts small relative to inflight
                    let loss = loss_of(count, &mut next_seq);
                    lost += loss.len() as i64;
                    cc.on_ack_or_loss(&AckEvent::invalid(), &loss, &rtt);
                }
            }

            let expected = (sent - acked - lost).max(0) as u32;
            assert_eq!(cc.inflight(), expected, "inflight accounting drifted");
        }
    });
}

#[test]
fn probing_rt_prop_is_monotonically_non_increasing() {
    check!().with_type::<Vec<u16>>().for_each(|samples| {
        let mut cc = ProbingController::new(ProbingConfig::default());
        let mut rtt = SampledRttStats::new();
        let mut prev_rt_prop = congestion_core::Duration::infinite();
        let mut t = Timepoint::from_micros(1);

        for &sample_ms in samples {
            let sample = congestion_core::Duration::from_millis(1 + sample_ms as u64 % 500);
            rtt.update(sample, t);

            let mut pkt = InflightPacket::new(0, 0, 0, t);
            cc.on_sent(&mut pkt);
            let ack = ack_for(0, t, t + sample, 0);
            cc.on_ack_or_loss(&ack, &LossEvent::invalid(), &rtt);
            t = t + congestion_core::Duration::from_millis(1);

            assert!(cc.rt_prop() <= prev_rt_prop, "rt_prop increased");
            prev_rt_prop = cc.rt_prop();
        }
    });
}
