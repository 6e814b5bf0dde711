// The congestion-controller family: a closed set of two algorithms behind
// one trait, dispatched by `CongestionControlType` when a caller needs to
// pick the algorithm from configuration rather than at compile time.

mod probing;
mod reno;

pub use probing::{Phase, ProbingConfig, ProbingController};
pub use reno::{RenoConfig, RenoController};

use crate::packet::{AckEvent, InflightPacket, LossEvent};
use crate::rtt::RttStats;

/// Tags which algorithm a `CongestionController` implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionControlType {
    None,
    Reno,
    Probing,
}

/// The uniform contract the sender drives every controller through.
pub trait CongestionController: std::fmt::Debug {
    fn cc_type(&self) -> CongestionControlType;

    /// Invoked exactly once per transmission, before the packet is handed
    /// to the network. May annotate `pkt` with controller state.
    fn on_sent(&mut self, pkt: &mut InflightPacket);

    /// Invoked per ack/loss event. Dispatches loss before ack internally,
    /// so ack-side updates observe the post-loss inflight count.
    fn on_ack_or_loss(&mut self, ack: &AckEvent, loss: &LossEvent, rtt_stats: &dyn RttStats);

    /// The maximum number of packets the sender may keep in flight.
    fn get_cwnd(&self) -> u32;

    /// The number of packets the sender should release immediately as one
    /// burst; zero means "wait for the next ack". `None` for controllers
    /// that do not paced-batch (e.g. Reno).
    fn get_send_batch(&self) -> Option<u32> {
        None
    }

    /// Advisory signal set by the sender when it has deliberately paused.
    /// A no-op for controllers that do not use it.
    fn set_wait(&mut self, _flag: bool) {}
}
