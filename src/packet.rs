// Packet identity and the event structs exchanged between the sender and
// the congestion-control core.

use crate::time::Timepoint;

/// A monotonically increasing sequence number.
pub type Seq = u64;

/// An application-level piece identifier.
pub type PieceId = u64;

/// Identifier shared by packets released together as one burst.
pub type GroupId = u64;

/// Sender-owned metadata for a packet that has been sent but neither
/// acknowledged nor declared lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflightPacket {
    pub seq: Seq,
    pub piece_id: PieceId,
    pub group_id: GroupId,
    pub sent_at: Timepoint,

    /// Snapshot of the controller's `delivered` counter at send time.
    /// Never exceeds the controller's `delivered` at the moment of sending.
    pub delivered_at_send: u64,

    /// Advisory hint set by the probing controller; does not affect CWND.
    pub needs_wait: bool,
}

impl InflightPacket {
    /// Constructs the metadata the sender has at hand before a packet is
    /// handed to a controller's `on_sent`.
    pub fn new(seq: Seq, piece_id: PieceId, group_id: GroupId, sent_at: Timepoint) -> Self {
        InflightPacket {
            seq,
            piece_id,
            group_id,
            sent_at,
            delivered_at_send: 0,
            needs_wait: false,
        }
    }
}

/// An acknowledgement of exactly one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AckEvent {
    pub valid: bool,
    pub packet: InflightPacket,
    pub sent_at: Timepoint,
    /// Set when this ack carries a synthesized ack-implies-loss signal.
    pub lost_at: Timepoint,
    pub received_at: Timepoint,
    pub is_last_in_group: bool,
}

impl Default for InflightPacket {
    fn default() -> Self {
        InflightPacket {
            seq: 0,
            piece_id: 0,
            group_id: 0,
            sent_at: Timepoint::uninitialized(),
            delivered_at_send: 0,
            needs_wait: false,
        }
    }
}

impl AckEvent {
    pub fn invalid() -> Self {
        AckEvent::default()
    }
}

/// A set of packets declared lost at the same instant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LossEvent {
    pub valid: bool,
    pub lost_packets: Vec<InflightPacket>,
    pub lost_at: Timepoint,
}

impl LossEvent {
    pub fn invalid() -> Self {
        LossEvent {
            valid: false,
            lost_packets: Vec::new(),
            lost_at: Timepoint::infinite(),
        }
    }

    pub fn len(&self) -> usize {
        self.lost_packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lost_packets.is_empty()
    }
}

/// Derives the maximum `sent_at` across a loss set; `Timepoint::zero()` if
/// empty, matching the teacher's `Timepoint::Zero()` starting accumulator.
pub fn max_sent_at<'a, I: IntoIterator<Item = &'a InflightPacket>>(packets: I) -> Timepoint {
    packets
        .into_iter()
        .map(|p| p.sent_at)
        .fold(Timepoint::zero(), Timepoint::max)
}
