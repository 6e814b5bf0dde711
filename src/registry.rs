// The in-flight packet registry. Read-only from the loss detector's
// perspective; the sender owns it and is responsible for mutation.

use slab::Slab;

use crate::packet::{InflightPacket, PieceId, Seq};

/// An iterable mapping from sequence number to in-flight packet metadata.
///
/// The core treats this as read-only; only the sender inserts and removes
/// entries (on send, and on ack or confirmed loss, respectively).
pub trait InflightPacketMap {
    fn iter(&self) -> Box<dyn Iterator<Item = (Seq, &InflightPacket)> + '_>;

    fn get(&self, seq: Seq) -> Option<&InflightPacket>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A `slab`-backed in-flight registry keyed by sequence number.
///
/// `slab` is a dense, frequently-inserted-and-removed keyed collection with
/// no ordering requirement, which is exactly the access pattern here: every
/// packet is inserted once on send and removed once on ack or loss.
#[derive(Debug, Default)]
pub struct SlabRegistry {
    // Slab keys are plain `usize`; we map `Seq -> slab key` so lookups by
    // sequence number stay O(1) without requiring sequence numbers to be
    // densely packed.
    by_seq: std::collections::HashMap<Seq, usize>,
    by_piece: std::collections::HashMap<PieceId, usize>,
    packets: Slab<InflightPacket>,
}

impl SlabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, packet: InflightPacket) {
        let seq = packet.seq;
        let piece_id = packet.piece_id;
        let key = self.packets.insert(packet);
        self.by_seq.insert(seq, key);
        self.by_piece.insert(piece_id, key);
    }

    pub fn remove_by_seq(&mut self, seq: Seq) -> Option<InflightPacket> {
        let key = self.by_seq.remove(&seq)?;
        let packet = self.packets.remove(key);
        self.by_piece.remove(&packet.piece_id);
        Some(packet)
    }

    pub fn remove_by_piece(&mut self, piece_id: PieceId) -> Option<InflightPacket> {
        let key = self.by_piece.remove(&piece_id)?;
        let packet = self.packets.remove(key);
        self.by_seq.remove(&packet.seq);
        Some(packet)
    }

    pub fn get_by_piece(&self, piece_id: PieceId) -> Option<&InflightPacket> {
        self.by_piece.get(&piece_id).map(|&key| &self.packets[key])
    }
}

impl InflightPacketMap for SlabRegistry {
    fn iter(&self) -> Box<dyn Iterator<Item = (Seq, &InflightPacket)> + '_> {
        Box::new(self.packets.iter().map(|(_, pkt)| (pkt.seq, pkt)))
    }

    fn get(&self, seq: Seq) -> Option<&InflightPacket> {
        self.by_seq.get(&seq).map(|&key| &self.packets[key])
    }

    fn len(&self) -> usize {
        self.packets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timepoint;

    #[test]
    fn insert_remove_round_trips_packet_contents() {
        let mut reg = SlabRegistry::new();
        let pkt = InflightPacket::new(7, 1, 0, Timepoint::from_micros(100));
        reg.insert(pkt);

        assert_eq!(reg.get(7), Some(&pkt));
        let removed = reg.remove_by_seq(7).unwrap();
        assert_eq!(removed, pkt);
        assert!(reg.get(7).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn iteration_visits_every_inflight_packet_once() {
        let mut reg = SlabRegistry::new();
        for seq in 0..5 {
            reg.insert(InflightPacket::new(seq, seq, 0, Timepoint::from_micros(seq * 10)));
        }
        reg.remove_by_seq(2);

        let mut seen: Vec<Seq> = reg.iter().map(|(seq, _)| seq).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 3, 4]);
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn remove_by_piece_clears_both_indices() {
        let mut reg = SlabRegistry::new();
        reg.insert(InflightPacket::new(3, 42, 0, Timepoint::from_micros(0)));
        assert!(reg.get_by_piece(42).is_some());
        reg.remove_by_piece(42);
        assert!(reg.get_by_piece(42).is_none());
        assert!(reg.get(3).is_none());
    }
}
