use std::collections::BTreeMap;
use std::time::Instant;

use super::segment::seq_after;

#[derive(Debug, Clone)]
pub struct UnackedSegment {
    pub end_seq: u32,
    pub send_time: Instant,
    pub is_retransmit: bool,
    pub bytes: usize,
    pub payload: Vec<u8>,
}

/// Keyed by start sequence number. On an ACK, every entry fully covered by
/// the new ACK number is removed; an RTT sample is taken from the entry
/// whose `end_seq` equals the ACK number, provided it was never
/// retransmitted (Karn's algorithm).
#[derive(Default)]
pub struct UnackedTable {
    entries: BTreeMap<u32, UnackedSegment>,
}

impl UnackedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, start_seq: u32, entry: UnackedSegment) {
        self.entries.insert(start_seq, entry);
    }

    pub fn bytes_in_flight(&self) -> u32 {
        self.entries.values().map(|e| e.bytes as u32).sum()
    }

    /// Removes every entry covered by `ack` and returns `(bytes_newly_acked,
    /// rtt_sample)`.
    pub fn on_ack(&mut self, ack: u32, now: Instant) -> (u32, Option<std::time::Duration>) {
        let covered: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, entry)| !seq_after(entry.end_seq, ack))
            .map(|(&start, _)| start)
            .collect();

        let mut bytes = 0u32;
        let mut rtt_sample = None;
        for start in covered {
            if let Some(entry) = self.entries.remove(&start) {
                bytes += entry.bytes as u32;
                if entry.end_seq == ack && !entry.is_retransmit {
                    rtt_sample = Some(now.duration_since(entry.send_time));
                }
            }
        }
        (bytes, rtt_sample)
    }

    pub fn first_unacked_start_seq(&self) -> Option<u32> {
        self.entries.keys().next().copied()
    }

    /// The oldest still-outstanding segment, for RTO-timeout retransmission.
    pub fn oldest(&self) -> Option<(u32, &UnackedSegment)> {
        self.entries.iter().next().map(|(&start, entry)| (start, entry))
    }

    pub fn mark_retransmitted(&mut self, start_seq: u32, now: Instant) {
        if let Some(entry) = self.entries.get_mut(&start_seq) {
            entry.is_retransmit = true;
            entry.send_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_removes_fully_covered_entries_and_samples_rtt() {
        let mut table = UnackedTable::new();
        let t0 = Instant::now();
        table.insert(
            1000,
            UnackedSegment {
                end_seq: 1100,
                send_time: t0,
                is_retransmit: false,
                bytes: 100,
                payload: vec![0u8; 100],
            },
        );
        let (bytes, sample) = table.on_ack(1100, Instant::now());
        assert_eq!(bytes, 100);
        assert!(sample.is_some());
        assert!(table.entries.is_empty());
    }

    #[test]
    fn retransmitted_segment_never_yields_an_rtt_sample() {
        let mut table = UnackedTable::new();
        table.insert(
            1000,
            UnackedSegment {
                end_seq: 1100,
                send_time: Instant::now(),
                is_retransmit: true,
                bytes: 100,
                payload: vec![0u8; 100],
            },
        );
        let (_, sample) = table.on_ack(1100, Instant::now());
        assert!(sample.is_none());
    }

    #[test]
    fn oldest_returns_the_lowest_start_sequence() {
        let mut table = UnackedTable::new();
        table.insert(
            2000,
            UnackedSegment { end_seq: 2100, send_time: Instant::now(), is_retransmit: false, bytes: 100, payload: vec![] },
        );
        table.insert(
            1000,
            UnackedSegment { end_seq: 1100, send_time: Instant::now(), is_retransmit: false, bytes: 100, payload: vec![] },
        );
        let (start, _) = table.oldest().unwrap();
        assert_eq!(start, 1000);
    }
}
