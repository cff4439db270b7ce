use std::time::Instant;

use rand::Rng;

use super::flow::FlowController;
use super::reassembler::{AcceptOutcome, StreamReassembler};
use super::rto::RtoManager;
use super::segment::{FLAG_ACK, FLAG_FIN, FLAG_RST};
use super::unacked::{UnackedSegment, UnackedTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    SynReceived,
    Established,
    CloseWait,
    LastAck,
}

pub struct Connection {
    pub state: ConnectionState,
    pub server_seq: u32,
    pub peer_seq: u32,
    pub flow: FlowController,
    pub rto: RtoManager,
    pub reassembler: StreamReassembler,
    pub unacked: UnackedTable,
    syn_peer_seq: Option<u32>,
}

/// Events the TCP layer asks the dispatcher to perform in response to one
/// incoming segment; several may fire for a single segment (e.g. an ACK
/// plus an HTTP handoff).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    SendSynAck { server_seq: u32, ack: u32 },
    SendAck { ack: u32 },
    SendFin { seq: u32 },
    Destroy,
    DeliverToHttp(Vec<u8>),
    FastRetransmit { start_seq: u32 },
}

impl Connection {
    /// CLOSED + recv SYN: generate a random ISN and move to SYN_RECEIVED.
    pub fn on_syn(peer_seq: u32) -> (Self, ConnectionAction) {
        let server_seq: u32 = rand::thread_rng().gen();
        let ack = peer_seq.wrapping_add(1);
        let conn = Self {
            state: ConnectionState::SynReceived,
            server_seq,
            peer_seq: ack,
            flow: FlowController::new(),
            rto: RtoManager::new(),
            reassembler: StreamReassembler::new(ack),
            unacked: UnackedTable::new(),
            syn_peer_seq: Some(peer_seq),
        };
        (conn, ConnectionAction::SendSynAck { server_seq, ack })
    }

    /// Duplicate SYN (same sequence) while already in SYN_RECEIVED:
    /// idempotently re-emits the SYN-ACK.
    pub fn on_duplicate_syn(&self, peer_seq: u32) -> Option<ConnectionAction> {
        if self.state == ConnectionState::SynReceived && self.syn_peer_seq == Some(peer_seq) {
            Some(ConnectionAction::SendSynAck {
                server_seq: self.server_seq,
                ack: self.peer_seq,
            })
        } else {
            None
        }
    }

    pub fn on_segment(
        &mut self,
        seq: u32,
        ack: u32,
        flags: u8,
        window: u16,
        payload: &[u8],
        now: Instant,
    ) -> Vec<ConnectionAction> {
        if flags & FLAG_RST != 0 {
            return vec![ConnectionAction::Destroy];
        }

        let mut actions = Vec::new();

        match self.state {
            ConnectionState::SynReceived if flags & FLAG_ACK != 0 => {
                self.state = ConnectionState::Established;
                self.server_seq = self.server_seq.wrapping_add(1);
                return actions;
            }
            ConnectionState::Established => {
                if flags & FLAG_ACK != 0 {
                    if let Some(retransmit) = self.on_ack(ack, window, now) {
                        actions.push(retransmit);
                    }
                }
                if !payload.is_empty() {
                    match self.reassembler.accept(seq, payload) {
                        AcceptOutcome::Accepted => {
                            self.peer_seq = self.reassembler.next_expected();
                            actions.push(ConnectionAction::SendAck { ack: self.peer_seq });
                            if let Some(split) = find_request_terminator(self.reassembler.contiguous()) {
                                let request = self.reassembler.contiguous()[..split].to_vec();
                                self.reassembler.consume(split);
                                actions.push(ConnectionAction::DeliverToHttp(request));
                            }
                        }
                        AcceptOutcome::Retransmit | AcceptOutcome::OutOfOrder => {}
                    }
                }
                if flags & FLAG_FIN != 0 {
                    self.peer_seq = self.peer_seq.wrapping_add(1);
                    self.state = ConnectionState::CloseWait;
                    actions.push(ConnectionAction::SendAck { ack: self.peer_seq });
                }
            }
            ConnectionState::LastAck if flags & FLAG_ACK != 0 => {
                self.state = ConnectionState::Closed;
                actions.push(ConnectionAction::Destroy);
            }
            _ => {}
        }

        actions
    }

    /// Feeds one incoming ACK into the unacked-segment table, the RTO
    /// estimator (Karn's algorithm: only un-retransmitted segments sample
    /// RTT) and the flow controller, in that order. Returns a
    /// [`ConnectionAction::FastRetransmit`] when three duplicate ACKs fire.
    fn on_ack(&mut self, ack: u32, window: u16, now: Instant) -> Option<ConnectionAction> {
        let bytes_in_flight_before = self.unacked.bytes_in_flight();
        let (new_bytes_acked, rtt_sample) = self.unacked.on_ack(ack, now);
        if let Some(sample) = rtt_sample {
            self.rto.on_rtt_sample(sample);
        }
        if new_bytes_acked > 0 {
            self.rto.on_new_data_acked();
        }
        let triggered = self.flow.on_ack(ack, window as u32, bytes_in_flight_before, new_bytes_acked);
        if triggered {
            self.unacked.first_unacked_start_seq().map(|start_seq| ConnectionAction::FastRetransmit { start_seq })
        } else {
            None
        }
    }

    /// Records a just-sent data segment so a later ACK can sample RTT or
    /// trigger fast retransmit against it.
    pub fn record_sent(&mut self, start_seq: u32, payload: Vec<u8>, now: Instant) {
        let end_seq = start_seq.wrapping_add(payload.len() as u32);
        let bytes = payload.len();
        self.unacked.insert(start_seq, UnackedSegment { end_seq, send_time: now, is_retransmit: false, bytes, payload });
    }

    /// Looks up the payload for a fast-retransmit or RTO-timeout resend and
    /// marks the entry as retransmitted so it never yields a false RTT
    /// sample.
    pub fn take_retransmit_payload(&mut self, start_seq: u32, now: Instant) -> Option<Vec<u8>> {
        let payload = self.unacked.oldest().filter(|(s, _)| *s == start_seq).map(|(_, entry)| entry.payload.clone());
        if payload.is_some() {
            self.unacked.mark_retransmitted(start_seq, now);
            self.flow.retransmit_emitted();
        }
        payload
    }

    /// Polled once per pump-loop tick: if the oldest outstanding segment has
    /// been unacknowledged longer than the current RTO estimate, backs off
    /// the timer and asks the dispatcher to resend it.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<ConnectionAction> {
        let (start_seq, elapsed) = {
            let (start_seq, entry) = self.unacked.oldest()?;
            (start_seq, now.duration_since(entry.send_time))
        };
        if elapsed < self.rto.rto() {
            return None;
        }
        self.rto.on_timeout();
        Some(ConnectionAction::FastRetransmit { start_seq })
    }

    /// Application-initiated close: emits our own FIN and moves to
    /// LAST_ACK. Fires from CLOSE_WAIT (peer already sent its FIN) or
    /// directly from ESTABLISHED (we are closing first, e.g. after a
    /// non-keep-alive response) — either way the next ACK from the peer
    /// finishes the teardown via the `LastAck` arm of `on_segment`.
    pub fn initiate_close(&mut self) -> Option<ConnectionAction> {
        if self.state != ConnectionState::CloseWait && self.state != ConnectionState::Established {
            return None;
        }
        self.state = ConnectionState::LastAck;
        let seq = self.server_seq;
        Some(ConnectionAction::SendFin { seq })
    }
}

/// CRLFCRLF terminator or, eventually, Content-Length completeness (left to
/// the HTTP layer once headers are visible); this only recognizes the
/// header terminator, matching the handoff point described for the TCP
/// layer's request-buffering step.
fn find_request_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|idx| idx + 4)
}
