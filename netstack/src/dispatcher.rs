//! Owns the USB bulk endpoints once the device is in network mode: a pump
//! thread reads frames, runs the protocol stack, and is the sole writer to
//! the OUT endpoint; a worker thread drains HTTP requests, builds
//! responses, and hands pre-built frames back to the pump to transmit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};

use mtp_proto::BulkPipe;

use crate::ccp;
use crate::config::NetstackConfig;
use crate::dns::DnsResponder;
use crate::http::{self, HttpRequest, HttpResponder, HttpResponse, ThrottleState};
use crate::ipcp::{IpcpConfig, IpcpResponder};
use crate::ipv4::{self, Ipv4Header};
use crate::ppp::{self, FrameReassembler, PROTO_CCP, PROTO_IPCP, PROTO_IPV4, PROTO_LCP};
use crate::tcp::{self, Connection, ConnectionAction, ConnectionState};
use crate::udp;

const PUMP_READ_TIMEOUT: Duration = Duration::from_millis(200);
const PUMP_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const DNS_PORT: u16 = 53;

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
struct ConnectionKey {
    peer_port: u16,
    local_port: u16,
}

struct PendingRequest {
    key: ConnectionKey,
    request: HttpRequest,
}

struct PendingResponse {
    key: ConnectionKey,
    response: HttpResponse,
}

/// A TCP connection plus the IPv4 addresses a reply to it must carry: the
/// address the device dialed (our reply source) and the device's own
/// address (our reply destination), fixed at SYN time so replies built long
/// after the triggering packet — a worker's HTTP response, an RTO-timeout
/// retransmit — still address the right four-tuple.
struct TrackedConnection {
    conn: Connection,
    reply_src: [u8; 4],
    reply_dst: [u8; 4],
}

/// Shared across pump and worker threads; the worker only ever reaches in
/// to read connection sequence state while building a response frame, it
/// never mutates `Connection` state machines directly.
struct ConnectionTable {
    connections: HashMap<ConnectionKey, TrackedConnection>,
}

impl ConnectionTable {
    fn new() -> Self {
        Self { connections: HashMap::new() }
    }
}

pub struct Dispatcher {
    config: NetstackConfig,
    table: Arc<Mutex<ConnectionTable>>,
    dns: DnsResponder,
    request_tx: Sender<PendingRequest>,
    request_rx: Option<Receiver<PendingRequest>>,
    response_tx: Sender<PendingResponse>,
    response_rx: Receiver<PendingResponse>,
}

impl Dispatcher {
    pub fn new(config: NetstackConfig, dns: DnsResponder) -> Self {
        let (request_tx, request_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();
        Self {
            config,
            table: Arc::new(Mutex::new(ConnectionTable::new())),
            dns,
            request_tx,
            request_rx: Some(request_rx),
            response_tx,
            response_rx,
        }
    }

    /// Spawns the HTTP worker thread and runs the pump loop on the calling
    /// thread until `pipe` returns a transport error. `pipe` is expected to
    /// already be in network mode (the vendor 922c/922d sequencing below is
    /// this call's responsibility, not the caller's).
    pub fn run(mut self, mut pipe: Box<dyn BulkPipe>, responder: Arc<HttpResponder>) -> zcommon::Result<()> {
        pipe.write(&[], PUMP_WRITE_TIMEOUT).ok();

        let request_rx = self.request_rx.take().expect("run() called once");
        let response_tx = self.response_tx.clone();
        let throttle = Arc::new(Mutex::new(ThrottleState::with_global_gap(self.config.global_large_response_gap)));
        std::thread::spawn(move || worker_loop(request_rx, response_tx, responder, throttle));

        let mut reassembler = FrameReassembler::new();
        let mut ipcp = IpcpResponder::new(IpcpConfig {
            device_ip: self.config.device_ip,
            host_ip: self.config.host_ip,
            dns_ip: self.config.dns_server_ip,
        });

        loop {
            match pipe.read(PUMP_READ_TIMEOUT) {
                Ok(chunk) if !chunk.is_empty() => {
                    for (body, protocol) in reassembler.feed(&chunk) {
                        self.handle_frame(&mut pipe, &mut ipcp, protocol, &body)?;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("usb read ended: {e}");
                    return Err(e);
                }
            }

            while let Ok(pending) = self.response_rx.try_recv() {
                self.send_response(&mut pipe, pending)?;
            }

            self.poll_retransmit_timeouts(&mut pipe)?;
        }
    }

    fn handle_frame(
        &self,
        pipe: &mut Box<dyn BulkPipe>,
        ipcp: &mut IpcpResponder,
        protocol: u16,
        body: &[u8],
    ) -> zcommon::Result<()> {
        match protocol {
            PROTO_LCP => {
                debug!("ignoring LCP packet ({} bytes); device never negotiates auth on this link", body.len());
            }
            PROTO_IPCP => {
                if let Some(reply) = ipcp.handle(body) {
                    self.send_ppp(pipe, PROTO_IPCP, &reply)?;
                }
            }
            PROTO_CCP => {
                if let Some(reply) = ccp::handle(body) {
                    self.send_ppp(pipe, PROTO_CCP, &reply)?;
                }
            }
            PROTO_IPV4 => self.handle_ipv4(pipe, body)?,
            other => debug!("unhandled PPP protocol 0x{other:04x}"),
        }
        Ok(())
    }

    fn handle_ipv4(&self, pipe: &mut Box<dyn BulkPipe>, packet: &[u8]) -> zcommon::Result<()> {
        let Some((header, payload)) = ipv4::parse(packet) else {
            warn!("malformed IPv4 packet, dropping");
            return Ok(());
        };
        match header.protocol {
            ipv4::PROTO_UDP => self.handle_udp(pipe, &header, payload),
            ipv4::PROTO_TCP => self.handle_tcp(pipe, &header, payload),
            other => {
                debug!("unhandled IPv4 protocol {other}");
                Ok(())
            }
        }
    }

    fn handle_udp(&self, pipe: &mut Box<dyn BulkPipe>, header: &Ipv4Header, payload: &[u8]) -> zcommon::Result<()> {
        let Some(datagram) = udp::parse(payload) else { return Ok(()) };
        if datagram.dst_port != DNS_PORT {
            return Ok(());
        }
        let Some(reply_body) = self.dns.respond_udp(&datagram.payload) else { return Ok(()) };
        let reply = udp::build(header.dst, header.src, DNS_PORT, datagram.src_port, &reply_body);
        let ip_header = Ipv4Header {
            src: header.dst,
            dst: header.src,
            protocol: ipv4::PROTO_UDP,
            total_length: (ipv4::HEADER_LEN + reply.len()) as u16,
            identification: 0,
        };
        let packet = ipv4::build(&ip_header, &reply);
        self.send_ppp(pipe, PROTO_IPV4, &packet)
    }

    fn handle_tcp(&self, pipe: &mut Box<dyn BulkPipe>, header: &Ipv4Header, payload: &[u8]) -> zcommon::Result<()> {
        let Some(segment) = tcp::segment::parse(payload) else { return Ok(()) };
        let key = ConnectionKey { peer_port: segment.src_port, local_port: segment.dst_port };
        let mut actions = Vec::new();
        let dst_port = segment.dst_port;
        let now = Instant::now();

        {
            let mut table = self.table.lock().unwrap();
            if segment.has(tcp::segment::FLAG_SYN) && !table.connections.contains_key(&key) {
                let (conn, action) = Connection::on_syn(segment.seq);
                table.connections.insert(key, TrackedConnection { conn, reply_src: header.dst, reply_dst: header.src });
                actions.push(action);
            } else if let Some(tracked) = table.connections.get_mut(&key) {
                if segment.has(tcp::segment::FLAG_SYN) {
                    if let Some(action) = tracked.conn.on_duplicate_syn(segment.seq) {
                        actions.push(action);
                    }
                } else {
                    actions.extend(tracked.conn.on_segment(segment.seq, segment.ack, segment.flags, segment.window, &segment.payload, now));
                }
            }
        }

        for action in actions {
            match action {
                ConnectionAction::SendSynAck { server_seq, ack } => {
                    self.send_tcp(pipe, header, dst_port, key.peer_port, server_seq, ack, tcp::segment::FLAG_SYN | tcp::segment::FLAG_ACK, &[])?;
                }
                ConnectionAction::SendAck { ack } => {
                    let seq = self.current_server_seq(&key);
                    self.send_tcp(pipe, header, dst_port, key.peer_port, seq, ack, tcp::segment::FLAG_ACK, &[])?;
                }
                ConnectionAction::SendFin { seq } => {
                    let ack = self.current_peer_seq(&key);
                    self.send_tcp(pipe, header, dst_port, key.peer_port, seq, ack, tcp::segment::FLAG_FIN | tcp::segment::FLAG_ACK, &[])?;
                }
                ConnectionAction::Destroy => {
                    self.table.lock().unwrap().connections.remove(&key);
                }
                ConnectionAction::DeliverToHttp(bytes) => {
                    if let Ok(request) = http::parse_request(&bytes) {
                        self.request_tx.send(PendingRequest { key, request }).ok();
                    }
                }
                ConnectionAction::FastRetransmit { start_seq } => {
                    self.retransmit(pipe, &key, start_seq)?;
                }
            }
        }
        Ok(())
    }

    fn current_server_seq(&self, key: &ConnectionKey) -> u32 {
        self.table.lock().unwrap().connections.get(key).map(|c| c.conn.server_seq).unwrap_or(0)
    }

    fn current_peer_seq(&self, key: &ConnectionKey) -> u32 {
        self.table.lock().unwrap().connections.get(key).map(|c| c.conn.peer_seq).unwrap_or(0)
    }

    /// Resends the payload a fast-retransmit or RTO timeout asked for, using
    /// the connection's fixed reply addresses rather than the packet that
    /// happened to trigger this call (there may not be one, for a timeout).
    fn retransmit(&self, pipe: &mut Box<dyn BulkPipe>, key: &ConnectionKey, start_seq: u32) -> zcommon::Result<()> {
        let found = {
            let mut table = self.table.lock().unwrap();
            table.connections.get_mut(key).map(|tracked| {
                let payload = tracked.conn.take_retransmit_payload(start_seq, Instant::now());
                (payload, tracked.reply_src, tracked.reply_dst, tracked.conn.peer_seq)
            })
        };
        let Some((Some(payload), reply_src, reply_dst, ack)) = found else { return Ok(()) };
        let header = Ipv4Header { src: reply_dst, dst: reply_src, protocol: ipv4::PROTO_TCP, total_length: 0, identification: 0 };
        debug!("retransmitting {} bytes from seq {start_seq}", payload.len());
        self.send_tcp(pipe, &header, key.local_port, key.peer_port, start_seq, ack, tcp::segment::FLAG_ACK | tcp::segment::FLAG_PSH, &payload)
    }

    /// Polled once per pump-loop tick: resends any connection's oldest
    /// segment once its RTO has elapsed without an ACK.
    fn poll_retransmit_timeouts(&self, pipe: &mut Box<dyn BulkPipe>) -> zcommon::Result<()> {
        let now = Instant::now();
        let due: Vec<(ConnectionKey, u32)> = {
            let mut table = self.table.lock().unwrap();
            table
                .connections
                .iter_mut()
                .filter_map(|(key, tracked)| match tracked.conn.poll_timeout(now) {
                    Some(ConnectionAction::FastRetransmit { start_seq }) => Some((*key, start_seq)),
                    _ => None,
                })
                .collect()
        };
        for (key, start_seq) in due {
            self.retransmit(pipe, &key, start_seq)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn send_tcp(
        &self,
        pipe: &mut Box<dyn BulkPipe>,
        header: &Ipv4Header,
        src_port: u16,
        dst_port: u16,
        seq: u32,
        ack: u32,
        flags: u8,
        payload: &[u8],
    ) -> zcommon::Result<()> {
        let segment = crate::tcp::segment::build(
            header.dst,
            header.src,
            src_port,
            dst_port,
            seq,
            ack,
            flags,
            u16::MAX,
            payload,
        );
        let ip_header = Ipv4Header {
            src: header.dst,
            dst: header.src,
            protocol: ipv4::PROTO_TCP,
            total_length: (ipv4::HEADER_LEN + segment.len()) as u16,
            identification: 0,
        };
        let packet = ipv4::build(&ip_header, &segment);
        self.send_ppp(pipe, PROTO_IPV4, &packet)
    }

    fn send_ppp(&self, pipe: &mut Box<dyn BulkPipe>, protocol: u16, payload: &[u8]) -> zcommon::Result<()> {
        let frame = ppp::frame(payload, protocol);
        pipe.write(&frame, PUMP_WRITE_TIMEOUT)
    }

    fn send_response(&self, pipe: &mut Box<dyn BulkPipe>, pending: PendingResponse) -> zcommon::Result<()> {
        let reply_addrs = {
            let table = self.table.lock().unwrap();
            table.connections.get(&pending.key).filter(|t| t.conn.state == ConnectionState::Established).map(|t| (t.reply_src, t.reply_dst))
        };
        let Some((reply_src, reply_dst)) = reply_addrs else {
            warn!("dropping response for a connection that is no longer established");
            return Ok(());
        };
        let header = Ipv4Header { src: reply_dst, dst: reply_src, protocol: ipv4::PROTO_TCP, total_length: 0, identification: 0 };
        let bytes = pending.response.to_bytes();
        for chunk in bytes.chunks(tcp::MSS as usize) {
            let now = Instant::now();
            let (seq, ack) = {
                let mut table = self.table.lock().unwrap();
                let tracked = table.connections.get_mut(&pending.key).expect("checked established above");
                let seq = tracked.conn.server_seq;
                tracked.conn.server_seq = tracked.conn.server_seq.wrapping_add(chunk.len() as u32);
                tracked.conn.record_sent(seq, chunk.to_vec(), now);
                (seq, tracked.conn.peer_seq)
            };
            self.send_tcp(
                pipe,
                &header,
                pending.key.local_port,
                pending.key.peer_port,
                seq,
                ack,
                tcp::segment::FLAG_ACK | tcp::segment::FLAG_PSH,
                chunk,
            )?;
        }

        if !pending.response.keep_alive {
            let fin_action = {
                let mut table = self.table.lock().unwrap();
                table.connections.get_mut(&pending.key).and_then(|t| t.conn.initiate_close())
            };
            if let Some(ConnectionAction::SendFin { seq }) = fin_action {
                let ack = self.current_peer_seq(&pending.key);
                self.send_tcp(
                    pipe,
                    &header,
                    pending.key.local_port,
                    pending.key.peer_port,
                    seq,
                    ack,
                    tcp::segment::FLAG_FIN | tcp::segment::FLAG_ACK,
                    &[],
                )?;
            }
        }
        Ok(())
    }
}

fn worker_loop(
    request_rx: Receiver<PendingRequest>,
    response_tx: Sender<PendingResponse>,
    responder: Arc<HttpResponder>,
    throttle: Arc<Mutex<ThrottleState>>,
) {
    while let Ok(pending) = request_rx.recv() {
        let response = responder.handle(&pending.request);
        let will_be_large = response.is_large();

        let wait = {
            let guard = throttle.lock().unwrap();
            guard.wait_before_next(will_be_large, Instant::now())
        };
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }

        {
            let mut guard = throttle.lock().unwrap();
            guard.record_start(will_be_large, Instant::now());
        }

        if response_tx.send(PendingResponse { key: pending.key, response }).is_err() {
            info!("pump thread gone, stopping http worker");
            return;
        }

        let mut guard = throttle.lock().unwrap();
        guard.record_completion(Instant::now());
    }
}
