//! A-record-only DNS responder. Two wire shapes are supported: plain UDP
//! port 53 (RFC 1035) and the vendor's TCP length-prefixed variant, which
//! wraps the same message body in an 8-byte header.

use std::collections::HashMap;

const FLAG_RESPONSE: u16 = 0x8000;
const FLAG_RECURSION_AVAILABLE: u16 = 0x0080;
const RCODE_NAME_ERROR: u16 = 3;
const QTYPE_A: u16 = 1;
const QCLASS_IN: u16 = 1;
const TTL_SECONDS: u32 = 60;

pub struct DnsResponder {
    records: HashMap<String, [u8; 4]>,
}

impl DnsResponder {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    pub fn with_record(mut self, hostname: &str, ip: [u8; 4]) -> Self {
        self.records.insert(hostname.to_ascii_lowercase(), ip);
        self
    }

    fn lookup(&self, hostname: &str) -> Option<[u8; 4]> {
        self.records.get(&hostname.to_ascii_lowercase()).copied()
    }

    /// Builds a DNS response for a single question, over UDP. Returns
    /// `None` if `query` is too short to contain a header.
    pub fn respond_udp(&self, query: &[u8]) -> Option<Vec<u8>> {
        let (id, question_name, question_bytes) = parse_question(query)?;
        Some(build_response(id, &question_name, question_bytes, self.lookup(&question_name)))
    }

    /// Handles the vendor TCP framing: an 8-byte header
    /// `[id_hi][id_lo][0x00][0x35][len_hi][len_lo][0x00][0x00]` followed by
    /// the raw DNS message (no length field inside the message itself, as
    /// plain DNS-over-TCP would have). The response swaps the header to
    /// `[0x00][0x35][id_hi][id_lo][len_hi][len_lo][0x00][0x00]`.
    pub fn respond_tcp_framed(&self, framed: &[u8]) -> Option<Vec<u8>> {
        if framed.len() < 8 {
            return None;
        }
        let id = [framed[0], framed[1]];
        let message = &framed[8..];
        let response = self.respond_udp(message)?;

        let mut out = Vec::with_capacity(8 + response.len());
        out.push(0x00);
        out.push(0x35);
        out.push(id[0]);
        out.push(id[1]);
        out.extend_from_slice(&(response.len() as u16).to_be_bytes());
        out.push(0x00);
        out.push(0x00);
        out.extend_from_slice(&response);
        Some(out)
    }
}

impl Default for DnsResponder {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns `(id, dotted hostname, question section byte length)`.
fn parse_question(query: &[u8]) -> Option<(u16, String, usize)> {
    if query.len() < 12 {
        return None;
    }
    let id = u16::from_be_bytes([query[0], query[1]]);
    let mut pos = 12;
    let mut labels = Vec::new();
    loop {
        let len = *query.get(pos)? as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        pos += 1;
        let label = query.get(pos..pos + len)?;
        labels.push(String::from_utf8_lossy(label).into_owned());
        pos += len;
    }
    pos += 4; // qtype + qclass
    if pos > query.len() {
        return None;
    }
    Some((id, labels.join("."), pos))
}

fn encode_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.') {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

fn build_response(id: u16, hostname: &str, question_len: usize, answer: Option<[u8; 4]>) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&id.to_be_bytes());

    let flags = FLAG_RESPONSE
        | FLAG_RECURSION_AVAILABLE
        | if answer.is_none() { RCODE_NAME_ERROR } else { 0 };
    out.extend_from_slice(&flags.to_be_bytes());

    out.extend_from_slice(&1u16.to_be_bytes()); // qdcount
    out.extend_from_slice(&(answer.is_some() as u16).to_be_bytes()); // ancount
    out.extend_from_slice(&0u16.to_be_bytes()); // nscount
    out.extend_from_slice(&0u16.to_be_bytes()); // arcount

    let name = encode_name(hostname);
    out.extend_from_slice(&name);
    out.extend_from_slice(&QTYPE_A.to_be_bytes());
    out.extend_from_slice(&QCLASS_IN.to_be_bytes());
    let _ = question_len;

    if let Some(ip) = answer {
        out.extend_from_slice(&name);
        out.extend_from_slice(&QTYPE_A.to_be_bytes());
        out.extend_from_slice(&QCLASS_IN.to_be_bytes());
        out.extend_from_slice(&TTL_SECONDS.to_be_bytes());
        out.extend_from_slice(&4u16.to_be_bytes());
        out.extend_from_slice(&ip);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_query(id: u16, hostname: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&0x0100u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&[0u8; 6]);
        out.extend_from_slice(&encode_name(hostname));
        out.extend_from_slice(&QTYPE_A.to_be_bytes());
        out.extend_from_slice(&QCLASS_IN.to_be_bytes());
        out
    }

    #[test]
    fn known_hostname_resolves_to_its_a_record() {
        let responder = DnsResponder::new().with_record("catalog.zune.net", [192, 168, 0, 30]);
        let query = build_query(42, "catalog.zune.net");
        let response = responder.respond_udp(&query).unwrap();
        assert_eq!(&response[0..2], &42u16.to_be_bytes());
        assert_eq!(&response[6..8], &1u16.to_be_bytes()); // ancount
        assert_eq!(&response[response.len() - 4..], &[192, 168, 0, 30]);
    }

    #[test]
    fn hostname_lookup_is_case_insensitive() {
        let responder = DnsResponder::new().with_record("catalog.zune.net", [192, 168, 0, 30]);
        let query = build_query(1, "CATALOG.ZUNE.NET");
        let response = responder.respond_udp(&query).unwrap();
        assert_eq!(&response[response.len() - 4..], &[192, 168, 0, 30]);
    }

    #[test]
    fn unknown_hostname_returns_name_error_with_no_answers() {
        let responder = DnsResponder::new();
        let query = build_query(2, "nowhere.example");
        let response = responder.respond_udp(&query).unwrap();
        assert_eq!(&response[6..8], &0u16.to_be_bytes());
        let flags = u16::from_be_bytes([response[2], response[3]]);
        assert_eq!(flags & 0x000F, RCODE_NAME_ERROR);
    }

    #[test]
    fn tcp_framing_swaps_header_layout_and_preserves_id() {
        let responder = DnsResponder::new().with_record("catalog.zune.net", [192, 168, 0, 30]);
        let message = build_query(99, "catalog.zune.net");
        let mut framed = vec![0x00, 0x99, 0x00, 0x35];
        framed.extend_from_slice(&(message.len() as u16).to_be_bytes());
        framed.extend_from_slice(&[0x00, 0x00]);
        framed.extend_from_slice(&message);

        let response = responder.respond_tcp_framed(&framed).unwrap();
        assert_eq!(&response[0..2], &[0x00, 0x35]);
        assert_eq!(&response[2..4], &[0x00, 0x99]);
    }
}
