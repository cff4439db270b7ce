//! PPP framing: flag-delimited frames with byte stuffing and a CRC-16/X-25
//! frame check sequence, plus a reassembler that carries an incomplete
//! frame across USB reads.

const FLAG: u8 = 0x7E;
const ESCAPE: u8 = 0x7D;
const ESCAPE_XOR: u8 = 0x20;

pub const PROTO_IPV4: u16 = 0x0021;
pub const PROTO_LCP: u16 = 0xC021;
pub const PROTO_IPCP: u16 = 0x8021;
pub const PROTO_CCP: u16 = 0x80FD;

fn needs_escaping(byte: u8) -> bool {
    byte == FLAG || byte == ESCAPE || byte < 0x20
}

/// CRC-16/X-25: poly 0x1021 reflected (0x8408), init 0xFFFF, final XOR
/// 0xFFFF, LSB-first over the bitstream.
fn fcs16(data: &[u8]) -> u16 {
    let mut fcs: u16 = 0xFFFF;
    for &byte in data {
        fcs ^= byte as u16;
        for _ in 0..8 {
            if fcs & 1 != 0 {
                fcs = (fcs >> 1) ^ 0x8408;
            } else {
                fcs >>= 1;
            }
        }
    }
    !fcs
}

fn push_escaped(out: &mut Vec<u8>, byte: u8) {
    if needs_escaping(byte) {
        out.push(ESCAPE);
        out.push(byte ^ ESCAPE_XOR);
    } else {
        out.push(byte);
    }
}

/// Builds one complete flag-delimited PPP frame: protocol field (1 byte if
/// compressible, else 2), payload, FCS-16, all escaped, bracketed by 0x7E.
pub fn frame(payload: &[u8], protocol: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 4);
    if protocol & 0xFF00 == 0 && protocol & 1 == 1 {
        body.push(protocol as u8);
    } else {
        body.extend_from_slice(&protocol.to_be_bytes());
    }
    body.extend_from_slice(payload);

    let fcs = fcs16(&body);
    body.extend_from_slice(&fcs.to_le_bytes());

    let mut out = Vec::with_capacity(body.len() * 2 + 2);
    out.push(FLAG);
    for &byte in &body {
        push_escaped(&mut out, byte);
    }
    out.push(FLAG);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnframeError;

/// Unescapes and validates one already-flag-stripped frame body (protocol +
/// payload + 2-byte FCS), returning the payload and protocol on success.
fn decode_body(body: &[u8]) -> Result<(Vec<u8>, u16), UnframeError> {
    let mut unescaped = Vec::with_capacity(body.len());
    let mut iter = body.iter().copied();
    while let Some(byte) = iter.next() {
        if byte == ESCAPE {
            let next = iter.next().ok_or(UnframeError)?;
            unescaped.push(next ^ ESCAPE_XOR);
        } else {
            unescaped.push(byte);
        }
    }

    if unescaped.len() < 3 {
        return Err(UnframeError);
    }
    let (data, fcs_bytes) = unescaped.split_at(unescaped.len() - 2);
    let received_fcs = u16::from_le_bytes([fcs_bytes[0], fcs_bytes[1]]);
    if fcs16(data) != received_fcs {
        return Err(UnframeError);
    }

    if data.is_empty() {
        return Err(UnframeError);
    }
    let (protocol, payload) = if data[0] & 1 != 0 {
        (data[0] as u16, &data[1..])
    } else {
        if data.len() < 2 {
            return Err(UnframeError);
        }
        (u16::from_be_bytes([data[0], data[1]]), &data[2..])
    };

    Ok((payload.to_vec(), protocol))
}

/// Decode exactly one frame: `data` must start with a flag and contain a
/// matching closing flag. Used directly by tests; the dispatcher instead
/// drives [`FrameReassembler`] over a stream of USB reads.
pub fn unframe(data: &[u8]) -> Result<(Vec<u8>, u16), UnframeError> {
    if data.len() < 2 || data[0] != FLAG || *data.last().unwrap() != FLAG {
        return Err(UnframeError);
    }
    decode_body(&data[1..data.len() - 1])
}

/// Carries a partial frame across bulk-IN reads and extracts every complete
/// frame from a chunk of freshly read bytes, possibly several concatenated
/// back-to-back.
#[derive(Default)]
pub struct FrameReassembler {
    pending: Vec<u8>,
    in_frame: bool,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed freshly read bytes; returns every complete `(payload, protocol)`
    /// frame found. Malformed frames are dropped (logged by the caller),
    /// not surfaced as an error, since one corrupt frame must not block
    /// frames following it in the same read.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<(Vec<u8>, u16)> {
        let mut out = Vec::new();
        for &byte in chunk {
            if byte == FLAG {
                if self.in_frame && !self.pending.is_empty() {
                    if let Ok(frame) = decode_body(&self.pending) {
                        out.push(frame);
                    }
                    self.pending.clear();
                    self.in_frame = false;
                } else {
                    self.pending.clear();
                    self.in_frame = true;
                }
            } else if self.in_frame {
                self.pending.push(byte);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_payload_containing_control_bytes() {
        let payload = vec![0x7E, 0x7D, 0x03, 0x21, 0x00, 0xFF];
        let framed = frame(&payload, PROTO_IPV4);
        assert_eq!(framed[0], FLAG);
        assert_eq!(*framed.last().unwrap(), FLAG);
        assert!(framed[1..framed.len() - 1]
            .windows(1)
            .filter(|w| w[0] == FLAG)
            .count()
            == 0);
        let (decoded_payload, protocol) = unframe(&framed).unwrap();
        assert_eq!(decoded_payload, payload);
        assert_eq!(protocol, PROTO_IPV4);
    }

    #[test]
    fn protocol_field_compresses_only_when_high_byte_zero_and_odd() {
        // 0x0021 (IPv4) qualifies: high byte 0, low byte odd -> single-byte form.
        let framed = frame(&[0x01], PROTO_IPV4);
        assert_eq!(framed.len(), 1 /*flag*/ + 1 /*proto*/ + 1 /*payload*/ + 2 /*fcs*/ + 1 /*flag*/);
        let (_, protocol) = unframe(&framed).unwrap();
        assert_eq!(protocol, PROTO_IPV4);

        // 0x8021 (IPCP) does not qualify: high byte nonzero -> two-byte form.
        let framed_ipcp = frame(&[0x01], PROTO_IPCP);
        assert_eq!(framed_ipcp.len(), 1 + 2 + 1 + 2 + 1);
        let (_, protocol) = unframe(&framed_ipcp).unwrap();
        assert_eq!(protocol, PROTO_IPCP);
    }

    #[test]
    fn reassembler_extracts_frame_split_across_two_reads() {
        let payload = b"hello world, this is a longer payload".to_vec();
        let framed = frame(&payload, PROTO_IPV4);
        let mid = framed.len() / 2;
        let mut reassembler = FrameReassembler::new();
        let mut frames = reassembler.feed(&framed[..mid]);
        assert!(frames.is_empty());
        frames.extend(reassembler.feed(&framed[mid..]));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, payload);
        assert_eq!(frames[0].1, PROTO_IPV4);
    }

    #[test]
    fn reassembler_extracts_multiple_frames_from_one_chunk() {
        let a = frame(b"AAA", PROTO_IPCP);
        let b = frame(b"BBB", PROTO_CCP);
        let mut concatenated = a;
        concatenated.extend_from_slice(&b);
        let mut reassembler = FrameReassembler::new();
        let frames = reassembler.feed(&concatenated);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].1, PROTO_IPCP);
        assert_eq!(frames[1].1, PROTO_CCP);
    }
}
