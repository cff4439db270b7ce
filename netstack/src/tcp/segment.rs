use crate::ipv4::{checksum16, pseudo_header, PROTO_TCP};

pub const FLAG_FIN: u8 = 0x01;
pub const FLAG_SYN: u8 = 0x02;
pub const FLAG_RST: u8 = 0x04;
pub const FLAG_PSH: u8 = 0x08;
pub const FLAG_ACK: u8 = 0x10;

const HEADER_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: u8,
    pub window: u16,
    pub payload: Vec<u8>,
}

impl TcpSegment {
    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

pub fn parse(segment: &[u8]) -> Option<TcpSegment> {
    if segment.len() < HEADER_LEN {
        return None;
    }
    let data_offset = ((segment[12] >> 4) as usize) * 4;
    if segment.len() < data_offset {
        return None;
    }
    Some(TcpSegment {
        src_port: u16::from_be_bytes([segment[0], segment[1]]),
        dst_port: u16::from_be_bytes([segment[2], segment[3]]),
        seq: u32::from_be_bytes([segment[4], segment[5], segment[6], segment[7]]),
        ack: u32::from_be_bytes([segment[8], segment[9], segment[10], segment[11]]),
        flags: segment[13],
        window: u16::from_be_bytes([segment[14], segment[15]]),
        payload: segment[data_offset..].to_vec(),
    })
}

#[allow(clippy::too_many_arguments)]
pub fn build(
    src: [u8; 4],
    dst: [u8; 4],
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: u32,
    flags: u8,
    window: u16,
    payload: &[u8],
) -> Vec<u8> {
    let total_len = HEADER_LEN + payload.len();
    let mut segment = vec![0u8; HEADER_LEN];
    segment[0..2].copy_from_slice(&src_port.to_be_bytes());
    segment[2..4].copy_from_slice(&dst_port.to_be_bytes());
    segment[4..8].copy_from_slice(&seq.to_be_bytes());
    segment[8..12].copy_from_slice(&ack.to_be_bytes());
    segment[12] = 5 << 4;
    segment[13] = flags;
    segment[14..16].copy_from_slice(&window.to_be_bytes());
    segment.extend_from_slice(payload);

    let mut for_checksum = pseudo_header(src, dst, PROTO_TCP, total_len as u16);
    for_checksum.extend_from_slice(&segment);
    let csum = checksum16(&for_checksum);
    segment[16..18].copy_from_slice(&csum.to_be_bytes());

    segment
}

/// Modular sequence-number comparison: `seq - reference` as a signed i32,
/// so wraparound past `u32::MAX` is handled correctly.
pub fn seq_diff(seq: u32, reference: u32) -> i32 {
    seq.wrapping_sub(reference) as i32
}

pub fn seq_after(a: u32, b: u32) -> bool {
    seq_diff(a, b) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_flags_and_sequence_numbers() {
        let bytes = build(
            [1, 2, 3, 4],
            [5, 6, 7, 8],
            1000,
            80,
            0xFFFFFFF0,
            5,
            FLAG_SYN | FLAG_ACK,
            65535,
            b"payload",
        );
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.seq, 0xFFFFFFF0);
        assert!(parsed.has(FLAG_SYN));
        assert!(parsed.has(FLAG_ACK));
        assert!(!parsed.has(FLAG_FIN));
        assert_eq!(parsed.payload, b"payload");
    }

    #[test]
    fn seq_wraparound_is_handled_modularly() {
        let end = 0xFFFFFFF0u32.wrapping_add(20);
        assert_eq!(end, 0x00000004);
        assert!(seq_after(end, 0xFFFFFFF0));
        assert_eq!(seq_diff(end, 0xFFFFFFF0), 20);
    }
}
