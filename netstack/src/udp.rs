use crate::ipv4::{checksum16, pseudo_header};

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpDatagram {
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: Vec<u8>,
}

pub fn parse(segment: &[u8]) -> Option<UdpDatagram> {
    if segment.len() < HEADER_LEN {
        return None;
    }
    let src_port = u16::from_be_bytes([segment[0], segment[1]]);
    let dst_port = u16::from_be_bytes([segment[2], segment[3]]);
    let length = u16::from_be_bytes([segment[4], segment[5]]) as usize;
    if length < HEADER_LEN || segment.len() < length {
        return None;
    }
    Some(UdpDatagram {
        src_port,
        dst_port,
        payload: segment[HEADER_LEN..length].to_vec(),
    })
}

pub fn build(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let length = (HEADER_LEN + payload.len()) as u16;
    let mut segment = vec![0u8; HEADER_LEN];
    segment[0..2].copy_from_slice(&src_port.to_be_bytes());
    segment[2..4].copy_from_slice(&dst_port.to_be_bytes());
    segment[4..6].copy_from_slice(&length.to_be_bytes());
    segment.extend_from_slice(payload);

    let mut for_checksum = pseudo_header(src, dst, crate::ipv4::PROTO_UDP, length);
    for_checksum.extend_from_slice(&segment);
    let csum = checksum16(&for_checksum);
    let csum = if csum == 0 { 0xFFFF } else { csum };
    segment[6..8].copy_from_slice(&csum.to_be_bytes());

    segment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recovers_ports_and_payload() {
        let segment = build([1, 2, 3, 4], [5, 6, 7, 8], 53, 12345, b"hello");
        let datagram = parse(&segment).unwrap();
        assert_eq!(datagram.src_port, 53);
        assert_eq!(datagram.dst_port, 12345);
        assert_eq!(datagram.payload, b"hello");
    }
}
