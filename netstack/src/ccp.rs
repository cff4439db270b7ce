//! Compression Control Protocol responder. Stateless: we never actually
//! negotiate a compression scheme, we just reject every option the peer
//! proposes so it falls back to uncompressed framing.

const CODE_CONFIG_REQUEST: u8 = 1;
const CODE_CONFIG_ACK: u8 = 2;
const CODE_CONFIG_REJECT: u8 = 4;

/// Handles one incoming CCP packet. Returns `None` for malformed input
/// (length field mismatched against the actual packet size) and for codes
/// we don't act on.
pub fn handle(packet: &[u8]) -> Option<Vec<u8>> {
    if packet.len() < 4 {
        return None;
    }
    let code = packet[0];
    let identifier = packet[1];
    let length = u16::from_be_bytes([packet[2], packet[3]]) as usize;
    if length != packet.len() {
        return None;
    }

    match code {
        CODE_CONFIG_REQUEST if length == 4 => {
            Some(vec![CODE_CONFIG_ACK, identifier, 0x00, 0x04])
        }
        CODE_CONFIG_REQUEST => {
            let options = packet[4..].to_vec();
            let mut out = vec![CODE_CONFIG_REJECT, identifier];
            out.extend_from_slice(&(length as u16).to_be_bytes());
            out.extend_from_slice(&options);
            Some(out)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_only_request_is_acked() {
        let request = vec![CODE_CONFIG_REQUEST, 5, 0x00, 0x04];
        let response = handle(&request).unwrap();
        assert_eq!(response, vec![CODE_CONFIG_ACK, 5, 0x00, 0x04]);
    }

    #[test]
    fn request_with_options_is_rejected_verbatim() {
        let mut request = vec![CODE_CONFIG_REQUEST, 6, 0x00, 0x06, 0x11, 0x22];
        let response = handle(&request).unwrap();
        assert_eq!(response[0], CODE_CONFIG_REJECT);
        assert_eq!(response[1], 6);
        assert_eq!(&response[4..], &request[4..]);
        request.truncate(0);
        let _ = request;
    }

    #[test]
    fn length_mismatch_is_silently_discarded() {
        let request = vec![CODE_CONFIG_REQUEST, 7, 0x00, 0x09, 0x01];
        assert!(handle(&request).is_none());
    }
}
