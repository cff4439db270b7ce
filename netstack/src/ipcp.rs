//! Single-session IPCP responder (RFC 1332). The observed device flow opens
//! by offering 0.0.0.0 for both its IP and DNS, asking us to supply both.

const CODE_CONFIG_REQUEST: u8 = 1;
const CODE_CONFIG_ACK: u8 = 2;
const CODE_CONFIG_NAK: u8 = 3;
const CODE_CONFIG_REJECT: u8 = 4;

const OPT_IP_COMPRESSION: u8 = 2;
const OPT_IP_ADDRESS: u8 = 3;
const OPT_PRIMARY_DNS: u8 = 129;
const OPT_SECONDARY_DNS: u8 = 131;

pub struct IpcpConfig {
    pub device_ip: [u8; 4],
    pub host_ip: [u8; 4],
    pub dns_ip: [u8; 4],
}

pub struct IpcpResponder {
    config: IpcpConfig,
    next_own_identifier: u8,
}

struct Option_ {
    option_type: u8,
    data: Vec<u8>,
}

fn parse_options(packet: &[u8]) -> Vec<Option_> {
    let mut options = Vec::new();
    let mut pos = 0;
    while pos + 2 <= packet.len() {
        let option_type = packet[pos];
        let len = packet[pos + 1] as usize;
        if len < 2 || pos + len > packet.len() {
            break;
        }
        options.push(Option_ {
            option_type,
            data: packet[pos + 2..pos + len].to_vec(),
        });
        pos += len;
    }
    options
}

fn build_packet(code: u8, identifier: u8, options: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (t, data) in options {
        body.push(*t);
        body.push((2 + data.len()) as u8);
        body.extend_from_slice(data);
    }
    let length = (4 + body.len()) as u16;
    let mut out = vec![code, identifier];
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&body);
    out
}

impl IpcpResponder {
    pub fn new(config: IpcpConfig) -> Self {
        Self {
            config,
            next_own_identifier: 1,
        }
    }

    /// Handles one incoming IPCP packet; returns the response packet, if
    /// any (a Config-Ack to our own Request never returns one here; it is
    /// observed via [`IpcpResponder::is_our_proposal_acked`]).
    pub fn handle(&mut self, packet: &[u8]) -> Option<Vec<u8>> {
        if packet.len() < 4 {
            return None;
        }
        let code = packet[0];
        let identifier = packet[1];
        let body = &packet[4..];

        match code {
            CODE_CONFIG_REQUEST => Some(self.handle_config_request(identifier, body)),
            _ => None,
        }
    }

    fn handle_config_request(&mut self, identifier: u8, body: &[u8]) -> Vec<u8> {
        let options = parse_options(body);

        let proposes_our_ip = options.iter().any(|o| {
            o.option_type == OPT_IP_ADDRESS && o.data.as_slice() == self.config.device_ip
        });
        let proposes_our_dns = options.iter().any(|o| {
            o.option_type == OPT_PRIMARY_DNS && o.data.as_slice() == self.config.dns_ip
        });

        if proposes_our_ip && proposes_our_dns {
            return build_packet(CODE_CONFIG_ACK, identifier, &[]);
        }

        let mut reject_options = Vec::new();
        let mut nak_options = Vec::new();

        for opt in &options {
            match opt.option_type {
                OPT_IP_COMPRESSION => reject_options.push((opt.option_type, opt.data.clone())),
                OPT_IP_ADDRESS => nak_options.push((OPT_IP_ADDRESS, self.config.device_ip.to_vec())),
                OPT_PRIMARY_DNS => nak_options.push((OPT_PRIMARY_DNS, self.config.dns_ip.to_vec())),
                OPT_SECONDARY_DNS => nak_options.push((OPT_SECONDARY_DNS, self.config.dns_ip.to_vec())),
                _ => reject_options.push((opt.option_type, opt.data.clone())),
            }
        }

        if !reject_options.is_empty() {
            build_packet(CODE_CONFIG_REJECT, identifier, &reject_options)
        } else {
            build_packet(CODE_CONFIG_NAK, identifier, &nak_options)
        }
    }

    /// Builds our own Config-Request proposing our host IP and DNS, using a
    /// monotonically increasing identifier.
    pub fn build_own_request(&mut self) -> Vec<u8> {
        let identifier = self.next_own_identifier;
        self.next_own_identifier = self.next_own_identifier.wrapping_add(1);
        build_packet(
            CODE_CONFIG_REQUEST,
            identifier,
            &[
                (OPT_IP_ADDRESS, self.config.host_ip.to_vec()),
                (OPT_PRIMARY_DNS, self.config.dns_ip.to_vec()),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IpcpConfig {
        IpcpConfig {
            device_ip: [192, 168, 55, 101],
            host_ip: [192, 168, 55, 100],
            dns_ip: [192, 168, 0, 30],
        }
    }

    #[test]
    fn device_offering_zero_addresses_gets_a_nak_with_our_ips() {
        let mut responder = IpcpResponder::new(config());
        let request = build_packet(
            CODE_CONFIG_REQUEST,
            7,
            &[(OPT_IP_ADDRESS, vec![0, 0, 0, 0]), (OPT_PRIMARY_DNS, vec![0, 0, 0, 0])],
        );
        let response = responder.handle(&request).unwrap();
        assert_eq!(response[0], CODE_CONFIG_NAK);
        assert_eq!(response[1], 7);
        let options = parse_options(&response[4..]);
        assert!(options
            .iter()
            .any(|o| o.option_type == OPT_IP_ADDRESS && o.data == config().device_ip.to_vec()));
    }

    #[test]
    fn matching_proposal_is_acked() {
        let mut responder = IpcpResponder::new(config());
        let request = build_packet(
            CODE_CONFIG_REQUEST,
            8,
            &[
                (OPT_IP_ADDRESS, config().device_ip.to_vec()),
                (OPT_PRIMARY_DNS, config().dns_ip.to_vec()),
            ],
        );
        let response = responder.handle(&request).unwrap();
        assert_eq!(response[0], CODE_CONFIG_ACK);
        assert_eq!(response[1], 8);
    }

    #[test]
    fn unknown_option_forces_a_reject_not_a_nak() {
        let mut responder = IpcpResponder::new(config());
        let request = build_packet(
            CODE_CONFIG_REQUEST,
            9,
            &[(OPT_IP_ADDRESS, vec![0, 0, 0, 0]), (99, vec![1, 2])],
        );
        let response = responder.handle(&request).unwrap();
        assert_eq!(response[0], CODE_CONFIG_REJECT);
        let options = parse_options(&response[4..]);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].option_type, 99);
    }
}
