use std::time::Duration;

use crate::session::BulkPipe;
use zcommon::{Result, ZuneError};

/// The three id bytes identifying the whole-library ZMDB blob request.
pub const WHOLE_LIBRARY_ID: [u8; 3] = [0x03, 0x92, 0x1F];

const PREPARE_WAIT: Duration = Duration::from_millis(250);
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const HEADER_LEN: usize = 12;

/// Build the 16-byte vendor command that requests a ZMDB blob by its 3-byte
/// id. `WHOLE_LIBRARY_ID` requests the entire metadata database.
pub fn build_request_command(id: [u8; 3]) -> [u8; 16] {
    [
        0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x17, 0x92, id[0], id[1], id[2], 0x00, 0x01, 0x00,
        0x00, 0x00,
    ]
}

/// Write the request command, wait for the device to prepare the blob, then
/// read the length-prefixed payload and drain anything left over.
///
/// The first 4 bytes of the response are the total size (including the
/// header itself); anything beyond `HEADER_LEN` bytes total is payload.
pub fn request_blob(pipe: &mut dyn BulkPipe, id: [u8; 3]) -> Result<Vec<u8>> {
    let command = build_request_command(id);
    pipe.write(&command, READ_TIMEOUT)?;
    std::thread::sleep(PREPARE_WAIT);

    let header = pipe.read(READ_TIMEOUT)?;
    if header.len() < 4 {
        return Err(ZuneError::ProtocolMismatch(
            "zmdb response shorter than its size header".into(),
        ));
    }
    let total = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;

    if total <= HEADER_LEN {
        return Ok(Vec::new());
    }

    let mut payload = header[HEADER_LEN.min(header.len())..].to_vec();
    while payload.len() < total - HEADER_LEN {
        let chunk = pipe.read(READ_TIMEOUT)?;
        if chunk.is_empty() {
            break;
        }
        payload.extend_from_slice(&chunk);
    }
    payload.truncate(total - HEADER_LEN);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_library_command_matches_wire_layout() {
        let cmd = build_request_command(WHOLE_LIBRARY_ID);
        assert_eq!(
            cmd,
            [
                0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x17, 0x92, 0x03, 0x92, 0x1F, 0x00, 0x01,
                0x00, 0x00, 0x00
            ]
        );
    }
}
