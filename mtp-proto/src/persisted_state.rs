use std::fs;
use std::path::Path;

use zcommon::bytes::decode_utf16le_until_nul;
use zcommon::{Result, ZuneError};

/// The pairing GUID is a single-line ASCII text file: the host side of the
/// one-time MTPZ pairing handshake, reused across sessions.
pub fn read_pairing_guid(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ZuneError::TransportFailure(e.to_string())),
    }
}

pub fn write_pairing_guid(path: &Path, guid: &str) -> Result<()> {
    fs::write(path, guid).map_err(|e| ZuneError::TransportFailure(e.to_string()))
}

/// The device session GUID is persisted as raw UTF-16LE bytes (no BOM, no
/// trailing NUL guaranteed), matching the wire encoding it was read from.
pub fn read_device_session_guid(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => {
            let (text, _) = decode_utf16le_until_nul(&bytes, 0);
            Ok(Some(text))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ZuneError::TransportFailure(e.to_string())),
    }
}

pub fn write_device_session_guid(path: &Path, guid: &str) -> Result<()> {
    let mut bytes = Vec::with_capacity(guid.len() * 2);
    for unit in guid.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    fs::write(path, bytes).map_err(|e| ZuneError::TransportFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn pairing_guid_round_trips_through_a_text_file() {
        let path = env::temp_dir().join("zune_test_pairing_guid.txt");
        write_pairing_guid(&path, "ABCD-1234").unwrap();
        assert_eq!(
            read_pairing_guid(&path).unwrap(),
            Some("ABCD-1234".to_string())
        );
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_pairing_guid_file_is_not_an_error() {
        let path = env::temp_dir().join("zune_test_missing_pairing_guid.txt");
        fs::remove_file(&path).ok();
        assert_eq!(read_pairing_guid(&path).unwrap(), None);
    }

    #[test]
    fn device_session_guid_round_trips_as_utf16le() {
        let path = env::temp_dir().join("zune_test_session_guid.bin");
        write_device_session_guid(&path, "{1234-5678}").unwrap();
        assert_eq!(
            read_device_session_guid(&path).unwrap(),
            Some("{1234-5678}".to_string())
        );
        fs::remove_file(&path).ok();
    }
}
