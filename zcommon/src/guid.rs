//! GUID formatting and the Windows mixed-endian wire layout.
//!
//! MusicBrainz-style artist/album-artist GUIDs are plain strings and are
//! **never** byte-flipped: they are compared and stored as the lowercase
//! 8-4-4-4-12 hex form. The mixed-endian conversion in this module is only
//! used for values embedded in the device's native `GUID` struct layout
//! (e.g. a playlist's content-type identifier): the first three components
//! are little-endian, the last two are written as-is.

use crate::error::{Result, ZuneError};
use once_cell::sync::Lazy;
use regex::Regex;

static GUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .unwrap()
});

/// Validate a GUID string against the canonical 8-4-4-4-12 hex pattern.
pub fn is_valid_guid(s: &str) -> bool {
    GUID_RE.is_match(s)
}

/// Parse the 5 hyphen-separated components of a canonical GUID string into
/// raw hex bytes, without any endianness transformation.
fn parse_components(guid: &str) -> Result<[Vec<u8>; 5]> {
    if !is_valid_guid(guid) {
        return Err(ZuneError::InvalidInput(format!("malformed guid: {guid}")));
    }
    let parts: Vec<&str> = guid.split('-').collect();
    let mut out: [Vec<u8>; 5] = Default::default();
    for (i, part) in parts.iter().enumerate() {
        out[i] = hex::decode(part)
            .map_err(|e| ZuneError::InvalidInput(format!("bad guid hex: {e}")))?;
    }
    Ok(out)
}

/// Encode a 36-char GUID string into the 16-byte Windows mixed-endian wire
/// layout: `Data1` (4 bytes) and `Data2`/`Data3` (2 bytes each) are
/// byte-reversed to little-endian; `Data4` (8 bytes) is written as-is.
pub fn guid_to_mixed_endian_bytes(guid: &str) -> Result<[u8; 16]> {
    let components = parse_components(guid)?;
    let mut out = [0u8; 16];
    let mut cursor = 0;
    for (idx, part) in components.iter().take(3).enumerate() {
        let mut bytes = part.clone();
        bytes.reverse();
        let _ = idx;
        out[cursor..cursor + bytes.len()].copy_from_slice(&bytes);
        cursor += bytes.len();
    }
    for part in components.iter().skip(3) {
        out[cursor..cursor + part.len()].copy_from_slice(part);
        cursor += part.len();
    }
    Ok(out)
}

/// Decode the 16-byte Windows mixed-endian wire layout back into a canonical
/// lowercase GUID string. Inverse of [`guid_to_mixed_endian_bytes`].
pub fn mixed_endian_bytes_to_guid(bytes: &[u8; 16]) -> String {
    let mut d1 = bytes[0..4].to_vec();
    d1.reverse();
    let mut d2 = bytes[4..6].to_vec();
    d2.reverse();
    let mut d3 = bytes[6..8].to_vec();
    d3.reverse();
    let d4a = &bytes[8..10];
    let d4b = &bytes[10..16];
    format!(
        "{}-{}-{}-{}-{}",
        hex::encode(d1),
        hex::encode(d2),
        hex::encode(d3),
        hex::encode(d4a),
        hex::encode(d4b)
    )
}

/// Interpret the mixed-endian wire bytes as a little-endian `u128`, the form
/// the property-list writer embeds inline for a GUID-typed property value.
pub fn guid_to_mixed_endian_u128(guid: &str) -> Result<u128> {
    let bytes = guid_to_mixed_endian_bytes(guid)?;
    Ok(u128::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_guid() {
        assert!(!is_valid_guid("not-a-guid"));
        assert!(is_valid_guid("12345678-1234-1234-1234-123456789012"));
    }

    #[test]
    fn mixed_endian_round_trips_lowercased() {
        let guid = "01234567-89AB-CDEF-0123-456789ABCDEF";
        let bytes = guid_to_mixed_endian_bytes(guid).unwrap();
        let back = mixed_endian_bytes_to_guid(&bytes);
        assert_eq!(back, guid.to_lowercase());
    }

    #[test]
    fn mixed_endian_reverses_first_three_components_only() {
        // Data1/2/3 are reversed; Data4 (last two groups) is untouched.
        let guid = "00112233-4455-6677-8899-aabbccddeeff";
        let bytes = guid_to_mixed_endian_bytes(guid).unwrap();
        assert_eq!(&bytes[0..4], &[0x33, 0x22, 0x11, 0x00]);
        assert_eq!(&bytes[4..6], &[0x55, 0x44]);
        assert_eq!(&bytes[6..8], &[0x77, 0x66]);
        assert_eq!(&bytes[8..10], &[0x88, 0x99]);
        assert_eq!(&bytes[10..16], &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(guid_to_mixed_endian_bytes("bogus").is_err());
    }
}
