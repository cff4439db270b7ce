use std::collections::{HashMap, HashSet};

use zcommon::bytes::{decode_utf16le_until, read_cstr_ascii, read_u16_le, read_u32_le, read_u8};

use crate::family::DeviceFamily;
use crate::property_map::{make_pid, pid_category, pid_index, CATEGORY_ALBUM};

const MARKER_MP3: u16 = 0x3009;
const MARKER_WMA: u16 = 0xB901;

/// One track record as it falls out of the linear marker scan, before it is
/// joined against its album.
#[derive(Debug, Clone)]
pub struct RawTrack {
    pub title: String,
    pub track_number: u8,
    /// Grouping key for this track's album: `0x0800|idx` on Pavo (translated
    /// from the raw album pid), the raw album pid unchanged on classic.
    pub metadata_pid: u32,
    /// The 4-byte value at the track's "0x0800 ref" displacement, used to
    /// constrain F-marker album matches to this track's actual album.
    pub track_ref: u32,
    /// The raw codec marker this track was found under (0x3009 or 0xB901).
    pub codec_marker: u16,
    /// Byte offset of the marker itself; stable within one extraction run,
    /// used as the track's atom id.
    pub marker_offset: usize,
}

/// Scan the whole blob (Pavo) or the region after the stale-data cutoff
/// (classic) for codec markers, yielding one [`RawTrack`] per valid hit.
/// A marker whose title is empty, or whose implied album pid is not an
/// album-category pid (0x0600), is skipped — not an error, just not a track.
pub fn scan_tracks(blob: &[u8], family: DeviceFamily) -> Vec<RawTrack> {
    let mut tracks = Vec::new();
    let start = family.track_scan_start();
    if start >= blob.len() {
        return tracks;
    }
    let mut offset = start;
    while offset + 2 <= blob.len() {
        let marker = match read_u16_le(blob, offset) {
            Some(m) => m,
            None => break,
        };
        if marker == MARKER_MP3 || marker == MARKER_WMA {
            if let Some(track) = try_read_track(blob, offset, marker, family) {
                tracks.push(track);
            }
        }
        offset += 1;
    }
    tracks
}

fn try_read_track(
    blob: &[u8],
    marker_offset: usize,
    codec_marker: u16,
    family: DeviceFamily,
) -> Option<RawTrack> {
    let (title, _) = read_cstr_ascii(blob, marker_offset.checked_add(4)?)?;

    let track_number = read_u8(blob, marker_offset.checked_sub(4)?)?;

    let album_pid_at = signed_offset(marker_offset, family.album_pid_offset())?;
    let album_pid = read_u32_le(blob, album_pid_at)?;
    if pid_category(album_pid) != CATEGORY_ALBUM {
        return None;
    }

    let ref_at = signed_offset(marker_offset, family.track_ref_offset())?;
    let track_ref = read_u32_le(blob, ref_at)?;

    let metadata_pid = if family.is_pavo() {
        make_pid(0x0800, pid_index(album_pid))
    } else {
        album_pid
    };

    Some(RawTrack {
        title,
        track_number,
        metadata_pid,
        track_ref,
        codec_marker,
        marker_offset,
    })
}

fn signed_offset(base: usize, delta: i64) -> Option<usize> {
    let result = base as i64 + delta;
    if result < 0 {
        None
    } else {
        Some(result as usize)
    }
}

/// Tracks grouped by album metadata pid, with the accumulated set of
/// per-track 0x0800-refs used to constrain F-marker search.
pub fn group_by_album(tracks: &[RawTrack]) -> HashMap<u32, (Vec<&RawTrack>, HashSet<u32>)> {
    let mut groups: HashMap<u32, (Vec<&RawTrack>, HashSet<u32>)> = HashMap::new();
    for track in tracks {
        let entry = groups.entry(track.metadata_pid).or_default();
        entry.0.push(track);
        entry.1.insert(track.track_ref);
    }
    groups
}

/// The three strings an album record carries: name, artist, and the
/// reconstructed `artist--album.alb` reference.
#[derive(Debug, Clone)]
pub struct AlbumStrings {
    pub title: String,
    pub artist: String,
    pub alb_reference: String,
}

/// Read the album name (NUL-terminated ASCII) at `name_offset`, then the
/// artist (UTF-16LE up to and including `--`) and the `.alb`-suffixed
/// reference immediately after it. All three must be present or the whole
/// read fails (mirrors the "direct read" and "F-marker" rules, which share
/// this string layout once the record's base offset is known).
fn read_album_strings(blob: &[u8], name_offset: usize) -> Option<AlbumStrings> {
    let (title, consumed) = read_cstr_ascii(blob, name_offset)?;
    let artist_start = name_offset + consumed;

    let (artist_raw, consumed2) = decode_utf16le_until(blob, artist_start, |s| s.ends_with("--"));
    if !artist_raw.ends_with("--") {
        return None;
    }
    let artist = artist_raw.trim_end_matches("--").to_string();

    let alb_start = artist_start + consumed2;
    let (suffix, _) = decode_utf16le_until(blob, alb_start, |s| s.ends_with(".alb"));
    if !suffix.ends_with(".alb") {
        return None;
    }

    Some(AlbumStrings {
        title,
        artist,
        alb_reference: format!("{artist_raw}{suffix}"),
    })
}

/// Direct read at pointer `p`: the album-name offset is family-dependent,
/// the rest follows [`read_album_strings`].
pub fn direct_read(blob: &[u8], p: usize, family: DeviceFamily) -> Option<AlbumStrings> {
    read_album_strings(blob, p + family.direct_name_offset())
}

/// An 18-byte GUID prefix, flagged by a `0x1410` marker 16 bytes into the
/// F-marker hit, sits between the marker and the album-name string when
/// present and must be skipped.
const GUID_PREFIX_MARKER: u16 = 0x1410;
const GUID_PREFIX_LEN: usize = 18;

/// Scan forward from `start` in 4-byte strides for an F-marker (byte[2] ==
/// 0x00, byte[3] == 'F'). A hit whose ref-set membership fails (when
/// `ref_set` is non-empty) is skipped and the scan continues — a blob can
/// contain several F-marker-shaped patterns before the one that belongs to
/// this album.
pub fn f_marker_search(
    blob: &[u8],
    start: usize,
    ref_set: &HashSet<u32>,
    family: DeviceFamily,
) -> Option<AlbumStrings> {
    let mut offset = start;
    while offset + 8 <= blob.len() {
        let b2 = read_u8(blob, offset + 2)?;
        let b3 = read_u8(blob, offset + 3)?;
        if b2 == 0x00 && b3 == 0x46 {
            if let Some(candidate) = try_f_marker_hit(blob, offset, ref_set, family) {
                return Some(candidate);
            }
        }
        offset += 4;
    }
    None
}

fn try_f_marker_hit(
    blob: &[u8],
    offset: usize,
    ref_set: &HashSet<u32>,
    family: DeviceFamily,
) -> Option<AlbumStrings> {
    let marker_ref = read_u32_le(blob, offset + 4)?;
    if !ref_set.is_empty() && !ref_set.contains(&marker_ref) {
        return None;
    }

    let mut name_offset = offset + family.f_marker_name_offset();
    if read_u16_le(blob, offset + 16) == Some(GUID_PREFIX_MARKER) {
        name_offset += GUID_PREFIX_LEN;
    }
    read_album_strings(blob, name_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|c| c.to_le_bytes()).collect()
    }

    #[test]
    fn direct_read_extracts_name_artist_and_reference() {
        let mut blob = vec![0u8; 24];
        blob.extend_from_slice(b"Debut Album\0");
        blob.extend_from_slice(&utf16le("Some Artist--Debut Album.alb"));
        let album = direct_read(&blob, 0, DeviceFamily::Keel).unwrap();
        assert_eq!(album.title, "Debut Album");
        assert_eq!(album.artist, "Some Artist");
        assert_eq!(album.alb_reference, "Some Artist--Debut Album.alb");
    }

    #[test]
    fn track_scan_finds_marker_and_translates_pavo_pid() {
        let family = DeviceFamily::Pavo;
        let marker_off = 32usize;
        let mut blob = vec![0u8; marker_off + 4 + 10];
        blob[marker_off - 4] = 1; // track number
        let album_pid = make_pid(CATEGORY_ALBUM, 0x5A);
        let ref_at = (marker_off as i64 + family.album_pid_offset()) as usize;
        blob[ref_at..ref_at + 4].copy_from_slice(&album_pid.to_le_bytes());
        blob[marker_off..marker_off + 2].copy_from_slice(&MARKER_MP3.to_le_bytes());
        blob[marker_off + 4..marker_off + 4 + 10].copy_from_slice(b"Hello.mp3\0");

        let tracks = scan_tracks(&blob, family);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Hello.mp3");
        assert_eq!(tracks[0].track_number, 1);
        assert_eq!(tracks[0].metadata_pid, make_pid(0x0800, 0x5A));
    }

    #[test]
    fn f_marker_search_requires_ref_membership() {
        let family = DeviceFamily::Keel;
        let mut blob = vec![0u8; 64];
        // F-marker at offset 8: byte[2]=0x00, byte[3]=0x46
        blob[8 + 2] = 0x00;
        blob[8 + 3] = 0x46;
        let wrong_ref = 999u32;
        blob[8 + 4..8 + 8].copy_from_slice(&wrong_ref.to_le_bytes());
        let mut ref_set = HashSet::new();
        ref_set.insert(42u32);
        assert!(f_marker_search(&blob, 0, &ref_set, family).is_none());
    }
}
