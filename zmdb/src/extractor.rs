use std::collections::HashSet;

use zlibrary::{Album, Artist, Codec, Library, Rating, Track};

use crate::error::ZmdbError;
use crate::family::DeviceFamily;
use crate::property_map::{make_pid, pid_index, PropertyMap};
use crate::scan::{self, group_by_album, AlbumStrings};

/// Parse a ZMDB blob into a [`Library`].
///
/// Stateless and deterministic: the same bytes and family tag always yield
/// the same library. An empty blob (one whose property map is just the
/// terminator, with no track markers) yields an empty library rather than
/// an error. Any album whose six-step search fails entirely is logged and
/// dropped; it never aborts the overall extraction.
pub fn extract(blob: &[u8], family: DeviceFamily) -> Result<Library, ZmdbError> {
    let property_map = PropertyMap::build(blob)?;
    let raw_tracks = scan::scan_tracks(blob, family);
    let groups = group_by_album(&raw_tracks);

    let mut library = Library::new();
    let mut artist_ids: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
    let mut next_artist_id: u32 = 1;

    for (metadata_pid, (tracks, ref_set)) in &groups {
        if family.is_pavo() && pavo_album_is_garbage(&property_map, *metadata_pid) {
            log::debug!("dropping garbage Pavo album pid 0x{metadata_pid:08x}");
            continue;
        }

        let strings = match find_album(blob, &property_map, *metadata_pid, ref_set, family) {
            Some(s) => s,
            None => {
                log::warn!("no album record found for pid 0x{metadata_pid:08x}, dropping {} track(s)", tracks.len());
                continue;
            }
        };

        let artist_id = *artist_ids.entry(strings.artist.clone()).or_insert_with(|| {
            let id = next_artist_id;
            next_artist_id += 1;
            id
        });
        library.artists.entry(artist_id).or_insert_with(|| Artist {
            name: strings.artist.clone(),
            filename: None,
            guid: None,
            atom_id: artist_id,
        });

        let album_id = *metadata_pid;
        library.albums.entry(album_id).or_insert_with(|| Album {
            title: strings.title.clone(),
            album_artist_name: strings.artist.clone(),
            album_artist_guid: None,
            alb_reference: strings.alb_reference.clone(),
            release_year: None,
            atom_id: album_id,
            album_property_id: make_pid(0x0600, pid_index(*metadata_pid)),
            artist_ref: artist_id,
        });

        for raw in tracks {
            let atom_id = raw.marker_offset as u32;
            library.tracks.insert(
                atom_id,
                Track {
                    title: raw.title.clone(),
                    track_artist_name: strings.artist.clone(),
                    track_artist_guid: None,
                    album_name: strings.title.clone(),
                    album_artist_name: strings.artist.clone(),
                    album_artist_guid: None,
                    genre: String::new(),
                    filename: raw.title.clone(),
                    track_number: raw.track_number,
                    disc_number: Track::normalize_disc_number(0),
                    duration_ms: 0,
                    file_size: 0,
                    album_ref: album_id,
                    atom_id,
                    play_count: 0,
                    skip_count: 0,
                    codec: Codec::from_tag(raw.codec_marker).unwrap_or(Codec::Mp3),
                    rating: Rating::Unrated,
                    last_played: None,
                },
            );
        }
    }

    Ok(library)
}

fn pavo_album_is_garbage(map: &PropertyMap, metadata_pid: u32) -> bool {
    let idx = pid_index(metadata_pid);
    let has_0800 = map.contains(make_pid(0x0800, idx));
    let has_0700 = map.contains(make_pid(0x0700, idx));
    let has_0100_next = map.contains(make_pid(0x0100, idx.wrapping_add(1)));
    let has_0500 = map.contains(make_pid(0x0500, idx));
    !(has_0800 || has_0700 || has_0100_next || has_0500)
}

/// The six-step album search: try each source in order, keep the first
/// success.
fn find_album(
    blob: &[u8],
    map: &PropertyMap,
    metadata_pid: u32,
    ref_set: &HashSet<u32>,
    family: DeviceFamily,
) -> Option<AlbumStrings> {
    let idx = pid_index(metadata_pid);

    // Step 1: 0x0800[idx] direct read.
    step_0800_direct(blob, map, idx, family)
        // Step 2: 0x0700[idx] — direct on Pavo, F-marker-constrained on classic.
        .or_else(|| step_0700(blob, map, idx, ref_set, family))
        // Step 3: Pavo branch / classic 0x0100 range search.
        .or_else(|| step_three(blob, map, idx, ref_set, family))
        // Step 4: classic only, 0x0600[idx] F-marker with matching.
        .or_else(|| step_0600_idx_fmarker(blob, map, idx, ref_set, family))
        // Step 5: 0x0600[idx+1] F-marker with matching.
        .or_else(|| fmarker_at_pid(blob, map, make_pid(0x0600, idx.wrapping_add(1)), ref_set, family))
        // Step 6: 0x0800[idx+1] F-marker with matching.
        .or_else(|| fmarker_at_pid(blob, map, make_pid(0x0800, idx.wrapping_add(1)), ref_set, family))
}

fn step_0800_direct(
    blob: &[u8],
    map: &PropertyMap,
    idx: u16,
    family: DeviceFamily,
) -> Option<AlbumStrings> {
    let p = map.get(make_pid(0x0800, idx))?;
    scan::direct_read(blob, p, family)
}

fn step_0700(
    blob: &[u8],
    map: &PropertyMap,
    idx: u16,
    ref_set: &HashSet<u32>,
    family: DeviceFamily,
) -> Option<AlbumStrings> {
    let p = map.get(make_pid(0x0700, idx))?;
    if family.is_pavo() {
        scan::direct_read(blob, p, family)
    } else {
        scan::f_marker_search(blob, p, ref_set, family)
    }
}

fn step_three(
    blob: &[u8],
    map: &PropertyMap,
    idx: u16,
    ref_set: &HashSet<u32>,
    family: DeviceFamily,
) -> Option<AlbumStrings> {
    if family.is_pavo() {
        let organizational = map.contains(make_pid(0x0500, idx));
        let (primary, fallback) = if organizational {
            (make_pid(0x0100, idx.wrapping_add(1)), make_pid(0x0600, idx))
        } else {
            (make_pid(0x0600, idx), make_pid(0x0100, idx.wrapping_add(1)))
        };
        direct_at_pid(blob, map, primary, family).or_else(|| direct_at_pid(blob, map, fallback, family))
    } else {
        // Search 0x0100[idx+1 ..= idx+99] for a ref-matching F-marker record,
        // then fall back to 0x0100[idx+1] unconstrained as a safety net.
        for offset in 1..=99u16 {
            let candidate_idx = idx.wrapping_add(offset);
            if let Some(found) = fmarker_at_pid(blob, map, make_pid(0x0100, candidate_idx), ref_set, family) {
                return Some(found);
            }
        }
        direct_at_pid(blob, map, make_pid(0x0100, idx.wrapping_add(1)), family)
    }
}

fn step_0600_idx_fmarker(
    blob: &[u8],
    map: &PropertyMap,
    idx: u16,
    ref_set: &HashSet<u32>,
    family: DeviceFamily,
) -> Option<AlbumStrings> {
    if family.is_pavo() {
        return None;
    }
    fmarker_at_pid(blob, map, make_pid(0x0600, idx), ref_set, family)
}

fn direct_at_pid(blob: &[u8], map: &PropertyMap, pid: u32, family: DeviceFamily) -> Option<AlbumStrings> {
    let p = map.get(pid)?;
    scan::direct_read(blob, p, family)
}

fn fmarker_at_pid(
    blob: &[u8],
    map: &PropertyMap,
    pid: u32,
    ref_set: &HashSet<u32>,
    family: DeviceFamily,
) -> Option<AlbumStrings> {
    let p = map.get(pid)?;
    scan::f_marker_search(blob, p, ref_set, family)
}
