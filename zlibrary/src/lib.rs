//! The Track/Album/Artist/Playlist domain model.
//!
//! A [`Library`] is a relational snapshot: tracks, albums and artists refer
//! to each other only by [`AtomId`] (the device-assigned handle that doubles
//! as the MTP object id), never by owning pointer. It is always rebuilt from
//! scratch from a freshly fetched ZMDB blob or from the device's live object
//! tree — there is no incremental mutation.

use std::collections::HashMap;
use zcommon::error::{Result, ZuneError};
use zcommon::guid::is_valid_guid;

/// Device-assigned handle; serves as both the ZMDB record identity and the
/// MTP object handle once the object exists on-device.
pub type AtomId = u32;

/// Codec tag embedded in a track's metadata, also used by the ZMDB extractor
/// as the marker it scans for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Wma,
    Mp3,
}

impl Codec {
    pub const WMA_TAG: u16 = 0xB901;
    pub const MP3_TAG: u16 = 0x3009;

    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            Self::WMA_TAG => Some(Codec::Wma),
            Self::MP3_TAG => Some(Codec::Mp3),
            _ => None,
        }
    }

    pub fn tag(self) -> u16 {
        match self {
            Codec::Wma => Self::WMA_TAG,
            Codec::Mp3 => Self::MP3_TAG,
        }
    }
}

/// Tri-state track rating (0 = unrated, 2 = disliked, 8 = liked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rating {
    #[default]
    Unrated,
    Disliked,
    Liked,
}

impl Rating {
    pub fn from_wire(value: u8) -> Self {
        match value {
            2 => Rating::Disliked,
            8 => Rating::Liked,
            _ => Rating::Unrated,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Rating::Unrated => 0,
            Rating::Disliked => 2,
            Rating::Liked => 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub title: String,
    pub track_artist_name: String,
    pub track_artist_guid: Option<String>,
    pub album_name: String,
    pub album_artist_name: String,
    pub album_artist_guid: Option<String>,
    pub genre: String,
    pub filename: String,
    pub track_number: u8,
    /// 1-based; a wire value of 0 is normalized to 1 at construction time.
    pub disc_number: u8,
    pub duration_ms: u32,
    pub file_size: u64,
    pub album_ref: AtomId,
    pub atom_id: AtomId,
    pub play_count: u16,
    pub skip_count: u16,
    pub codec: Codec,
    pub rating: Rating,
    /// Windows FILETIME, 100ns ticks since 1601-01-01 UTC.
    pub last_played: Option<u64>,
}

impl Track {
    /// Normalize a raw on-device disc number: 0 means "disc 1".
    pub fn normalize_disc_number(raw: u8) -> u8 {
        if raw == 0 {
            1
        } else {
            raw
        }
    }
}

#[derive(Debug, Clone)]
pub struct Album {
    pub title: String,
    pub album_artist_name: String,
    pub album_artist_guid: Option<String>,
    /// Stringified `artist--album.alb` identifier used to match on-device
    /// artwork objects.
    pub alb_reference: String,
    pub release_year: Option<u32>,
    pub atom_id: AtomId,
    /// Packed as `0x0600 | index`.
    pub album_property_id: u32,
    pub artist_ref: AtomId,
}

#[derive(Debug, Clone)]
pub struct Artist {
    pub name: String,
    /// On-device `.art` artwork filename, if any.
    pub filename: Option<String>,
    pub guid: Option<String>,
    pub atom_id: AtomId,
}

#[derive(Debug, Clone)]
pub struct AlbumArtwork {
    pub alb_reference: String,
    pub artwork_object_id: AtomId,
}

#[derive(Debug, Clone)]
pub struct Playlist {
    pub name: String,
    pub filename: String,
    pub guid: Option<String>,
    pub folder_ref: AtomId,
    pub track_ids: Vec<AtomId>,
    pub atom_id: AtomId,
}

/// A relational snapshot of everything the device reports. See the module
/// docs for the ownership model.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub tracks: HashMap<AtomId, Track>,
    pub albums: HashMap<AtomId, Album>,
    pub artists: HashMap<AtomId, Artist>,
    pub artworks: Vec<AlbumArtwork>,
    pub playlists: HashMap<AtomId, Playlist>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artist_by_name(&self, name: &str) -> Option<&Artist> {
        self.artists.values().find(|a| a.name == name)
    }

    pub fn album_by_name(&self, artist_id: AtomId, album_name: &str) -> Option<&Album> {
        self.albums
            .values()
            .find(|a| a.artist_ref == artist_id && a.title == album_name)
    }

    pub fn albums_for_artist(&self, artist_id: AtomId) -> Vec<&Album> {
        let mut albums: Vec<&Album> = self
            .albums
            .values()
            .filter(|a| a.artist_ref == artist_id)
            .collect();
        albums.sort_by(|a, b| a.title.cmp(&b.title));
        albums
    }

    pub fn tracks_for_album(&self, album_id: AtomId) -> Vec<&Track> {
        let mut tracks: Vec<&Track> = self
            .tracks
            .values()
            .filter(|t| t.album_ref == album_id)
            .collect();
        tracks.sort_by_key(|t| (t.disc_number, t.track_number));
        tracks
    }

    pub fn artwork_for_alb_reference(&self, alb_reference: &str) -> Option<&AlbumArtwork> {
        self.artworks
            .iter()
            .find(|a| a.alb_reference == alb_reference)
    }

    /// Enforce the relational invariants of the model:
    /// - every track's album_ref resolves to an album whose artist_ref
    ///   resolves to an artist in the library;
    /// - track numbers are unique per disc within an album;
    /// - every present GUID matches the canonical hex pattern.
    pub fn validate(&self) -> Result<()> {
        for track in self.tracks.values() {
            let album = self.albums.get(&track.album_ref).ok_or_else(|| {
                ZuneError::InvalidInput(format!(
                    "track {:?} references missing album {}",
                    track.title, track.album_ref
                ))
            })?;
            if !self.artists.contains_key(&album.artist_ref) {
                return Err(ZuneError::InvalidInput(format!(
                    "album {:?} references missing artist {}",
                    album.title, album.artist_ref
                )));
            }
            if let Some(guid) = &track.track_artist_guid {
                if !is_valid_guid(guid) {
                    return Err(ZuneError::InvalidInput(format!("bad guid: {guid}")));
                }
            }
        }

        for album in self.albums.values() {
            if !self.artists.contains_key(&album.artist_ref) {
                return Err(ZuneError::InvalidInput(format!(
                    "album {:?} references missing artist {}",
                    album.title, album.artist_ref
                )));
            }
            let mut seen: HashMap<(u8, u8), ()> = HashMap::new();
            for track in self.tracks_for_album(album.atom_id) {
                let key = (track.disc_number, track.track_number);
                if seen.insert(key, ()).is_some() {
                    return Err(ZuneError::InvalidInput(format!(
                        "duplicate track number {} on disc {} in album {:?}",
                        track.track_number, track.disc_number, album.title
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track(atom_id: AtomId, album_ref: AtomId, num: u8, disc: u8) -> Track {
        Track {
            title: "Hello.mp3".into(),
            track_artist_name: "Some Artist".into(),
            track_artist_guid: None,
            album_name: "Debut Album".into(),
            album_artist_name: "Some Artist".into(),
            album_artist_guid: None,
            genre: "Rock".into(),
            filename: "Hello.mp3".into(),
            track_number: num,
            disc_number: disc,
            duration_ms: 1000,
            file_size: 1024,
            album_ref,
            atom_id,
            play_count: 0,
            skip_count: 0,
            codec: Codec::Mp3,
            rating: Rating::Unrated,
            last_played: None,
        }
    }

    #[test]
    fn validate_accepts_well_formed_library() {
        let mut lib = Library::new();
        lib.artists.insert(
            1,
            Artist {
                name: "Some Artist".into(),
                filename: None,
                guid: None,
                atom_id: 1,
            },
        );
        lib.albums.insert(
            10,
            Album {
                title: "Debut Album".into(),
                album_artist_name: "Some Artist".into(),
                album_artist_guid: None,
                alb_reference: "Some Artist--Debut Album.alb".into(),
                release_year: None,
                atom_id: 10,
                album_property_id: 0x0600005A,
                artist_ref: 1,
            },
        );
        lib.tracks.insert(100, sample_track(100, 10, 1, 1));
        assert!(lib.validate().is_ok());
    }

    #[test]
    fn validate_rejects_dangling_album_ref() {
        let mut lib = Library::new();
        lib.tracks.insert(100, sample_track(100, 999, 1, 1));
        assert!(lib.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_track_numbers_per_disc() {
        let mut lib = Library::new();
        lib.artists.insert(
            1,
            Artist {
                name: "A".into(),
                filename: None,
                guid: None,
                atom_id: 1,
            },
        );
        lib.albums.insert(
            10,
            Album {
                title: "Al".into(),
                album_artist_name: "A".into(),
                album_artist_guid: None,
                alb_reference: "A--Al.alb".into(),
                release_year: None,
                atom_id: 10,
                album_property_id: 0x0600_0000,
                artist_ref: 1,
            },
        );
        lib.tracks.insert(100, sample_track(100, 10, 1, 1));
        lib.tracks.insert(101, sample_track(101, 10, 1, 1));
        assert!(lib.validate().is_err());
    }

    #[test]
    fn disc_number_normalizes_zero_to_one() {
        assert_eq!(Track::normalize_disc_number(0), 1);
        assert_eq!(Track::normalize_disc_number(2), 2);
    }

    #[test]
    fn rating_wire_round_trip() {
        assert_eq!(Rating::from_wire(8), Rating::Liked);
        assert_eq!(Rating::from_wire(2), Rating::Disliked);
        assert_eq!(Rating::from_wire(5), Rating::Unrated);
        assert_eq!(Rating::Liked.to_wire(), 8);
    }
}
