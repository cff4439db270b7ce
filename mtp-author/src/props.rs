//! Fixed property codes and ordering for the two property-list schemas the
//! authoring sequencer sends: the 13-property track list and the
//! 4-property playlist list.

pub type PropertyCode = u32;

pub const PROP_OBJECT_FILENAME: PropertyCode = 0xDC07;
pub const PROP_ZUNE_COLLECTION_ID: PropertyCode = 0xD901;
pub const PROP_META_GENRE: PropertyCode = 0xD902;
pub const PROP_ZUNE_0XDAB2: PropertyCode = 0xDAB2;
pub const PROP_ALBUM_NAME: PropertyCode = 0xD903;
pub const PROP_ALBUM_ARTIST: PropertyCode = 0xD904;
pub const PROP_DISC_NUMBER: PropertyCode = 0xD905;
pub const PROP_TRACK_NAME: PropertyCode = 0xDC44;
pub const PROP_DURATION: PropertyCode = 0xDE92;
pub const PROP_TRACK_NUMBER: PropertyCode = 0xD906;
pub const PROP_ARTIST: PropertyCode = 0xD907;
pub const PROP_GENRE: PropertyCode = 0xD908;
pub const PROP_DATE_AUTHORED: PropertyCode = 0xD909;

pub const PROP_CONTENT_TYPE: PropertyCode = 0xD90A;
pub const PROP_NAME: PropertyCode = 0xDC44;

pub const PROP_REPRESENTATIVE_SAMPLE_DATA: PropertyCode = 0xDC91;
pub const PROP_REPRESENTATIVE_SAMPLE_FORMAT: PropertyCode = 0xDC92;

/// `RepresentativeSampleFormat` value for JPEG cover art.
pub const SAMPLE_FORMAT_JPEG: u32 = 0x3801;

/// MTP object format codes used by the authoring sequencer.
pub mod format {
    pub const MP3: u16 = 0x3009;
    pub const WMA: u16 = 0xB901;
    pub const ABSTRACT_AUDIO_ALBUM: u16 = 0x3401;
    pub const ABSTRACT_AV_PLAYLIST: u16 = 0x3010;
    pub const ASSOCIATION: u16 = 0x3001;

    /// Audio-file-extension to MTP object format, used to pick the track
    /// container's format on upload.
    pub fn from_extension(filename: &str) -> u16 {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".wma") {
            WMA
        } else {
            MP3
        }
    }
}
