use log::warn;
use mtp_proto::{MtpSession, ObjectId, UploadStream};
use zcommon::Result;

use crate::cache::TrackIdCache;
use crate::library_cache::LibraryCache;
use crate::property_list::{encode_prop_list, PropValue};
use crate::props::{self, format};
use crate::result::ZuneUploadResult;

pub struct TrackUploadRequest<'a> {
    pub artist: &'a str,
    pub artist_guid: Option<&'a str>,
    pub album: &'a str,
    pub album_artist: Option<&'a str>,
    pub year: u32,
    pub title: &'a str,
    pub genre: &'a str,
    pub filename: &'a str,
    pub track_number: u16,
    pub disc_number: u16,
    pub duration_ms: u32,
    pub cover_jpeg: Option<&'a [u8]>,
}

fn date_authored(year: u32) -> String {
    format!("{:04}0101T160000.0", year)
}

fn track_prop_list(req: &TrackUploadRequest) -> Vec<u8> {
    let album_artist = req.album_artist.unwrap_or(req.artist);
    encode_prop_list(&[
        (props::PROP_OBJECT_FILENAME, PropValue::Str(req.filename.to_string())),
        (props::PROP_ZUNE_COLLECTION_ID, PropValue::U8(0)),
        (props::PROP_META_GENRE, PropValue::U16(1)),
        (props::PROP_ZUNE_0XDAB2, PropValue::U8(0)),
        (props::PROP_ALBUM_NAME, PropValue::Str(req.album.to_string())),
        (props::PROP_ALBUM_ARTIST, PropValue::Str(album_artist.to_string())),
        (props::PROP_DISC_NUMBER, PropValue::U16(0)),
        (props::PROP_TRACK_NAME, PropValue::Str(req.title.to_string())),
        (props::PROP_DURATION, PropValue::U32(req.duration_ms)),
        (props::PROP_TRACK_NUMBER, PropValue::U16(req.track_number)),
        (props::PROP_ARTIST, PropValue::Str(req.artist.to_string())),
        (props::PROP_GENRE, PropValue::Str(req.genre.to_string())),
        (props::PROP_DATE_AUTHORED, PropValue::Str(date_authored(req.year))),
    ])
}

fn link_track_to_album(
    session: &mut dyn MtpSession,
    album_id: ObjectId,
    track_id: ObjectId,
) -> Result<()> {
    let mut refs = session.get_object_references(album_id).unwrap_or_default();
    if !refs.contains(&track_id) {
        refs.push(track_id);
    }
    session.set_object_references(album_id, &refs)
}

/// Drives the full upload-track sequence of the authoring sequencer: steps
/// 1-9 (container get-or-create, GUID validate, track entry, audio stream,
/// cover art, link, finalize).
pub fn upload_track(
    session: &mut dyn MtpSession,
    library: &mut LibraryCache,
    track_ids: &mut TrackIdCache,
    req: &TrackUploadRequest,
    audio: &mut dyn UploadStream,
) -> Result<ZuneUploadResult> {
    let artist = library.artist_or_create(session, req.artist, req.artist_guid)?;
    let album = library.album_or_create(session, artist.id, req.album, Some(req.year))?;

    if let Some(guid) = req.artist_guid {
        if let Err(e) = session.operation_922a(guid) {
            warn!("artist GUID validate trigger failed (non-fatal): {e}");
        }
    }

    let format = format::from_extension(req.filename);
    let prop_list = track_prop_list(req);
    let track_id = session.send_object_prop_list(
        library.storage_id(),
        album.id,
        format,
        audio.total_size(),
        &prop_list,
    )?;
    session.send_object(audio)?;

    if let Some(cover) = req.cover_jpeg {
        session.set_object_property(
            album.id,
            props::PROP_REPRESENTATIVE_SAMPLE_DATA,
            cover,
        )?;
        session.set_object_property(
            album.id,
            props::PROP_REPRESENTATIVE_SAMPLE_FORMAT,
            &props::SAMPLE_FORMAT_JPEG.to_le_bytes(),
        )?;
    }

    link_track_to_album(session, album.id, track_id)?;

    if let Err(e) = session.operation_9217(1) {
        warn!("post-upload sync trigger failed (non-fatal): {e}");
    }
    if let Err(e) = session.operation_9802(props::PROP_NAME, track_id) {
        warn!("post-upload property-query trigger failed (non-fatal): {e}");
    }

    track_ids.insert(album.id, req.title, track_id);

    Ok(ZuneUploadResult::success(track_id, album.id, artist.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_authored_pins_to_jan_first_at_1600() {
        assert_eq!(date_authored(1979), "19790101T160000.0");
    }

    #[test]
    fn wma_extension_selects_wma_format() {
        assert_eq!(format::from_extension("Song.wma"), format::WMA);
        assert_eq!(format::from_extension("Song.mp3"), format::MP3);
    }
}
