use mtp_proto::{MtpSession, ObjectId, UploadStream};
use zcommon::guid::guid_to_mixed_endian_u128;
use zcommon::Result;

use crate::property_list::{encode_prop_list, PropValue};
use crate::props::{self, format};

const ROOT_PARENT: ObjectId = 0;
const PLAYLISTS_FOLDER: &str = "Playlists";

struct EmptyStream;

impl UploadStream for EmptyStream {
    fn total_size(&self) -> u64 {
        0
    }
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(0)
    }
}

fn ensure_playlists_folder(session: &mut dyn MtpSession, storage: u32) -> Result<ObjectId> {
    session.create_directory(PLAYLISTS_FOLDER, ROOT_PARENT, storage)
}

fn playlist_prop_list(name: &str, content_type_guid: &str) -> Result<Vec<u8>> {
    let content_type = guid_to_mixed_endian_u128(content_type_guid)?;
    Ok(encode_prop_list(&[
        (props::PROP_ZUNE_COLLECTION_ID, PropValue::U8(0)),
        (
            props::PROP_OBJECT_FILENAME,
            PropValue::Str(format!("{name}.pla")),
        ),
        (props::PROP_CONTENT_TYPE, PropValue::U128(content_type)),
        (props::PROP_NAME, PropValue::Str(name.to_string())),
    ]))
}

/// Creates a playlist object and links it to the ordered track-id array via
/// `SetObjectReferences`. `content_type_guid` is the 36-char GUID whose
/// mixed-endian-encoded bytes become the playlist's content-type UUID.
pub fn create_playlist(
    session: &mut dyn MtpSession,
    storage: u32,
    name: &str,
    content_type_guid: &str,
    track_ids: &[ObjectId],
) -> Result<ObjectId> {
    let folder = ensure_playlists_folder(session, storage)?;
    let prop_list = playlist_prop_list(name, content_type_guid)?;
    let playlist_id = session.send_object_prop_list(
        storage,
        folder,
        format::ABSTRACT_AV_PLAYLIST,
        0,
        &prop_list,
    )?;
    session.send_object(&mut EmptyStream)?;
    session.set_object_references(playlist_id, track_ids)?;
    Ok(playlist_id)
}

/// A pure `SetObjectReferences` replacement, never a merge with the
/// previous track list.
pub fn update_playlist(
    session: &mut dyn MtpSession,
    playlist_id: ObjectId,
    track_ids: &[ObjectId],
) -> Result<()> {
    session.set_object_references(playlist_id, track_ids)
}

pub fn delete_playlist(session: &mut dyn MtpSession, playlist_id: ObjectId) -> Result<()> {
    session.delete_object(playlist_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_prop_list_has_four_entries() {
        let bytes =
            playlist_prop_list("My Mix", "12345678-1234-1234-1234-123456789abc").unwrap();
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 4);
    }
}
