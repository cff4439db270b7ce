use log::error;
use mtp_proto::{MtpSession, ObjectId};
use zcommon::{guid::is_valid_guid, Result};

use crate::cache::TrackIdCache;
use crate::library_cache::LibraryCache;
use crate::props::PROP_ARTIST;
use crate::result::{BatchRetrofitCounts, RetrofitOutcome};

fn guid_is_present(guid: &Option<String>) -> bool {
    match guid {
        None => false,
        Some(g) => {
            is_valid_guid(g) && g.chars().any(|c| c != '0' && c != '-' && c != '{' && c != '}')
        }
    }
}

fn retarget_artist_ref(session: &mut dyn MtpSession, object_id: ObjectId, new_artist: ObjectId) -> Result<()> {
    session.set_object_property(object_id, PROP_ARTIST, &new_artist.to_le_bytes())
}

/// Re-points every album and track belonging to the existing artist named
/// `artist_name` onto a freshly created artist object carrying `guid`, then
/// deletes the old artist. A no-op (`AlreadyHadGuid`) if a valid non-null
/// GUID is already present; `NotFound` if no such artist exists.
pub fn retrofit_artist_guid(
    session: &mut dyn MtpSession,
    library: &mut LibraryCache,
    track_ids: &mut TrackIdCache,
    artist_name: &str,
    guid: &str,
) -> Result<RetrofitOutcome> {
    let Some(artist) = library.find_artist(session, artist_name)? else {
        return Ok(RetrofitOutcome::NotFound);
    };
    if guid_is_present(&artist.guid) {
        return Ok(RetrofitOutcome::AlreadyHadGuid);
    }

    let new_artist = session.create_directory(artist_name, 0, library.storage_id())?;
    session.set_object_property(new_artist, PROP_ARTIST, guid.as_bytes())?;

    let albums = session.get_object_references(artist.id).unwrap_or_default();
    for album_id in &albums {
        let tracks = session.get_object_references(*album_id).unwrap_or_default();
        for track_id in &tracks {
            retarget_artist_ref(session, *track_id, new_artist)?;
        }
        retarget_artist_ref(session, *album_id, new_artist)?;
    }

    session.delete_object(artist.id)?;

    library.invalidate();
    track_ids.invalidate();

    Ok(RetrofitOutcome::Retrofitted)
}

/// Retrofits a batch of `(name, guid)` pairs independently: one entry's
/// failure never aborts the rest. The library cache is invalidated once at
/// the end, only if at least one entry actually retrofitted.
pub fn retrofit_batch(
    session: &mut dyn MtpSession,
    library: &mut LibraryCache,
    track_ids: &mut TrackIdCache,
    entries: &[(String, String)],
) -> BatchRetrofitCounts {
    let mut counts = BatchRetrofitCounts::default();
    let mut any_retrofitted = false;

    for (name, guid) in entries {
        if !is_valid_guid(guid) {
            counts.record(RetrofitOutcome::Error);
            continue;
        }
        match retrofit_one(session, library, name, guid) {
            Ok(RetrofitOutcome::Retrofitted) => {
                any_retrofitted = true;
                counts.record(RetrofitOutcome::Retrofitted);
            }
            Ok(outcome) => counts.record(outcome),
            Err(e) => {
                error!("batch retrofit entry '{name}' failed: {e}");
                counts.record(RetrofitOutcome::Error);
            }
        }
    }

    if any_retrofitted {
        library.invalidate();
        track_ids.invalidate();
    }

    counts
}

/// Like [`retrofit_artist_guid`] but leaves cache invalidation to the caller
/// so a batch run invalidates once at the end rather than per entry.
fn retrofit_one(
    session: &mut dyn MtpSession,
    library: &mut LibraryCache,
    name: &str,
    guid: &str,
) -> Result<RetrofitOutcome> {
    let Some(artist) = library.find_artist(session, name)? else {
        return Ok(RetrofitOutcome::NotFound);
    };
    if guid_is_present(&artist.guid) {
        return Ok(RetrofitOutcome::AlreadyHadGuid);
    }

    let new_artist = session.create_directory(name, 0, library.storage_id())?;
    session.set_object_property(new_artist, PROP_ARTIST, guid.as_bytes())?;
    let albums = session.get_object_references(artist.id).unwrap_or_default();
    for album_id in &albums {
        let tracks = session.get_object_references(*album_id).unwrap_or_default();
        for track_id in &tracks {
            retarget_artist_ref(session, *track_id, new_artist)?;
        }
        retarget_artist_ref(session, *album_id, new_artist)?;
    }
    session.delete_object(artist.id)?;
    library.remove_artist(name);

    Ok(RetrofitOutcome::Retrofitted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_guid_is_not_present() {
        assert!(!guid_is_present(&Some(
            "00000000-0000-0000-0000-000000000000".to_string()
        )));
        assert!(!guid_is_present(&None));
        assert!(guid_is_present(&Some(
            "12345678-1234-1234-1234-123456789abc".to_string()
        )));
    }
}
