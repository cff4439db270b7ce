use std::collections::HashMap;

use mtp_proto::{MtpSession, ObjectId, PropertyCode};
use zcommon::Result;

use crate::props::PROP_NAME;

/// Maps `"<album_id>:<track_title>"` to a track's MTP object id. Populated
/// lazily, one album at a time, the first time a track under that album is
/// looked up.
#[derive(Default)]
pub struct TrackIdCache {
    entries: HashMap<String, ObjectId>,
    populated_albums: std::collections::HashSet<ObjectId>,
}

fn cache_key(album_id: ObjectId, track_title: &str) -> String {
    format!("{}:{}", album_id, track_title)
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

impl TrackIdCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.populated_albums.clear();
    }

    /// Records a track id directly, e.g. right after this sequencer just
    /// created it, so a subsequent lookup doesn't re-fetch from the device.
    pub fn insert(&mut self, album_id: ObjectId, track_title: &str, track_id: ObjectId) {
        self.entries.insert(cache_key(album_id, track_title), track_id);
    }

    /// Exact-match, case-sensitive lookup of a track's object id by title
    /// under the given album, populating the cache for the whole album on
    /// first miss.
    pub fn resolve(
        &mut self,
        session: &mut dyn MtpSession,
        album_id: ObjectId,
        track_title: &str,
    ) -> Result<Option<ObjectId>> {
        let key = cache_key(album_id, track_title);
        if let Some(&id) = self.entries.get(&key) {
            return Ok(Some(id));
        }
        if self.populated_albums.contains(&album_id) {
            return Ok(None);
        }

        let children = session.get_object_references(album_id)?;
        for child in children {
            let name: PropertyCode = PROP_NAME;
            let full_name = session.get_object_string_property(child, name)?;
            let title = strip_extension(&full_name);
            self.entries
                .insert(cache_key(album_id, title), child);
        }
        self.populated_albums.insert(album_id);

        Ok(self.entries.get(&key).copied())
    }
}
