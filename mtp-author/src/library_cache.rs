use std::collections::HashMap;

use mtp_proto::{MtpSession, ObjectId, StorageId};
use zcommon::{Result, ZuneError};

use crate::props::{format, PROP_NAME};

const ROOT_PARENT: ObjectId = 0;

#[derive(Debug, Clone)]
pub struct ArtistContainer {
    pub id: ObjectId,
    pub guid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AlbumContainer {
    pub id: ObjectId,
    pub artist_id: ObjectId,
}

/// Lazily-initialized view of the device's existing artist/album folder
/// containers, analogous to the teacher's repository manager reading
/// `repo.toml` once and serving get-or-create calls from memory afterward.
#[derive(Default)]
pub struct LibraryCache {
    initialized: bool,
    storage: StorageId,
    music_folder: Option<ObjectId>,
    artists: HashMap<String, ArtistContainer>,
    albums: HashMap<(ObjectId, String), AlbumContainer>,
}

impl LibraryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.initialized = false;
        self.music_folder = None;
        self.artists.clear();
        self.albums.clear();
    }

    /// Fetches the device's existing album objects once, deriving artist
    /// containers from each album's `"<artist>--<album>"` name. Does not
    /// create anything; only populates the in-memory view.
    fn ensure_initialized(&mut self, session: &mut dyn MtpSession) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;

        let storages = session.get_storage_ids()?;
        self.storage = *storages
            .first()
            .ok_or_else(|| ZuneError::NotFound("no storage reported by device".into()))?;

        let albums = session.get_object_handles(self.storage, format::ABSTRACT_AUDIO_ALBUM, ROOT_PARENT)?;
        for album_id in albums {
            let name = session.get_object_string_property(album_id, PROP_NAME)?;
            let Some((artist, album)) = name.split_once("--") else {
                continue;
            };
            let artist_id = match self.artists.get(artist) {
                Some(a) => a.id,
                None => {
                    let info = session.get_object_info(album_id)?;
                    self.artists.insert(
                        artist.to_string(),
                        ArtistContainer {
                            id: info.parent,
                            guid: None,
                        },
                    );
                    info.parent
                }
            };
            self.albums.insert(
                (artist_id, album.to_string()),
                AlbumContainer {
                    id: album_id,
                    artist_id,
                },
            );
        }

        Ok(())
    }

    pub fn ensure_music_folder(&mut self, session: &mut dyn MtpSession) -> Result<ObjectId> {
        self.ensure_initialized(session)?;
        if let Some(id) = self.music_folder {
            return Ok(id);
        }
        let id = session.create_directory("Music", ROOT_PARENT, self.storage)?;
        self.music_folder = Some(id);
        Ok(id)
    }

    /// Get-or-create an artist container. Updates the stored GUID in place
    /// (without a full retrofit) if the artist exists without one and one
    /// is now supplied.
    pub fn artist_or_create(
        &mut self,
        session: &mut dyn MtpSession,
        name: &str,
        guid: Option<&str>,
    ) -> Result<ArtistContainer> {
        self.ensure_initialized(session)?;
        if let Some(existing) = self.artists.get(name).cloned() {
            if existing.guid.is_none() {
                if let Some(g) = guid {
                    let container = ArtistContainer {
                        id: existing.id,
                        guid: Some(g.to_string()),
                    };
                    self.artists.insert(name.to_string(), container.clone());
                    return Ok(container);
                }
            }
            return Ok(existing);
        }

        let folder = self.ensure_music_folder(session)?;
        let id = session.create_directory(name, folder, self.storage)?;
        let container = ArtistContainer {
            id,
            guid: guid.map(|s| s.to_string()),
        };
        self.artists.insert(name.to_string(), container.clone());
        Ok(container)
    }

    pub fn album_or_create(
        &mut self,
        session: &mut dyn MtpSession,
        artist_id: ObjectId,
        album_name: &str,
        _year: Option<u32>,
    ) -> Result<AlbumContainer> {
        self.ensure_initialized(session)?;
        let key = (artist_id, album_name.to_string());
        if let Some(existing) = self.albums.get(&key).cloned() {
            return Ok(existing);
        }
        let id = session.create_directory(album_name, artist_id, self.storage)?;
        let container = AlbumContainer { id, artist_id };
        self.albums.insert(key, container.clone());
        Ok(container)
    }

    pub fn storage_id(&self) -> StorageId {
        self.storage
    }

    pub fn artist_by_id(&self, artist_id: ObjectId) -> Option<&ArtistContainer> {
        self.artists.values().find(|a| a.id == artist_id)
    }

    /// Lookup-only: does not create a container if the artist is unknown.
    pub fn find_artist(
        &mut self,
        session: &mut dyn MtpSession,
        name: &str,
    ) -> Result<Option<ArtistContainer>> {
        self.ensure_initialized(session)?;
        Ok(self.artists.get(name).cloned())
    }

    pub fn remove_artist(&mut self, name: &str) {
        self.artists.remove(name);
    }
}
