use mtp_proto::ObjectId;

/// Crosses the host boundary as a plain value, not a structured error: the
/// log callback carries the human-readable detail, this carries outcome and
/// the created ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZuneUploadResult {
    pub status: i32,
    pub track_object_id: ObjectId,
    pub album_object_id: ObjectId,
    pub artist_object_id: ObjectId,
}

impl ZuneUploadResult {
    pub fn success(track: ObjectId, album: ObjectId, artist: ObjectId) -> Self {
        Self {
            status: 0,
            track_object_id: track,
            album_object_id: album,
            artist_object_id: artist,
        }
    }

    pub fn failure(status: i32) -> Self {
        Self {
            status,
            track_object_id: 0,
            album_object_id: 0,
            artist_object_id: 0,
        }
    }
}

/// Outcome of one entry in a batch GUID retrofit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrofitOutcome {
    Retrofitted,
    AlreadyHadGuid,
    NotFound,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchRetrofitCounts {
    pub retrofitted: u32,
    pub already_had_guid: u32,
    pub not_found: u32,
    pub errors: u32,
}

impl BatchRetrofitCounts {
    pub fn record(&mut self, outcome: RetrofitOutcome) {
        match outcome {
            RetrofitOutcome::Retrofitted => self.retrofitted += 1,
            RetrofitOutcome::AlreadyHadGuid => self.already_had_guid += 1,
            RetrofitOutcome::NotFound => self.not_found += 1,
            RetrofitOutcome::Error => self.errors += 1,
        }
    }
}
