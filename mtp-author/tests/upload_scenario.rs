//! Drives `upload_track` with literal inputs and asserts the operation order
//! a real device sync observes, end to end.

use std::collections::HashMap;

use mtp_author::{upload_track, LibraryCache, TrackIdCache, TrackUploadRequest};
use mtp_proto::{MtpSession, ObjectId, ObjectInfo, PropertyCode, StorageId, UploadStream};
use zcommon::Result;

struct SilentAudio {
    total_size: u64,
}

impl UploadStream for SilentAudio {
    fn total_size(&self) -> u64 {
        self.total_size
    }

    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(0)
    }
}

/// Records every call in order instead of talking to a real device, and
/// hands out monotonically increasing object ids so the test can assert
/// non-zero results without caring about their exact values.
#[derive(Default)]
struct RecordingSession {
    calls: Vec<String>,
    next_id: ObjectId,
    object_names: HashMap<ObjectId, String>,
    object_refs: HashMap<ObjectId, Vec<ObjectId>>,
}

impl RecordingSession {
    fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    fn fresh_id(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl MtpSession for RecordingSession {
    fn get_storage_ids(&mut self) -> Result<Vec<StorageId>> {
        self.calls.push("get_storage_ids".into());
        Ok(vec![1])
    }

    fn get_object_handles(&mut self, _storage: StorageId, _format: u16, _parent: ObjectId) -> Result<Vec<ObjectId>> {
        self.calls.push("get_object_handles(root)".into());
        Ok(vec![])
    }

    fn get_object_info(&mut self, id: ObjectId) -> Result<ObjectInfo> {
        self.calls.push(format!("get_object_info({id})"));
        Ok(ObjectInfo {
            filename: String::new(),
            format: 0,
            compressed_size: 0,
            parent: 0,
        })
    }

    fn get_object_property(&mut self, _id: ObjectId, _prop: PropertyCode) -> Result<Vec<u8>> {
        Ok(vec![])
    }

    fn get_object_integer_property(&mut self, _id: ObjectId, _prop: PropertyCode) -> Result<u64> {
        Ok(0)
    }

    fn get_object_string_property(&mut self, id: ObjectId, _prop: PropertyCode) -> Result<String> {
        Ok(self.object_names.get(&id).cloned().unwrap_or_default())
    }

    fn get_object_property_list(
        &mut self,
        id: ObjectId,
        _format: u16,
        _prop: PropertyCode,
        _depth: i32,
        _group: u32,
    ) -> Result<Vec<u8>> {
        self.calls.push(format!("get_object_property_list({id})"));
        Ok(vec![])
    }

    fn set_object_property(&mut self, id: ObjectId, prop: PropertyCode, value: &[u8]) -> Result<()> {
        self.calls.push(format!("set_object_property({id}, {prop:#06x}, {} bytes)", value.len()));
        Ok(())
    }

    fn set_object_property_as_array(&mut self, _id: ObjectId, _prop: PropertyCode, _values: &[Vec<u8>]) -> Result<()> {
        Ok(())
    }

    fn send_object_prop_list(
        &mut self,
        _storage: StorageId,
        parent: ObjectId,
        format: u16,
        size: u64,
        _prop_list: &[u8],
    ) -> Result<ObjectId> {
        let id = self.fresh_id();
        self.calls.push(format!("send_object_prop_list(parent={parent}, format={format:#06x}, size={size}) -> {id}"));
        Ok(id)
    }

    fn send_object(&mut self, stream: &mut dyn UploadStream) -> Result<()> {
        self.calls.push(format!("send_object({} bytes)", stream.total_size()));
        Ok(())
    }

    fn create_directory(&mut self, name: &str, parent: ObjectId, _storage: StorageId) -> Result<ObjectId> {
        let id = self.fresh_id();
        self.calls.push(format!("create_directory({name:?}, parent={parent}) -> {id}"));
        self.object_names.insert(id, name.to_string());
        Ok(id)
    }

    fn delete_object(&mut self, _id: ObjectId) -> Result<()> {
        Ok(())
    }

    fn set_object_references(&mut self, id: ObjectId, refs: &[ObjectId]) -> Result<()> {
        self.calls.push(format!("set_object_references({id}, {refs:?})"));
        self.object_refs.insert(id, refs.to_vec());
        Ok(())
    }

    fn get_object_references(&mut self, id: ObjectId) -> Result<Vec<ObjectId>> {
        Ok(self.object_refs.get(&id).cloned().unwrap_or_default())
    }

    fn get_device_property(&mut self, _code: PropertyCode) -> Result<Vec<u8>> {
        Ok(vec![])
    }

    fn set_device_property(&mut self, _code: PropertyCode, _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn get_device_property_desc(&mut self, _code: PropertyCode) -> Result<Vec<u8>> {
        Ok(vec![])
    }

    fn get_partial_object(&mut self, _id: ObjectId, _offset: u64, _size: u32) -> Result<Vec<u8>> {
        Ok(vec![])
    }

    fn operation_9215(&mut self) -> Result<()> {
        self.calls.push("operation_9215".into());
        Ok(())
    }

    fn operation_9217(&mut self, param: u32) -> Result<()> {
        self.calls.push(format!("operation_9217({param})"));
        Ok(())
    }

    fn operation_9218(&mut self, _a: u32, _b: u32, _c: u32) -> Result<()> {
        Ok(())
    }

    fn operation_9224(&mut self) -> Result<()> {
        Ok(())
    }

    fn operation_9227_init(&mut self) -> Result<()> {
        Ok(())
    }

    fn operation_9230(&mut self, _param: u32) -> Result<()> {
        Ok(())
    }

    fn operation_922a(&mut self, value: &str) -> Result<()> {
        self.calls.push(format!("operation_922a({value})"));
        Ok(())
    }

    fn operation_922b(&mut self, a: u32, b: u32, c: u32) -> Result<()> {
        self.calls.push(format!("operation_922b({a},{b},{c})"));
        Ok(())
    }

    fn operation_922c(&mut self, _a: u32, _b: u32) -> Result<()> {
        Ok(())
    }

    fn operation_922d(&mut self) -> Result<()> {
        Ok(())
    }

    fn operation_922f(&mut self) -> Result<()> {
        Ok(())
    }

    fn operation_9802(&mut self, prop: PropertyCode, id: ObjectId) -> Result<()> {
        self.calls.push(format!("operation_9802({prop:#06x}, {id})"));
        Ok(())
    }

    fn get_bulk_pipe(&mut self) -> Result<Box<dyn mtp_proto::BulkPipe>> {
        unimplemented!("network mode is not exercised by this flow")
    }
}

#[test]
fn unknown_pleasures_track_upload_follows_the_observed_operation_order() {
    let mut session = RecordingSession::new();
    let mut library = LibraryCache::new();
    let mut track_ids = TrackIdCache::new();
    let mut audio = SilentAudio { total_size: 6_423_552 };

    let request = TrackUploadRequest {
        artist: "Unknown Pleasures",
        artist_guid: None,
        album: "Unknown Pleasures",
        album_artist: None,
        year: 1979,
        title: "She's Lost Control",
        genre: "Post-Punk",
        filename: "07 She's Lost Control.mp3",
        track_number: 7,
        disc_number: 1,
        duration_ms: 231_000,
        cover_jpeg: Some(&[0xFFu8; 48_312]),
    };

    let result = upload_track(&mut session, &mut library, &mut track_ids, &request, &mut audio).unwrap();

    assert_eq!(result.status, 0);
    assert_ne!(result.track_object_id, 0);
    assert_ne!(result.album_object_id, 0);
    assert_ne!(result.artist_object_id, 0);
    assert_ne!(result.track_object_id, result.album_object_id);
    assert_ne!(result.album_object_id, result.artist_object_id);

    // Container discovery, then Music/artist/album directories, in order.
    assert_eq!(session.calls[0], "get_storage_ids");
    assert_eq!(session.calls[1], "get_object_handles(root)");
    assert_eq!(session.calls[2], "create_directory(\"Music\", parent=0) -> 1");
    assert_eq!(session.calls[3], "create_directory(\"Unknown Pleasures\", parent=1) -> 2");
    assert_eq!(session.calls[4], "create_directory(\"Unknown Pleasures\", parent=2) -> 3");

    // Track property list then the audio data phase, against the album folder.
    assert_eq!(
        session.calls[5],
        "send_object_prop_list(parent=3, format=0x3009, size=6423552) -> 4"
    );
    assert_eq!(session.calls[6], "send_object(6423552 bytes)");

    // Cover art on the album, in RepresentativeSampleData-then-Format order.
    assert_eq!(session.calls[7], "set_object_property(3, 0xdc91, 48312 bytes)");
    assert_eq!(session.calls[8], "set_object_property(3, 0xdc92, 4 bytes)");

    // Link the track to the album, then the two finalize triggers.
    assert_eq!(session.calls[9], "set_object_references(3, [4])");
    assert_eq!(session.calls[10], "operation_9217(1)");
    assert_eq!(session.calls[11], "operation_9802(0xdc44, 4)");
    assert_eq!(session.calls.len(), 12);

    // The track-id cache is primed without another round-trip to the device.
    let resolved = track_ids
        .resolve(&mut session, result.album_object_id, "She's Lost Control")
        .unwrap();
    assert_eq!(resolved, Some(result.track_object_id));
    assert_eq!(session.calls.len(), 12, "cache hit must not touch the session again");
}
