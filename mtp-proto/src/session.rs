use zcommon::Result;

pub type ObjectId = u32;
pub type StorageId = u32;
pub type PropertyCode = u32;

/// Device-level property holding the session GUID the device hands back
/// once wireless pairing succeeds (read via [`MtpSession::get_device_property`]
/// after the pairing exchange, raw UTF-16LE bytes).
pub const DEVICE_PROP_SESSION_GUID: PropertyCode = 0xD90C;

#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub filename: String,
    pub format: u16,
    pub compressed_size: u64,
    pub parent: ObjectId,
}

/// A lazily-read input stream for [`MtpSession::send_object`]: the session
/// needs the total size up front (it goes in the MTP data-phase header)
/// without requiring the whole payload to be buffered in memory.
pub trait UploadStream {
    fn total_size(&self) -> u64;
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// A raw bulk pipe used once network mode is enabled, for PPP traffic that
/// bypasses ordinary MTP framing entirely.
pub trait BulkPipe: Send {
    fn read(&mut self, timeout: std::time::Duration) -> Result<Vec<u8>>;
    fn write(&mut self, data: &[u8], timeout: std::time::Duration) -> Result<()>;
}

/// The MTP operations the authoring sequencer and ZMDB fetch are driven
/// through. Every operation is synchronous and takes a session-scoped
/// transaction id internally — callers never see one. Raw USB framing and
/// the MTPZ handshake are the caller's responsibility; a session here is
/// already connected and authenticated.
pub trait MtpSession {
    fn get_storage_ids(&mut self) -> Result<Vec<StorageId>>;
    fn get_object_handles(
        &mut self,
        storage: StorageId,
        format: u16,
        parent: ObjectId,
    ) -> Result<Vec<ObjectId>>;
    fn get_object_info(&mut self, id: ObjectId) -> Result<ObjectInfo>;

    fn get_object_property(&mut self, id: ObjectId, prop: PropertyCode) -> Result<Vec<u8>>;
    fn get_object_integer_property(&mut self, id: ObjectId, prop: PropertyCode) -> Result<u64>;
    fn get_object_string_property(&mut self, id: ObjectId, prop: PropertyCode) -> Result<String>;
    fn get_object_property_list(
        &mut self,
        id: ObjectId,
        format: u16,
        prop: PropertyCode,
        depth: i32,
        group: u32,
    ) -> Result<Vec<u8>>;
    fn set_object_property(&mut self, id: ObjectId, prop: PropertyCode, value: &[u8]) -> Result<()>;
    fn set_object_property_as_array(
        &mut self,
        id: ObjectId,
        prop: PropertyCode,
        values: &[Vec<u8>],
    ) -> Result<()>;

    fn send_object_prop_list(
        &mut self,
        storage: StorageId,
        parent: ObjectId,
        format: u16,
        size: u64,
        prop_list: &[u8],
    ) -> Result<ObjectId>;
    /// Must immediately follow [`MtpSession::send_object_prop_list`]; this is
    /// a second, separate MTP transaction carrying the object's bytes.
    fn send_object(&mut self, stream: &mut dyn UploadStream) -> Result<()>;

    fn create_directory(
        &mut self,
        name: &str,
        parent: ObjectId,
        storage: StorageId,
    ) -> Result<ObjectId>;
    fn delete_object(&mut self, id: ObjectId) -> Result<()>;
    fn set_object_references(&mut self, id: ObjectId, refs: &[ObjectId]) -> Result<()>;
    fn get_object_references(&mut self, id: ObjectId) -> Result<Vec<ObjectId>>;

    fn get_device_property(&mut self, code: PropertyCode) -> Result<Vec<u8>>;
    fn set_device_property(&mut self, code: PropertyCode, value: &[u8]) -> Result<()>;
    fn get_device_property_desc(&mut self, code: PropertyCode) -> Result<Vec<u8>>;

    fn get_partial_object(&mut self, id: ObjectId, offset: u64, size: u32) -> Result<Vec<u8>>;

    fn operation_9215(&mut self) -> Result<()>;
    fn operation_9217(&mut self, param: u32) -> Result<()>;
    fn operation_9218(&mut self, a: u32, b: u32, c: u32) -> Result<()>;
    fn operation_9224(&mut self) -> Result<()>;
    fn operation_9227_init(&mut self) -> Result<()>;
    fn operation_9230(&mut self, param: u32) -> Result<()>;
    fn operation_922a(&mut self, value: &str) -> Result<()>;
    fn operation_922b(&mut self, a: u32, b: u32, c: u32) -> Result<()>;
    fn operation_922c(&mut self, a: u32, b: u32) -> Result<()>;
    fn operation_922d(&mut self) -> Result<()>;
    fn operation_922f(&mut self) -> Result<()>;
    fn operation_9802(&mut self, prop: PropertyCode, id: ObjectId) -> Result<()>;

    /// Raw PPP traffic flows over this once network mode is active. Boxed
    /// because the concrete bulk-pipe type is owned by the USB transport,
    /// outside this crate's concern.
    fn get_bulk_pipe(&mut self) -> Result<Box<dyn BulkPipe>>;
}
