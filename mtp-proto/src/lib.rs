//! The MTP session contract the core is driven through: the synchronous
//! operation set, vendor opcodes, device family/color identification, the
//! ZMDB blob request helper, and the host callback traits. Nothing in this
//! crate talks to USB directly; a concrete transport lives above it and
//! implements [`session::MtpSession`] and [`session::BulkPipe`].

pub mod callbacks;
pub mod device_id;
pub mod persisted_state;
pub mod session;
pub mod zmdb_request;

pub use callbacks::{CacheStorageCallback, DeviceDiscoveredCallback, LogCallback, PathResolverCallback};
pub use device_id::{decode_device_property, DeviceColor, DeviceFamily, DeviceIdentity};
pub use session::{
    BulkPipe, MtpSession, ObjectId, ObjectInfo, PropertyCode, StorageId, UploadStream,
    DEVICE_PROP_SESSION_GUID,
};
pub use zmdb_request::{build_request_command, request_blob, WHOLE_LIBRARY_ID};
