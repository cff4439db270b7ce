//! Decodes a ZMDB metadata blob — a property map followed by loosely
//! structured record regions — into a [`zlibrary::Library`].
//!
//! The extractor is stateless and deterministic: the same bytes and device
//! family always yield the same library, and it never reads past the end of
//! the slice it was handed.

pub mod error;
pub mod extractor;
pub mod family;
pub mod property_map;
pub mod scan;

pub use error::ZmdbError;
pub use extractor::extract;
pub use family::DeviceFamily;
