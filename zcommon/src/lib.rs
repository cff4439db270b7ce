//! Shared primitives used across the Zune wireless core: the bounded little-endian
//! byte codecs the blob parsers and wire formats rely on, the GUID and FILETIME
//! conversions the device's on-disk and wire formats use, and the error taxonomy
//! every other crate in the workspace maps its failures onto.

pub mod bytes;
pub mod error;
pub mod filetime;
pub mod guid;

pub use error::{Result, ZuneError};
