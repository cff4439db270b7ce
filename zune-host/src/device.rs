//! The platform USB/MTP transport is an external collaborator: this crate
//! consumes [`MtpSession`] and [`BulkPipe`] (see mtp-proto) but does not
//! implement libusb plumbing. A real deployment links a platform-specific
//! crate that provides [`connect`]; this build has none wired in.

use anyhow::{anyhow, Result};
use mtp_proto::MtpSession;

pub fn connect() -> Result<Box<dyn MtpSession>> {
    Err(anyhow!(
        "no platform USB/MTP transport is linked into this build; \
         provide one via a platform crate implementing mtp_proto::MtpSession"
    ))
}
