use thiserror::Error;

/// Failures specific to ZMDB blob parsing. These never escape bounds of the
/// input slice; a malformed property map or an unreadable album record is
/// reported, not panicked on.
#[derive(Error, Debug)]
pub enum ZmdbError {
    #[error("blob too small to contain a property map (need at least {min} bytes, got {got})")]
    BlobTooSmall { min: usize, got: usize },

    #[error("property map at 0x{offset:x} never reached its (0,0) terminator")]
    UnterminatedPropertyMap { offset: usize },
}

impl From<ZmdbError> for zcommon::ZuneError {
    fn from(e: ZmdbError) -> Self {
        zcommon::ZuneError::InvalidInput(e.to_string())
    }
}
