use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZuneError>;

/// The error taxonomy of the core. Every crate in the workspace maps its
/// failures onto one of these kinds so a host only ever has to match on this
/// enum, regardless of which subsystem raised it.
#[derive(Error, Debug)]
pub enum ZuneError {
    /// No MTP session is available. Surfaced to the caller.
    #[error("not connected to device")]
    NotConnected,

    /// A USB read or write failed. Surfaced; the caller is expected to
    /// disconnect and re-establish the session.
    #[error("usb transport failure: {0}")]
    TransportFailure(String),

    /// An MTP operation returned an unexpected status or malformed response.
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// Bad input rejected at the call boundary (malformed GUID, empty name,
    /// zero album id, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An object id did not resolve, or a name is unknown.
    #[error("not found: {0}")]
    NotFound(String),

    /// A transient failure in a non-critical path. Callers should log this as
    /// a warning and continue rather than abort the operation in progress.
    #[error("retryable failure: {0}")]
    Retryable(String),

    /// Device state has desynchronized after partial authoring. Surfaced to
    /// the caller; there is no automatic rollback.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl ZuneError {
    /// True for the [`ZuneError::Retryable`] variant, the only kind a caller
    /// is expected to swallow after logging rather than abort on.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ZuneError::Retryable(_))
    }
}
