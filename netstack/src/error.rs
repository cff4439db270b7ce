use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetstackError {
    #[error("usb transport failure: {0}")]
    Transport(String),
    #[error("malformed wire data: {0}")]
    Malformed(String),
    #[error("upstream proxy failure: {0}")]
    UpstreamFailure(String),
}

impl From<NetstackError> for zcommon::ZuneError {
    fn from(e: NetstackError) -> Self {
        match e {
            NetstackError::Transport(msg) => zcommon::ZuneError::TransportFailure(msg),
            NetstackError::Malformed(msg) => zcommon::ZuneError::ProtocolMismatch(msg),
            NetstackError::UpstreamFailure(msg) => zcommon::ZuneError::Retryable(msg),
        }
    }
}
