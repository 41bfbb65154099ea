use std::net::SocketAddr;
use thiserror::Error;

/// Failures the bridge can surface. None of them is fatal to the host; each
/// is contained where it originates and only reported.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("malformed gesture datagram: {0}")]
    MalformedInput(String),

    #[error("environment temporarily unavailable: {0}")]
    TransientEnvironment(&'static str),

    #[error("failed to bind gesture endpoint {addr}: {source}")]
    BindFailure {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("{worker} worker did not exit within {timeout_ms} ms")]
    ShutdownTimeout {
        worker: &'static str,
        timeout_ms: u64,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::MalformedInput(err.to_string())
    }
}
