use std::time::Duration;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] pulsar_transport::TransportError),

    /// Wire line encoding/decoding error.
    #[error("wire error: {0}")]
    Wire(#[from] pulsar_wire::WireError),

    /// No matching answer arrived in time.
    #[error("request {request:?} timed out after {after:?}")]
    Timeout { request: String, after: Duration },

    /// The server answered with something the request helper cannot use.
    #[error("unexpected response to {request:?}: {response:?}")]
    UnexpectedResponse { request: String, response: String },
}

pub type Result<T> = std::result::Result<T, PeerError>;
