/// Errors that can occur in transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Failed to establish a connection to the endpoint.
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The transport is not in the open state.
    #[error("transport is not open")]
    NotConnected,

    /// Writing a frame to the socket failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Reading from the socket failed.
    #[error("receive failed: {0}")]
    Receive(String),

    /// The remote side is gone.
    #[error("connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
