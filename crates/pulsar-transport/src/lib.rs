//! Reconnecting socket transport for the Pulsar protocol.
//!
//! Owns at most one live connection to a configured endpoint:
//! - WebSocket connections via tokio-tungstenite
//! - In-process connections for tests and simulations
//!
//! Unexpected closes are retried forever with capped exponential backoff
//! until [`Transport::disconnect`] is called. Lifecycle events are reported
//! through a [`TransportObserver`].

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;
pub mod transport;
pub mod ws;

pub use config::{backoff_delay, TransportConfig};
pub use error::{Result, TransportError};
pub use memory::{MemoryConnection, MemoryConnector, MemoryServer};
pub use traits::{
    CloseInfo, Connector, FrameSink, FrameSource, Inbound, Socket, TransportObserver,
};
pub use transport::{ConnectionState, Transport};
pub use ws::WsConnector;
