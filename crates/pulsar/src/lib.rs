//! Client for the Pulsar fixed-width messaging protocol.
//!
//! # Crate Structure
//!
//! - [`wire`]: Fixed-width line codec and address conventions
//! - [`transport`]: Reconnecting WebSocket transport with backoff
//! - [`peer`]: Client facade and request/response correlation (behind `peer` feature)

/// Re-export wire codec types.
pub mod wire {
    pub use pulsar_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use pulsar_transport::*;
}

/// Re-export client types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use pulsar_peer::*;
}
