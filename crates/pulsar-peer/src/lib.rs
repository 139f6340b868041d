//! Pulsar client facade.
//!
//! Composes the wire codec and the reconnecting transport into one
//! connect/send/request surface, and turns fire-and-forget requests into
//! awaitable calls by correlating them with server answers.

pub mod answer;
pub mod client;
pub mod correlator;
pub mod error;
pub mod observer;
pub mod requests;

#[cfg(test)]
mod testing;

pub use answer::{parse_answer, Answer, FIELD_SEPARATOR, REQUEST_MARKER, RESPONSE_MARKER};
pub use client::{Client, ClientConfig};
pub use correlator::{
    Correlator, CorrelatorConfig, DEFAULT_MAX_RETAINED, DEFAULT_REQUEST_TIMEOUT,
};
pub use error::{PeerError, Result};
pub use observer::{ChannelObserver, ClientEvent, ClientObserver, NoopObserver};
pub use requests::{Profile, HISTORY_SEPARATOR, PROFILE_SEPARATOR};
