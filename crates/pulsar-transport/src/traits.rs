use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::error::{Result, TransportError};

/// Close status reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket-style close code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
    /// False when the connection dropped without a close handshake.
    pub clean: bool,
}

impl CloseInfo {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;
    /// Close frame carried no status code.
    pub const NO_STATUS: u16 = 1005;
    /// Connection lost without a close frame.
    pub const ABNORMAL: u16 = 1006;

    /// A clean close with code 1000.
    pub fn normal(reason: impl Into<String>) -> Self {
        Self {
            code: Self::NORMAL,
            reason: reason.into(),
            clean: true,
        }
    }

    /// A dropped connection (code 1006).
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: Self::ABNORMAL,
            reason: reason.into(),
            clean: false,
        }
    }
}

/// One event read from a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A data frame (text or binary payload bytes).
    Frame(Bytes),
    /// The connection is closed; no further frames follow.
    Closed(CloseInfo),
}

/// Write half of a connected socket.
pub trait FrameSink: Send {
    /// Send one text frame.
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<()>>;

    /// Start a graceful close.
    fn close(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Read half of a connected socket.
pub trait FrameSource: Send {
    /// Wait for the next frame or the close.
    ///
    /// Must be cancel-safe: dropping the future before completion loses
    /// no frame.
    fn recv(&mut self) -> BoxFuture<'_, Result<Inbound>>;
}

/// A connected socket split into its two halves.
pub struct Socket {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket").finish_non_exhaustive()
    }
}

/// Opens sockets to an endpoint.
///
/// The transport owns reconnection; a connector only performs one attempt.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Socket>>;

    /// Connector name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Receives transport lifecycle events.
///
/// Events of one connection are delivered sequentially, in the order the
/// frames arrived. Implementations must not block.
pub trait TransportObserver: Send + Sync + 'static {
    fn on_open(&self) {}

    fn on_close(&self, _info: &CloseInfo) {}

    fn on_error(&self, _error: &TransportError) {}

    /// A frame arrived, already decoded as text.
    fn on_message(&self, _raw: String) {}
}
