use pulsar_transport::{CloseInfo, TransportError};
use pulsar_wire::Message;
use tokio::sync::mpsc;

/// Receives client lifecycle events and decoded messages.
///
/// Installed once at construction. Callbacks of one connection arrive in
/// frame order on the session task; implementations must not block.
pub trait ClientObserver: Send + Sync + 'static {
    fn on_open(&self) {}

    fn on_close(&self, _info: &CloseInfo) {}

    fn on_error(&self, _error: &TransportError) {}

    /// Every successfully decoded inbound message, answers included.
    fn on_message(&self, _message: Message) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ClientObserver for NoopObserver {}

/// A client event as delivered by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Open,
    Close(CloseInfo),
    Error(TransportError),
    Message(Message),
}

/// Observer forwarding every event into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: ClientEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl ClientObserver for ChannelObserver {
    fn on_open(&self) {
        self.forward(ClientEvent::Open);
    }

    fn on_close(&self, info: &CloseInfo) {
        self.forward(ClientEvent::Close(info.clone()));
    }

    fn on_error(&self, error: &TransportError) {
        self.forward(ClientEvent::Error(error.clone()));
    }

    fn on_message(&self, message: Message) {
        self.forward(ClientEvent::Message(message));
    }
}
