use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pulsar_transport::{
    CloseInfo, ConnectionState, Connector, Transport, TransportConfig, TransportError,
    TransportObserver, WsConnector,
};
use pulsar_wire::{Message, WireLayout, SERVER_ERROR, SERVER_MSG, SERVER_REQ};
use tracing::{debug, warn};

use crate::correlator::{Correlator, CorrelatorConfig};
use crate::error::Result;
use crate::observer::ClientObserver;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Own address, written as sender of every outbound message.
    pub identity: String,
    pub transport: TransportConfig,
    pub correlator: CorrelatorConfig,
    pub layout: WireLayout,
}

impl ClientConfig {
    pub fn new(identity: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            transport: TransportConfig::new(url),
            correlator: CorrelatorConfig::default(),
            layout: WireLayout::default(),
        }
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_correlator(mut self, correlator: CorrelatorConfig) -> Self {
        self.correlator = correlator;
        self
    }

    pub fn with_layout(mut self, layout: WireLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// Turns raw transport frames into messages and feeds answers to the
/// correlator before handing everything to the user observer.
struct Dispatcher {
    layout: WireLayout,
    correlator: Correlator,
    observer: Arc<dyn ClientObserver>,
}

impl TransportObserver for Dispatcher {
    fn on_open(&self) {
        self.observer.on_open();
    }

    fn on_close(&self, info: &CloseInfo) {
        self.observer.on_close(info);
    }

    fn on_error(&self, error: &TransportError) {
        self.observer.on_error(error);
    }

    fn on_message(&self, raw: String) {
        let message = match self.layout.decode(&raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, line = %raw, "dropping undecodable frame");
                return;
            }
        };

        match message.sender() {
            SERVER_MSG => {
                self.correlator.push_content(message.content());
            }
            SERVER_ERROR => {
                warn!(error = %message.content(), "server reported an error");
            }
            _ => {
                debug!(id = message.id(), sender = %message.sender(), "message received");
            }
        }
        self.observer.on_message(message);
    }
}

/// A Pulsar protocol client.
///
/// Owns one reconnecting transport. Messages are encoded with the
/// configured [`WireLayout`]; requests to `!server.req` are resolved by
/// matching `!server.msg` answers through the [`Correlator`].
pub struct Client {
    identity: String,
    layout: WireLayout,
    transport: Transport,
    correlator: Correlator,
}

impl Client {
    /// Create a client speaking WebSocket.
    pub fn new(config: ClientConfig, observer: Arc<dyn ClientObserver>) -> Self {
        Self::with_connector(config, Arc::new(WsConnector::new()), observer)
    }

    /// Create a client over an arbitrary connector.
    pub fn with_connector(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        observer: Arc<dyn ClientObserver>,
    ) -> Self {
        let ClientConfig {
            identity,
            transport,
            correlator,
            layout,
        } = config;
        let correlator = Correlator::new(correlator);
        let dispatcher = Arc::new(Dispatcher {
            layout,
            correlator: correlator.clone(),
            observer,
        });
        Self {
            identity,
            layout,
            transport: Transport::with_connector(transport, connector, dispatcher),
            correlator,
        }
    }

    /// Start connecting. Failures are reported through the observer and
    /// retried in the background.
    pub fn connect(&self) {
        self.transport.connect();
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Pending requests are not cancelled; they run into their timeout.
    pub fn disconnect(&self) {
        self.transport.disconnect();
    }

    /// Disconnect and wait until queued frames are flushed and the socket
    /// is closed.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }

    /// Send `content` to `receiver`, signed with the client identity.
    pub fn send(&self, content: impl Into<String>, receiver: impl Into<String>) -> Result<()> {
        let message = Message::outbound(content, receiver, self.identity.as_str(), unix_now());
        self.send_message(&message)
    }

    /// Encode and send a prepared message.
    pub fn send_message(&self, message: &Message) -> Result<()> {
        if let Err(e) = self.layout.check(message) {
            warn!(error = %e, "header does not fit the layout; line will not decode cleanly");
        }
        let line = self.layout.encode(message);
        self.transport.send(line)?;
        debug!(receiver = %message.receiver(), "message sent");
        Ok(())
    }

    /// Send a request to the server and wait up to `timeout` for its answer.
    pub async fn request_raw(&self, text: &str, timeout: Duration) -> Result<String> {
        self.send(text, SERVER_REQ)?;
        self.correlator.wait_for(text, timeout).await
    }

    /// [`Client::request_raw`] with the configured default timeout.
    pub async fn request(&self, text: &str) -> Result<String> {
        let timeout = self.correlator.config().default_timeout;
        self.request_raw(text, timeout).await
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn layout(&self) -> &WireLayout {
        &self.layout
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .field("correlator", &self.correlator)
            .finish_non_exhaustive()
    }
}

/// Current time in whole seconds since the Unix epoch.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
