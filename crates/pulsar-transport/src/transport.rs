use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::traits::{CloseInfo, Connector, Inbound, Socket, TransportObserver};
use crate::ws::WsConnector;

/// Connection state of a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket and no reconnect pending.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The socket is open; `send` is allowed.
    Open,
    /// The socket dropped; the next attempt fires after `delay`.
    ReconnectScheduled { attempt: u32, delay: Duration },
}

struct State {
    phase: ConnectionState,
    should_reconnect: bool,
    attempts: u32,
    /// Bumped by every `connect`/`disconnect`; sessions with an older
    /// generation may not touch the state.
    generation: u64,
    /// The observer has seen `on_open` for the current socket.
    open_reported: bool,
    outbound: Option<mpsc::UnboundedSender<String>>,
    cancel: Option<CancellationToken>,
    session: Option<JoinHandle<()>>,
}

struct Shared {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    observer: Arc<dyn TransportObserver>,
    state: Mutex<State>,
}

enum AfterClose {
    Stale,
    Stop,
    Reconnect(Duration),
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mark_open(&self, generation: u64, outbound: mpsc::UnboundedSender<String>) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.phase = ConnectionState::Open;
        state.attempts = 0;
        state.open_reported = false;
        state.outbound = Some(outbound);
        true
    }

    /// Record that `on_open` went out. False if a `disconnect` landed while
    /// it was being delivered; the session then owes the close report.
    fn confirm_open(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.open_reported = true;
        true
    }

    fn mark_closed(&self, generation: u64) -> AfterClose {
        let mut state = self.lock();
        if state.generation != generation {
            return AfterClose::Stale;
        }
        state.outbound = None;
        state.open_reported = false;
        if !state.should_reconnect {
            state.phase = ConnectionState::Disconnected;
            return AfterClose::Stop;
        }
        state.attempts = state.attempts.saturating_add(1);
        let attempt = state.attempts;
        let delay = self.config.reconnect_delay(attempt);
        state.phase = ConnectionState::ReconnectScheduled { attempt, delay };
        AfterClose::Reconnect(delay)
    }

    fn mark_connecting(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation || !state.should_reconnect {
            return false;
        }
        state.phase = ConnectionState::Connecting;
        true
    }
}

/// Reconnecting socket transport.
///
/// Holds at most one live connection. Each session runs on its own tokio
/// task which connects, pumps frames and sleeps through the backoff delay.
/// Commands never block and must be issued from within a tokio runtime.
pub struct Transport {
    shared: Arc<Shared>,
}

impl Transport {
    /// Create a WebSocket transport.
    pub fn new(config: TransportConfig, observer: Arc<dyn TransportObserver>) -> Self {
        Self::with_connector(config, Arc::new(WsConnector::new()), observer)
    }

    /// Create a transport over an explicit connector.
    pub fn with_connector(
        config: TransportConfig,
        connector: Arc<dyn Connector>,
        observer: Arc<dyn TransportObserver>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                observer,
                state: Mutex::new(State {
                    phase: ConnectionState::Disconnected,
                    should_reconnect: true,
                    attempts: 0,
                    generation: 0,
                    open_reported: false,
                    outbound: None,
                    cancel: None,
                    session: None,
                }),
            }),
        }
    }

    /// Start connecting. No-op while already connecting or open.
    ///
    /// Re-enables automatic reconnection and supersedes any pending
    /// reconnect timer.
    pub fn connect(&self) {
        let mut state = self.shared.lock();
        if matches!(
            state.phase,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            debug!(state = ?state.phase, "connect ignored");
            return;
        }
        state.should_reconnect = true;
        state.generation += 1;
        if let Some(previous) = state.cancel.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        state.cancel = Some(cancel.clone());
        state.phase = ConnectionState::Connecting;
        let generation = state.generation;
        debug!(url = %self.shared.config.url, generation, "starting session");
        state.session = Some(tokio::spawn(run_session(
            Arc::clone(&self.shared),
            generation,
            cancel,
        )));
    }

    /// Close the connection and stop reconnecting until the next `connect`.
    ///
    /// If the observer has seen `on_open`, `on_close` is reported before
    /// this returns. A socket that opened concurrently is closed by its
    /// session, which reports `on_open` and then `on_close`.
    pub fn disconnect(&self) {
        let was_open = {
            let mut state = self.shared.lock();
            state.should_reconnect = false;
            state.generation += 1;
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            state.outbound = None;
            let was_open = state.phase == ConnectionState::Open && state.open_reported;
            state.open_reported = false;
            state.phase = ConnectionState::Disconnected;
            was_open
        };

        if was_open {
            info!(url = %self.shared.config.url, "disconnected");
            self.shared
                .observer
                .on_close(&CloseInfo::normal("client disconnect"));
        }
    }

    /// Disconnect and wait until the session task has flushed queued
    /// frames and closed the socket.
    pub async fn shutdown(&self) {
        self.disconnect();
        let session = self.shared.lock().session.take();
        if let Some(session) = session {
            if let Err(err) = session.await {
                debug!(error = %err, "session task ended abnormally");
            }
        }
    }

    /// Send one raw line as a single frame.
    pub fn send(&self, raw: impl Into<String>) -> Result<()> {
        let state = self.shared.lock();
        match (&state.phase, &state.outbound) {
            (ConnectionState::Open, Some(outbound)) => outbound
                .send(raw.into())
                .map_err(|_| TransportError::NotConnected),
            _ => Err(TransportError::NotConnected),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().phase
    }

    /// Consecutive unexpected closes since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.shared.lock().attempts
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn config(&self) -> &TransportConfig {
        &self.shared.config
    }

    /// Name of the underlying connector.
    pub fn connector_name(&self) -> &'static str {
        self.shared.connector.name()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.should_reconnect = false;
        state.generation += 1;
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        state.outbound = None;
        state.open_reported = false;
        state.phase = ConnectionState::Disconnected;
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("url", &self.shared.config.url)
            .field("connector", &self.shared.connector.name())
            .field("state", &self.state())
            .finish()
    }
}

async fn run_session(shared: Arc<Shared>, generation: u64, cancel: CancellationToken) {
    let url = shared.config.url.clone();
    loop {
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = shared.connector.connect(&url) => result,
        };

        let close = match connected {
            Ok(mut socket) => {
                let (tx, rx) = mpsc::unbounded_channel();
                if !shared.mark_open(generation, tx) {
                    let _ = socket.sink.close().await;
                    return;
                }
                info!(%url, "connection open");
                shared.observer.on_open();
                if !shared.confirm_open(generation) {
                    shared
                        .observer
                        .on_close(&CloseInfo::normal("client disconnect"));
                }
                match pump(&shared, socket, rx, &cancel).await {
                    Some(close) => close,
                    None => return,
                }
            }
            Err(err) => {
                if cancel.is_cancelled() {
                    return;
                }
                warn!(%url, error = %err, "connect failed");
                shared.observer.on_error(&err);
                CloseInfo::abnormal(err.to_string())
            }
        };

        let after = shared.mark_closed(generation);
        if matches!(after, AfterClose::Stale) {
            return;
        }
        info!(%url, code = close.code, reason = %close.reason, "connection closed");
        shared.observer.on_close(&close);

        let AfterClose::Reconnect(delay) = after else {
            return;
        };
        debug!(%url, ?delay, "reconnect scheduled");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        if !shared.mark_connecting(generation) {
            return;
        }
    }
}

/// Move frames until the socket closes (`Some`) or the session is
/// cancelled (`None`).
async fn pump(
    shared: &Shared,
    socket: Socket,
    mut outbound: mpsc::UnboundedReceiver<String>,
    cancel: &CancellationToken,
) -> Option<CloseInfo> {
    let Socket {
        mut sink,
        mut source,
    } = socket;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Frames accepted by `send` before the disconnect still go out.
                while let Ok(line) = outbound.try_recv() {
                    if let Err(err) = sink.send_text(line).await {
                        debug!(error = %err, "flush after cancel failed");
                        break;
                    }
                }
                if let Err(err) = sink.close().await {
                    debug!(error = %err, "close after cancel failed");
                }
                return None;
            }
            Some(line) = outbound.recv() => {
                trace!(len = line.len(), "sending frame");
                if let Err(err) = sink.send_text(line).await {
                    warn!(error = %err, "send failed; dropping connection");
                    shared.observer.on_error(&err);
                    return Some(CloseInfo::abnormal(err.to_string()));
                }
            }
            inbound = source.recv() => match inbound {
                Ok(Inbound::Frame(bytes)) => {
                    trace!(len = bytes.len(), "frame received");
                    shared
                        .observer
                        .on_message(String::from_utf8_lossy(&bytes).into_owned());
                }
                Ok(Inbound::Closed(info)) => return Some(info),
                Err(err) => {
                    warn!(error = %err, "receive failed; dropping connection");
                    shared.observer.on_error(&err);
                    return Some(CloseInfo::abnormal(err.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConnection, MemoryConnector, MemoryServer};
    use futures_util::future::BoxFuture;
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Open,
        Close(CloseInfo),
        Error,
        Message(String),
    }

    struct Recorder(mpsc::UnboundedSender<Event>);

    impl TransportObserver for Recorder {
        fn on_open(&self) {
            let _ = self.0.send(Event::Open);
        }
        fn on_close(&self, info: &CloseInfo) {
            let _ = self.0.send(Event::Close(info.clone()));
        }
        fn on_error(&self, _error: &TransportError) {
            let _ = self.0.send(Event::Error);
        }
        fn on_message(&self, raw: String) {
            let _ = self.0.send(Event::Message(raw));
        }
    }

    /// Connects to the memory server, then holds the socket back until
    /// released.
    struct GatedConnector {
        inner: MemoryConnector,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl Connector for GatedConnector {
        fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Socket>> {
            Box::pin(async move {
                let socket = self.inner.connect(url).await?;
                let gate = self.gate.lock().unwrap().take();
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(socket)
            })
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    fn setup(
        base_ms: u64,
        max_ms: u64,
    ) -> (Transport, MemoryServer, mpsc::UnboundedReceiver<Event>) {
        let (connector, server) = MemoryConnector::pair();
        let (tx, rx) = mpsc::unbounded_channel();
        let config = TransportConfig::new("mem://test")
            .with_base_interval(Duration::from_millis(base_ms))
            .with_max_interval(Duration::from_millis(max_ms));
        let transport =
            Transport::with_connector(config, Arc::new(connector), Arc::new(Recorder(tx)));
        (transport, server, rx)
    }

    async fn accept(server: &mut MemoryServer) -> MemoryConnection {
        tokio::time::timeout(Duration::from_secs(60), server.accept())
            .await
            .expect("accept should not time out")
            .expect("server should be alive")
    }

    async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(60), events.recv())
            .await
            .expect("event should arrive")
            .expect("observer should be alive")
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..10_000 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_send_receive() {
        let (transport, mut server, mut events) = setup(100, 1000);
        assert_eq!(transport.state(), ConnectionState::Disconnected);

        transport.connect();
        let mut conn = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);
        assert!(transport.is_open());

        transport.send("line one").unwrap();
        assert_eq!(conn.recv().await.as_deref(), Some("line one"));

        conn.send("from server");
        conn.send_binary(&b"as bytes"[..]);
        assert_eq!(
            next_event(&mut events).await,
            Event::Message("from server".to_string())
        );
        assert_eq!(
            next_event(&mut events).await,
            Event::Message("as bytes".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_requires_open() {
        let (transport, _server, _events) = setup(100, 1000);
        assert!(matches!(
            transport.send("x"),
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_flushes_queued_frames() {
        let (transport, mut server, mut events) = setup(100, 1000);
        transport.connect();
        let mut conn = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);

        transport.send("first").unwrap();
        transport.send("second").unwrap();
        transport.disconnect();

        assert_eq!(conn.recv().await.as_deref(), Some("first"));
        assert_eq!(conn.recv().await.as_deref(), Some("second"));
        assert_eq!(conn.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_session() {
        let (transport, mut server, mut events) = setup(100, 1000);
        transport.connect();
        let mut conn = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);

        transport.send("bye").unwrap();
        transport.shutdown().await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);

        assert_eq!(conn.recv().await.as_deref(), Some("bye"));
        assert_eq!(conn.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_idempotent() {
        let (transport, mut server, mut events) = setup(100, 1000);
        transport.connect();
        transport.connect();
        let _conn = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);
        transport.connect();

        let second = tokio::time::timeout(Duration::from_millis(500), server.accept()).await;
        assert!(second.is_err(), "no second socket expected");
        assert_eq!(server.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_double_and_cap() {
        let (transport, server, _events) = setup(100, 400);
        server.set_refusing(true);
        transport.connect();

        wait_for(|| server.attempts() >= 5).await;
        let times = server.attempt_times();
        let gaps: Vec<u128> = times
            .windows(2)
            .take(4)
            .map(|w| (w[1] - w[0]).as_millis())
            .collect();
        assert_eq!(gaps, vec![100, 200, 400, 400]);
        assert!(matches!(
            transport.state(),
            ConnectionState::ReconnectScheduled { .. } | ConnectionState::Connecting
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connect_reports_error_then_close() {
        let (transport, server, mut events) = setup(100, 400);
        server.set_refusing(true);
        transport.connect();

        assert_eq!(next_event(&mut events).await, Event::Error);
        match next_event(&mut events).await {
            Event::Close(info) => assert_eq!(info.code, CloseInfo::ABNORMAL),
            other => panic!("expected close, got {other:?}"),
        }
        wait_for(|| transport.attempts() == 1).await;
        assert_eq!(
            transport.state(),
            ConnectionState::ReconnectScheduled {
                attempt: 1,
                delay: Duration::from_millis(100)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_reset_after_open() {
        let (transport, mut server, mut events) = setup(100, 1000);
        transport.connect();
        let first = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);

        drop(first);
        match next_event(&mut events).await {
            Event::Close(info) => assert!(!info.clean),
            other => panic!("expected close, got {other:?}"),
        }
        assert_eq!(transport.attempts(), 1);

        let _second = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);
        assert_eq!(transport.attempts(), 0);
        assert_eq!(server.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_close_frame_triggers_reconnect() {
        let (transport, mut server, mut events) = setup(100, 1000);
        transport.connect();
        let conn = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);

        conn.close(1001, "going away");
        assert_eq!(
            next_event(&mut events).await,
            Event::Close(CloseInfo {
                code: 1001,
                reason: "going away".to_string(),
                clean: true
            })
        );
        let _again = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_is_terminal() {
        let (transport, mut server, mut events) = setup(100, 1000);
        transport.connect();
        let mut conn = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);

        transport.disconnect();
        assert_eq!(
            next_event(&mut events).await,
            Event::Close(CloseInfo::normal("client disconnect"))
        );
        assert_eq!(conn.recv().await, None);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(server.attempts(), 1);
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reconnect_timer_does_not_resurrect() {
        let (transport, server, _events) = setup(100, 1000);
        server.set_refusing(true);
        transport.connect();
        wait_for(|| {
            matches!(
                transport.state(),
                ConnectionState::ReconnectScheduled { .. }
            )
        })
        .await;

        transport.disconnect();
        server.set_refusing(false);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(server.attempts(), 1);
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_after_disconnect_starts_fresh_session() {
        let (transport, mut server, mut events) = setup(100, 1000);
        transport.connect();
        let _first = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);

        transport.disconnect();
        transport.connect();
        assert!(matches!(next_event(&mut events).await, Event::Close(_)));
        let _second = accept(&mut server).await;
        assert_eq!(next_event(&mut events).await, Event::Open);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(server.attempts(), 2);
        assert!(transport.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_while_connecting_discards_socket() {
        let (inner, mut server) = MemoryConnector::pair();
        let (release, gate) = oneshot::channel();
        let connector = GatedConnector {
            inner,
            gate: Mutex::new(Some(gate)),
        };
        let (tx, mut events) = mpsc::unbounded_channel();
        let transport = Transport::with_connector(
            TransportConfig::new("mem://test"),
            Arc::new(connector),
            Arc::new(Recorder(tx)),
        );

        transport.connect();
        let mut conn = accept(&mut server).await;
        assert_eq!(transport.state(), ConnectionState::Connecting);

        transport.disconnect();
        let _ = release.send(());
        assert_eq!(conn.recv().await, None);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert_eq!(server.attempts(), 1);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disconnect_racing_open_keeps_event_order() {
        for _ in 0..200 {
            let (transport, mut server, mut events) = setup(100, 1000);
            transport.connect();
            let _conn = accept(&mut server).await;
            transport.disconnect();
            transport.shutdown().await;

            let mut seen = Vec::new();
            while let Ok(event) = events.try_recv() {
                seen.push(event);
            }
            assert!(
                seen.is_empty()
                    || seen == [Event::Open, Event::Close(CloseInfo::normal("client disconnect"))],
                "unexpected events: {seen:?}"
            );
            assert_eq!(transport.state(), ConnectionState::Disconnected);
        }
    }
}
