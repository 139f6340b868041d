//! In-process connector.
//!
//! [`MemoryConnector`] hands every accepted connection to a paired
//! [`MemoryServer`], which plays the remote endpoint. Useful for driving the
//! transport (and anything built on it) in tests without a network.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{CloseInfo, Connector, FrameSink, FrameSource, Inbound, Socket};

#[derive(Debug)]
struct Registry {
    refusing: bool,
    attempts: Vec<Instant>,
    accepted: mpsc::UnboundedSender<MemoryConnection>,
}

/// Client side of an in-process endpoint.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    registry: Arc<Mutex<Registry>>,
}

/// Server side of an in-process endpoint.
#[derive(Debug)]
pub struct MemoryServer {
    registry: Arc<Mutex<Registry>>,
    incoming: mpsc::UnboundedReceiver<MemoryConnection>,
}

/// Server end of one accepted connection.
#[derive(Debug)]
pub struct MemoryConnection {
    from_client: mpsc::UnboundedReceiver<String>,
    to_client: mpsc::UnboundedSender<Inbound>,
}

impl MemoryConnector {
    /// Create a connected connector/server pair.
    pub fn pair() -> (MemoryConnector, MemoryServer) {
        let (accepted, incoming) = mpsc::unbounded_channel();
        let registry = Arc::new(Mutex::new(Registry {
            refusing: false,
            attempts: Vec::new(),
            accepted,
        }));
        (
            MemoryConnector {
                registry: Arc::clone(&registry),
            },
            MemoryServer { registry, incoming },
        )
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Connector for MemoryConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Socket>> {
        Box::pin(async move {
            let mut registry = lock(&self.registry);
            registry.attempts.push(Instant::now());
            if registry.refusing {
                return Err(TransportError::Connect {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            }

            let (client_tx, from_client) = mpsc::unbounded_channel();
            let (to_client, client_rx) = mpsc::unbounded_channel();
            registry
                .accepted
                .send(MemoryConnection {
                    from_client,
                    to_client,
                })
                .map_err(|_| TransportError::Connect {
                    url: url.to_string(),
                    reason: "memory server dropped".to_string(),
                })?;
            debug!(%url, "memory connection accepted");

            Ok(Socket {
                sink: Box::new(MemorySink {
                    tx: Some(client_tx),
                }),
                source: Box::new(MemorySource { rx: client_rx }),
            })
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

impl MemoryServer {
    /// Wait for the next accepted connection.
    pub async fn accept(&mut self) -> Option<MemoryConnection> {
        self.incoming.recv().await
    }

    /// Refuse (or accept again) subsequent connection attempts.
    pub fn set_refusing(&self, refusing: bool) {
        lock(&self.registry).refusing = refusing;
    }

    /// Number of connection attempts so far, refused ones included.
    pub fn attempts(&self) -> usize {
        lock(&self.registry).attempts.len()
    }

    /// When each connection attempt happened.
    pub fn attempt_times(&self) -> Vec<Instant> {
        lock(&self.registry).attempts.clone()
    }
}

impl MemoryConnection {
    /// Next text frame sent by the client; `None` once the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Push a text frame to the client.
    pub fn send(&self, line: impl Into<String>) -> bool {
        self.send_binary(Bytes::from(line.into()))
    }

    /// Push a binary frame to the client.
    pub fn send_binary(&self, data: impl Into<Bytes>) -> bool {
        self.to_client.send(Inbound::Frame(data.into())).is_ok()
    }

    /// Close with a close frame. Dropping the connection instead simulates
    /// a dropped socket.
    pub fn close(self, code: u16, reason: &str) {
        let _ = self.to_client.send(Inbound::Closed(CloseInfo {
            code,
            reason: reason.to_string(),
            clean: true,
        }));
    }
}

struct MemorySink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl FrameSink for MemorySink {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
            tx.send(text)
                .map_err(|_| TransportError::Send("memory peer gone".to_string()))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.tx = None;
            Ok(())
        })
    }
}

struct MemorySource {
    rx: mpsc::UnboundedReceiver<Inbound>,
}

impl FrameSource for MemorySource {
    fn recv(&mut self) -> BoxFuture<'_, Result<Inbound>> {
        Box::pin(async move {
            Ok(self
                .rx
                .recv()
                .await
                .unwrap_or_else(|| Inbound::Closed(CloseInfo::abnormal("memory peer dropped"))))
        })
    }
}
