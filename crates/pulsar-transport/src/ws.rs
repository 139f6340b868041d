use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{CloseInfo, Connector, FrameSink, FrameSource, Inbound, Socket};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connector using tokio-tungstenite.
///
/// Each wire line travels as one text frame. Inbound binary frames are
/// accepted too and handed over as raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Socket>> {
        Box::pin(async move {
            let (ws, _response) =
                tokio_tungstenite::connect_async(url)
                    .await
                    .map_err(|e| TransportError::Connect {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })?;
            debug!(%url, "websocket handshake complete");

            let (sink, stream) = ws.split();
            Ok(Socket {
                sink: Box::new(WsSink { inner: sink }),
                source: Box::new(WsSource { inner: stream }),
            })
        })
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

struct WsSink {
    inner: SplitSink<WsStream, WsMessage>,
}

impl FrameSink for WsSink {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.inner
                .send(WsMessage::Text(text.into()))
                .await
                .map_err(|e| TransportError::Send(e.to_string()))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.inner
                .close()
                .await
                .map_err(|e| TransportError::Send(e.to_string()))
        })
    }
}

struct WsSource {
    inner: SplitStream<WsStream>,
}

impl FrameSource for WsSource {
    fn recv(&mut self) -> BoxFuture<'_, Result<Inbound>> {
        Box::pin(async move {
            loop {
                match self.inner.next().await {
                    Some(Ok(WsMessage::Text(text))) => {
                        return Ok(Inbound::Frame(Bytes::copy_from_slice(text.as_bytes())));
                    }
                    Some(Ok(WsMessage::Binary(data))) => return Ok(Inbound::Frame(data)),
                    Some(Ok(WsMessage::Close(frame))) => {
                        let info = match frame {
                            Some(frame) => CloseInfo {
                                code: u16::from(frame.code),
                                reason: frame.reason.as_str().to_string(),
                                clean: true,
                            },
                            None => CloseInfo {
                                code: CloseInfo::NO_STATUS,
                                reason: String::new(),
                                clean: true,
                            },
                        };
                        return Ok(Inbound::Closed(info));
                    }
                    Some(Ok(other)) => {
                        // Ping/pong and raw frames carry no protocol data.
                        trace!(kind = ?frame_kind(&other), "ignoring control frame");
                        continue;
                    }
                    Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                    None => return Ok(Inbound::Closed(CloseInfo::abnormal("stream ended"))),
                }
            }
        })
    }
}

fn frame_kind(message: &WsMessage) -> &'static str {
    match message {
        WsMessage::Text(_) => "text",
        WsMessage::Binary(_) => "binary",
        WsMessage::Ping(_) => "ping",
        WsMessage::Pong(_) => "pong",
        WsMessage::Close(_) => "close",
        WsMessage::Frame(_) => "frame",
    }
}
