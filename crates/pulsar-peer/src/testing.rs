//! In-memory server fixture for client tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pulsar_transport::MemoryConnector;
use pulsar_wire::{Message, SERVER_MSG, SERVER_REQ};
use tokio::sync::mpsc;

use crate::answer::Answer;
use crate::client::{Client, ClientConfig};
use crate::observer::{ChannelObserver, ClientEvent};

/// A connected client plus a fake server that answers known requests.
pub(crate) struct Harness {
    pub client: Client,
    events: mpsc::UnboundedReceiver<ClientEvent>,
    received: mpsc::UnboundedReceiver<Message>,
    inject: mpsc::UnboundedSender<String>,
}

impl Harness {
    /// Connect a client as `identity`. The server answers each request
    /// listed in `replies` and stays silent on anything else.
    pub async fn start(identity: &str, replies: &[(&str, &str)]) -> Self {
        let (connector, mut server) = MemoryConnector::pair();
        let (observer, mut events) = ChannelObserver::new();
        let client = Client::with_connector(
            ClientConfig::new(identity, "mem://pulsar"),
            Arc::new(connector),
            Arc::new(observer),
        );

        let replies: HashMap<String, String> = replies
            .iter()
            .map(|(req, rsp)| (req.to_string(), rsp.to_string()))
            .collect();
        let (received_tx, received) = mpsc::unbounded_channel();
        let (inject, mut inject_rx) = mpsc::unbounded_channel::<String>();
        let layout = *client.layout();
        let identity = identity.to_string();

        tokio::spawn(async move {
            let Some(mut conn) = server.accept().await else {
                return;
            };
            let mut next_id = 1u64;
            loop {
                tokio::select! {
                    line = conn.recv() => {
                        let Some(line) = line else { break };
                        let Ok(message) = layout.decode(&line) else { continue };
                        if message.receiver() == SERVER_REQ {
                            if let Some(rsp) = replies.get(message.content()) {
                                let answer = Answer::new(message.content(), rsp.as_str());
                                let reply = Message::new(
                                    next_id,
                                    answer.to_content(),
                                    identity.as_str(),
                                    SERVER_MSG,
                                    message.timestamp(),
                                );
                                next_id += 1;
                                conn.send(layout.encode(&reply));
                            }
                        }
                        let _ = received_tx.send(message);
                    }
                    raw = inject_rx.recv() => {
                        let Some(raw) = raw else { break };
                        conn.send(raw);
                    }
                }
            }
        });

        client.connect();
        let opened = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("client should open");
        assert_eq!(opened, Some(ClientEvent::Open));

        Self {
            client,
            events,
            received,
            inject,
        }
    }

    /// Next event seen by the client observer.
    pub async fn next_event(&mut self) -> ClientEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("event should arrive")
            .expect("observer should be alive")
    }

    /// Next message the server decoded from the client.
    pub async fn next_received(&mut self) -> Message {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .expect("server should receive a message")
            .expect("server should be alive")
    }

    /// Push a raw line from the server to the client.
    pub fn inject(&self, raw: impl Into<String>) {
        self.inject.send(raw.into()).expect("server should be alive");
    }

    /// Push an encoded message from the server to the client.
    pub fn inject_message(&self, message: Message) {
        self.inject(self.client.layout().encode(&message));
    }
}
