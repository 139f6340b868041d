//! Connects to a Pulsar server, pings it and lists contacts.
//!
//! Run with:
//!   cargo run --example ping -- ws://localhost:8080 @alice

use std::sync::Arc;
use std::time::Duration;

use pulsar::peer::{ChannelObserver, Client, ClientConfig, ClientEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "ws://localhost:8080".to_string());
    let identity = args.next().unwrap_or_else(|| "@example".to_string());

    let (observer, mut events) = ChannelObserver::new();
    let client = Client::new(ClientConfig::new(identity, url), Arc::new(observer));
    client.connect();

    // Wait for the first open; the transport keeps retrying in between.
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = events.recv().await {
            match event {
                ClientEvent::Open => return,
                ClientEvent::Error(e) => eprintln!("connect attempt failed: {e}"),
                _ => {}
            }
        }
    })
    .await?;

    println!("ping: {}", client.ping().await?);
    for contact in client.contact_list().await? {
        println!("contact: {contact}");
    }

    client.shutdown().await;
    Ok(())
}
