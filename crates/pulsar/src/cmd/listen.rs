use pulsar_peer::ClientEvent;
use tracing::{debug, info, warn};

use crate::cmd::{open_client, ListenArgs};
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub async fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let (client, mut events) = open_client(&args.connect, &args.identity).await?;
    info!(url = %args.connect.url, identity = %args.identity, "listening");

    let mut printed = 0usize;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
        let event = tokio::select! {
            signal = &mut ctrl_c => {
                signal.map_err(|err| {
                    CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
                })?;
                debug!("interrupted");
                break;
            }
            event = events.recv() => event,
        };

        match event {
            Some(ClientEvent::Message(message)) => {
                print_message(&message, format);
                printed = printed.saturating_add(1);
            }
            Some(ClientEvent::Close(close)) => {
                warn!(code = close.code, reason = %close.reason, "connection lost; reconnecting");
            }
            Some(ClientEvent::Error(err)) => debug!(error = %err, "transport error"),
            Some(ClientEvent::Open) => info!("connection re-established"),
            None => break,
        }
    }

    client.shutdown().await;
    Ok(SUCCESS)
}
