use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use pulsar_peer::{ChannelObserver, Client, ClientConfig, ClientEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::exit::{io_error, CliError, CliResult, TIMEOUT, TRANSPORT_ERROR, USAGE};
use crate::output::OutputFormat;

pub mod codec;
pub mod listen;
pub mod request;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single message.
    Send(SendArgs),
    /// Send a server request and print the response.
    Request(RequestArgs),
    /// Print every inbound message.
    Listen(ListenArgs),
    /// Encode a message into a wire line (offline).
    Encode(EncodeArgs),
    /// Decode a wire line (offline).
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => block_on(send::run(args)),
        Command::Request(args) => block_on(request::run(args, format)),
        Command::Listen(args) => block_on(listen::run(args, format)),
        Command::Encode(args) => codec::encode(args, format),
        Command::Decode(args) => codec::decode(args, format),
        Command::Version(args) => version::run(args),
    }
}

fn block_on<F>(future: F) -> CliResult<i32>
where
    F: Future<Output = CliResult<i32>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;
    runtime.block_on(future)
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Server URL (ws:// or wss://).
    #[arg(long, short = 'u', env = "PULSAR_URL")]
    pub url: String,
    /// Maximum time to wait for the connection to open (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Own address, written as sender.
    #[arg(long)]
    pub from: String,
    /// Receiver address (@user, :channel).
    #[arg(long)]
    pub to: String,
    /// Message content.
    pub content: String,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Own address, written as sender.
    #[arg(long)]
    pub from: String,
    /// Maximum time to wait for the answer (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Request text, e.g. "!ping" or "!contact list".
    pub text: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Own address.
    #[arg(long = "as", value_name = "ADDR")]
    pub identity: String,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message id (0 for client-originated messages).
    #[arg(long, default_value_t = 0)]
    pub id: u64,
    /// Timestamp in seconds since the Unix epoch. Default: now.
    #[arg(long)]
    pub time: Option<i64>,
    /// Sender address.
    #[arg(long, default_value = "")]
    pub sender: String,
    /// Receiver address.
    #[arg(long, default_value = "")]
    pub receiver: String,
    /// Fail instead of emitting a misaligned line when a field is too wide.
    #[arg(long)]
    pub strict: bool,
    /// Message content.
    pub content: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire line to decode.
    pub line: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

/// Connect a client and wait until the socket is open.
///
/// Failed attempts are retried by the transport until `--connect-timeout`
/// runs out.
pub(crate) async fn open_client(
    connect: &ConnectArgs,
    identity: &str,
) -> CliResult<(Client, UnboundedReceiver<ClientEvent>)> {
    if !(connect.url.starts_with("ws://") || connect.url.starts_with("wss://")) {
        return Err(CliError::new(
            USAGE,
            format!("unsupported url {:?}: expected ws:// or wss://", connect.url),
        ));
    }
    let timeout = parse_duration(&connect.connect_timeout)?;

    let (observer, mut events) = ChannelObserver::new();
    let client = Client::new(
        ClientConfig::new(identity, connect.url.as_str()),
        Arc::new(observer),
    );
    client.connect();

    let opened = tokio::time::timeout(timeout, async {
        while let Some(event) = events.recv().await {
            match event {
                ClientEvent::Open => return true,
                ClientEvent::Error(err) => debug!(error = %err, "connect attempt failed"),
                other => debug!(event = ?other, "event before open"),
            }
        }
        false
    })
    .await;

    match opened {
        Ok(true) => Ok((client, events)),
        Ok(false) => {
            client.disconnect();
            Err(CliError::new(TRANSPORT_ERROR, "client event stream ended"))
        }
        Err(_) => {
            client.disconnect();
            Err(CliError::new(
                TIMEOUT,
                format!(
                    "connection to {} not open after {}",
                    connect.url, connect.connect_timeout
                ),
            ))
        }
    }
}
