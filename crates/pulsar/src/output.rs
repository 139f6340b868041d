use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pulsar_wire::{classify, Message};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    schema_id: &'a str,
    id: u64,
    timestamp: i64,
    sender: &'a str,
    sender_kind: &'a str,
    receiver: &'a str,
    receiver_kind: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    schema_id: &'a str,
    request: &'a str,
    response: &'a str,
}

#[derive(Serialize)]
struct LineOutput<'a> {
    schema_id: &'a str,
    line: &'a str,
    length: usize,
}

pub fn print_message(message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&MessageOutput {
            schema_id: "https://schemas.3leaps.dev/pulsar/cli/v1/message.schema.json",
            id: message.id(),
            timestamp: message.timestamp(),
            sender: message.sender(),
            sender_kind: classify(message.sender()).name(),
            receiver: message.receiver(),
            receiver_kind: classify(message.receiver()).name(),
            content: message.content(),
        }),
        OutputFormat::Table => print_table(
            vec!["ID", "TIME", "FROM", "TO", "CONTENT"],
            vec![
                message.id().to_string(),
                message.timestamp().to_string(),
                message.sender().to_string(),
                message.receiver().to_string(),
                printable(message.content()),
            ],
        ),
        OutputFormat::Pretty => {
            println!(
                "id={} time={} from={} ({}) to={} ({}) content={}",
                message.id(),
                message.timestamp(),
                message.sender(),
                classify(message.sender()).name(),
                message.receiver(),
                classify(message.receiver()).name(),
                printable(message.content())
            );
        }
        OutputFormat::Raw => print_raw_line(message.content()),
    }
}

pub fn print_response(request: &str, response: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ResponseOutput {
            schema_id: "https://schemas.3leaps.dev/pulsar/cli/v1/response.schema.json",
            request,
            response,
        }),
        OutputFormat::Table => print_table(
            vec!["REQUEST", "RESPONSE"],
            vec![request.to_string(), printable(response)],
        ),
        OutputFormat::Pretty => println!("request={request} response={}", printable(response)),
        OutputFormat::Raw => print_raw_line(response),
    }
}

pub fn print_line(line: &str, format: OutputFormat) {
    let length = line.chars().count();
    match format {
        OutputFormat::Json => print_json(&LineOutput {
            schema_id: "https://schemas.3leaps.dev/pulsar/cli/v1/wire-line.schema.json",
            line,
            length,
        }),
        OutputFormat::Table => print_table(
            vec!["LENGTH", "LINE"],
            vec![length.to_string(), printable(line)],
        ),
        OutputFormat::Pretty => println!("length={length} line={}", printable(line)),
        OutputFormat::Raw => print_raw_line(line),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, row: Vec<String>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header)
        .add_row(row);
    println!("{table}");
}

pub fn print_raw_line(text: &str) {
    let mut out = std::io::stdout();
    let _ = out.write_all(text.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// Render protocol separators and other control characters visibly.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_control() {
                c.escape_default().to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}
