use std::time::{SystemTime, UNIX_EPOCH};

use pulsar_wire::{Message, WireLayout};

use crate::cmd::{DecodeArgs, EncodeArgs};
use crate::exit::{wire_error, CliResult, SUCCESS};
use crate::output::{print_line, print_message, OutputFormat};

pub fn encode(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let layout = WireLayout::default();
    let timestamp = args.time.unwrap_or_else(now_unix_seconds);
    let message = Message::new(
        args.id,
        args.content,
        args.receiver,
        args.sender,
        timestamp,
    );

    let line = if args.strict {
        layout
            .encode_checked(&message)
            .map_err(|err| wire_error("encode failed", err))?
    } else {
        layout.encode(&message)
    };
    print_line(&line, format);
    Ok(SUCCESS)
}

pub fn decode(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let message = WireLayout::default()
        .decode(&args.line)
        .map_err(|err| wire_error("decode failed", err))?;
    print_message(&message, format);
    Ok(SUCCESS)
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
