use pulsar_wire::MAX_CONTENT_CHARS;
use tracing::info;

use crate::cmd::{open_client, SendArgs};
use crate::exit::{peer_error, CliError, CliResult, SUCCESS, USAGE};

pub async fn run(args: SendArgs) -> CliResult<i32> {
    check_content(&args.content)?;

    let (client, _events) = open_client(&args.connect, &args.from).await?;
    let sent = client
        .send(args.content.as_str(), args.to.as_str())
        .map_err(|err| peer_error("send failed", err));
    client.shutdown().await;
    sent?;

    info!(to = %args.to, "message sent");
    Ok(SUCCESS)
}

fn check_content(content: &str) -> CliResult<()> {
    let chars = content.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(CliError::new(
            USAGE,
            format!("content is {chars} characters; at most {MAX_CONTENT_CHARS} allowed"),
        ));
    }
    Ok(())
}
