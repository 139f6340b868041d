use crate::cmd::{open_client, parse_duration, RequestArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_response, OutputFormat};

pub async fn run(args: RequestArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let (client, _events) = open_client(&args.connect, &args.from).await?;

    let answered = client.request_raw(&args.text, timeout).await;
    client.shutdown().await;
    let response = answered.map_err(|err| peer_error("request failed", err))?;

    print_response(&args.text, &response, format);
    Ok(SUCCESS)
}
