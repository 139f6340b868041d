use pulsar_wire::WireLayout;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("pulsar {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let layout = WireLayout::default();
    println!("name: pulsar");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("PULSAR_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "wire_layout: id={} time={} sender={} receiver={}",
        layout.id_width, layout.time_width, layout.sender_width, layout.receiver_width
    );
    println!("features: peer={}, cli=true", cfg!(feature = "peer"));

    Ok(SUCCESS)
}
