use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ccfprims {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ccfprims");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("CCFPRIMS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "git_hash: {}",
        option_env!("CCFPRIMS_GIT_HASH").unwrap_or("unknown")
    );
    println!("sequence_space: {}", ccfprims_wire::SEQUENCE_SPACE);
    println!(
        "default_piggyback_multiplier: {}",
        ccfprims_engine::DEFAULT_PIGGYBACK_MULTIPLIER
    );

    Ok(SUCCESS)
}
