use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("gelfprims {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: gelfprims");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("GELFPRIMS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("GELFPRIMS_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("gelf_version: {}", gelfprims_client::GELF_VERSION);
    println!(
        "defaults: frame_size={}, compression={}, max_chunks={}",
        gelfprims_chunk::DEFAULT_FRAME_SIZE,
        gelfprims_client::Compression::default(),
        gelfprims_chunk::MAX_CHUNKS
    );

    Ok(SUCCESS)
}
