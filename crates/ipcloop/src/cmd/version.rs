use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("ipcloop {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("IPCLOOP_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "wire: envelope={}B reply={}B reply_base={}",
        ipcloop::envelope::ENVELOPE_SIZE,
        ipcloop::envelope::REPLY_SIZE,
        ipcloop::envelope::REPLY_BASE
    );

    Ok(SUCCESS)
}
