use ipcloop::channel::{ChannelName, MessageQueue};

use crate::cmd::UnlinkArgs;
use crate::exit::{channel_error, CliError, CliResult, FAILURE, SUCCESS};

pub fn run(args: UnlinkArgs) -> CliResult<i32> {
    let name = ChannelName::new(&args.name).map_err(|err| channel_error("invalid name", err))?;
    match MessageQueue::unlink(&name) {
        Ok(()) => {
            println!("unlinked {}", name.path());
            Ok(SUCCESS)
        }
        Err(err) if err.is_not_found() && args.force => Ok(SUCCESS),
        Err(err) if err.is_not_found() => Err(CliError::new(
            FAILURE,
            format!("no such queue: {}", name.path()),
        )),
        Err(err) => Err(channel_error("unlink failed", err)),
    }
}
