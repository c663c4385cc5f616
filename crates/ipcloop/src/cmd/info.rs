use ipcloop::channel::{ChannelName, MessageQueue, QueueAccess};

use crate::cmd::InfoArgs;
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::{print_queue, OutputFormat};

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let name = ChannelName::new(&args.name).map_err(|err| channel_error("invalid name", err))?;
    let queue = MessageQueue::open(&name, QueueAccess::Read)
        .map_err(|err| channel_error("open failed", err))?;
    let attrs = queue
        .attributes()
        .map_err(|err| channel_error("query failed", err))?;

    print_queue(&name.path(), &attrs, format);
    Ok(SUCCESS)
}
