use std::fs;
use std::thread;

use ipcloop::channel::SendPolicy;
use ipcloop::envelope::Envelope;
use ipcloop::transport::{send_async_to, Transport, TransportConfig, TransportHandle};
use tracing::warn;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{io_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let mut envelope = Envelope::new(args.msg_type, resolve_content(&args)?);

    if !args.sync {
        if let Some(from) = &args.from {
            envelope.source = from.clone();
        }
        send_async_to(&args.dest, &envelope, &SendPolicy::default())
            .map_err(|err| transport_error("send failed", err))?;
        return Ok(SUCCESS);
    }

    let config = TransportConfig {
        reply_timeout: parse_duration(&args.timeout)?,
        ..TransportConfig::default()
    };
    let name = args
        .from
        .clone()
        .unwrap_or_else(|| format!("ipcloop-cli-{}", std::process::id()));
    let transport = Transport::init_with_config(&name, ignore_requests, config)
        .map_err(|err| transport_error("init failed", err))?;

    let result = thread::scope(|scope| {
        let receiver = scope.spawn(|| transport.main_loop());
        let result = transport.send_sync(&args.dest, envelope);
        transport.stop_loop();
        match receiver.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "reply receiver failed"),
            Err(_) => warn!("reply receiver panicked"),
        }
        result
    });
    transport.deinit();

    let reply = result.map_err(|err| transport_error("request failed", err))?;
    print_reply(&reply, format);
    Ok(SUCCESS)
}

fn ignore_requests(request: &Envelope, _: &TransportHandle) {
    warn!(msg_type = request.msg_type, source = %request.source, "ignoring request sent to a send-only channel");
}

fn resolve_content(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}
