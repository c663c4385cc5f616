use ipcloop::envelope::{Envelope, Reply, WATCHDOG};
use ipcloop::transport::{Transport, TransportConfig, TransportHandle};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, ServeArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_request, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let watchdog = args.watchdog.as_deref().map(parse_duration).transpose()?;

    let feed = !args.no_feed;
    let reply_text = args.reply.clone();
    let limit = args.count;
    let mut handled = 0usize;
    let handler = move |request: &Envelope, transport: &TransportHandle| {
        if request.msg_type == WATCHDOG {
            if feed {
                if let Err(err) = transport.watchdog_feed() {
                    warn!(error = %err, "watchdog feed failed");
                }
            }
            return;
        }

        print_request(request, format);
        if request.expects_reply() {
            let reply = match &reply_text {
                Some(text) => Reply::new(0, text.clone()),
                None => Reply::new(0, request.content.clone()),
            };
            if let Err(err) = transport.send_reply(request, reply) {
                warn!(error = %err, dest = %request.source, "reply failed");
            }
        }

        handled += 1;
        if limit.is_some_and(|limit| handled >= limit) {
            info!(handled, "request limit reached");
            transport.stop_loop();
        }
    };

    let transport = Transport::init_with_config(&args.name, handler, TransportConfig::default())
        .map_err(|err| transport_error("init failed", err))?;
    if let Some(interval) = watchdog {
        transport
            .watchdog_init(interval)
            .map_err(|err| transport_error("watchdog setup failed", err))?;
    }
    install_ctrlc_handler(transport.handle())?;

    info!(channel = %transport.name(), feed, "serving");
    let result = transport.main_loop();
    let stats = transport.stats();
    transport.deinit();
    result.map_err(|err| transport_error("receive loop failed", err))?;

    info!(
        requests = stats.requests_received,
        replies = stats.replies_sent,
        heartbeats = stats.heartbeats_sent,
        "serve finished"
    );
    Ok(SUCCESS)
}
