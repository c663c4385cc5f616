use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use ipcloop::transport::TransportHandle;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod send;
pub mod serve;
pub mod unlink;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Own a channel and handle requests until interrupted.
    Serve(ServeArgs),
    /// Send one request to a channel.
    Send(SendArgs),
    /// Print a queue's attributes.
    Info(InfoArgs),
    /// Remove a queue name left behind by a crashed process.
    Unlink(UnlinkArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Unlink(args) => unlink::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Channel name to own (queue `/NAME`).
    pub name: String,
    /// Arm a watchdog with this interval (e.g. 2, 2s, 1500ms).
    #[arg(long, value_name = "INTERVAL", env = "IPCLOOP_WATCHDOG")]
    pub watchdog: Option<String>,
    /// Answer sync requests with this text instead of echoing.
    #[arg(long)]
    pub reply: Option<String>,
    /// Exit after handling N application requests.
    #[arg(long)]
    pub count: Option<usize>,
    /// Do not feed the watchdog on heartbeats (the watchdog will expire).
    #[arg(long, requires = "watchdog")]
    pub no_feed: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Destination channel name.
    pub dest: String,
    /// Request type (0-8999 application, 9000-9999 reserved).
    #[arg(long = "type", short = 't', value_name = "TYPE", allow_negative_numbers = true)]
    pub msg_type: i32,
    /// Raw string content.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read content from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Wait for the reply and print it.
    #[arg(long)]
    pub sync: bool,
    /// Source channel name. With --sync this channel is created to receive the reply.
    #[arg(long, value_name = "NAME")]
    pub from: Option<String>,
    /// Reply timeout for --sync (e.g. 3s, 500ms).
    #[arg(long, default_value = "3s", env = "IPCLOOP_REPLY_TIMEOUT")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Channel name.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct UnlinkArgs {
    /// Channel name.
    pub name: String,
    /// Succeed even if the queue does not exist.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Stop the transport's main loop on SIGINT/SIGTERM.
pub(crate) fn install_ctrlc_handler(transport: TransportHandle) -> CliResult<()> {
    ctrlc::set_handler(move || transport.stop_loop()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
