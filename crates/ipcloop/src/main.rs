mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ipcloop", version, about = "Message-queue IPC runtime CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "IPCLOOP_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sync_send() {
        let cli = Cli::try_parse_from([
            "ipcloop", "send", "bob", "--type", "7", "--data", "ping", "--sync",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.dest, "bob");
                assert_eq!(args.msg_type, 7);
                assert!(args.sync);
                assert_eq!(args.timeout, "3s");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_content_args() {
        let err = Cli::try_parse_from([
            "ipcloop", "send", "bob", "--type", "1", "--data", "x", "--file", "/tmp/x",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn send_requires_type() {
        let err = Cli::try_parse_from(["ipcloop", "send", "bob"])
            .expect_err("missing --type should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_serve_with_watchdog() {
        let cli = Cli::try_parse_from([
            "ipcloop",
            "serve",
            "worker",
            "--watchdog",
            "2s",
            "--count",
            "3",
            "--format",
            "json",
        ])
        .expect("serve args should parse");

        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.name, "worker");
                assert_eq!(args.watchdog.as_deref(), Some("2s"));
                assert_eq!(args.count, Some(3));
                assert!(!args.no_feed);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_feed_requires_watchdog() {
        let err = Cli::try_parse_from(["ipcloop", "serve", "worker", "--no-feed"])
            .expect_err("--no-feed without --watchdog should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
