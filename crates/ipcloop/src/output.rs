use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ipcloop::channel::QueueAttributes;
use ipcloop::envelope::{type_name, Envelope, Reply};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RequestOutput<'a> {
    event: &'static str,
    msg_type: i32,
    type_name: &'static str,
    source: &'a str,
    correlation: u32,
    content_size: usize,
    content: String,
    timestamp: String,
}

#[derive(Serialize)]
struct ReplyOutput {
    event: &'static str,
    msg_type: i32,
    type_name: &'static str,
    correlation: u32,
    result: i32,
    content_size: usize,
    content: String,
}

#[derive(Serialize)]
struct QueueOutput<'a> {
    queue: &'a str,
    max_messages: usize,
    max_message_size: usize,
    current_messages: usize,
}

pub fn print_request(request: &Envelope, format: OutputFormat) {
    let content = content_preview(&request.content);
    match format {
        OutputFormat::Json => print_json(&RequestOutput {
            event: "request",
            msg_type: request.msg_type,
            type_name: type_name(request.msg_type),
            source: &request.source,
            correlation: request.correlation,
            content_size: request.content.len(),
            content,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => print_table(
            &["TYPE", "SOURCE", "CORRELATION", "SIZE", "CONTENT"],
            vec![
                format!("{} ({})", request.msg_type, type_name(request.msg_type)),
                request.source.clone(),
                request.correlation.to_string(),
                request.content.len().to_string(),
                content,
            ],
        ),
        OutputFormat::Pretty => println!(
            "request type={} ({}) from={} correlation={} size={} content={}",
            request.msg_type,
            type_name(request.msg_type),
            display_source(&request.source),
            request.correlation,
            request.content.len(),
            content
        ),
        OutputFormat::Raw => println!("{content}"),
    }
}

pub fn print_reply(reply: &Reply, format: OutputFormat) {
    let content = content_preview(&reply.content);
    match format {
        OutputFormat::Json => print_json(&ReplyOutput {
            event: "reply",
            msg_type: reply.msg_type,
            type_name: type_name(reply.msg_type),
            correlation: reply.correlation,
            result: reply.result,
            content_size: reply.content.len(),
            content,
        }),
        OutputFormat::Table => print_table(
            &["TYPE", "CORRELATION", "RESULT", "CONTENT"],
            vec![
                reply.msg_type.to_string(),
                reply.correlation.to_string(),
                reply.result.to_string(),
                content,
            ],
        ),
        OutputFormat::Pretty => println!(
            "reply type={} correlation={} result={} content={}",
            reply.msg_type, reply.correlation, reply.result, content
        ),
        OutputFormat::Raw => println!("{content}"),
    }
}

pub fn print_queue(queue: &str, attrs: &QueueAttributes, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&QueueOutput {
            queue,
            max_messages: attrs.max_messages,
            max_message_size: attrs.max_message_size,
            current_messages: attrs.current_messages,
        }),
        OutputFormat::Table => print_table(
            &["QUEUE", "MAX MESSAGES", "MAX MESSAGE SIZE", "QUEUED"],
            vec![
                queue.to_string(),
                attrs.max_messages.to_string(),
                attrs.max_message_size.to_string(),
                attrs.current_messages.to_string(),
            ],
        ),
        OutputFormat::Pretty | OutputFormat::Raw => println!(
            "queue={} max_messages={} max_message_size={} queued={}",
            queue, attrs.max_messages, attrs.max_message_size, attrs.current_messages
        ),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: &[&str], row: Vec<String>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec())
        .add_row(row);
    println!("{table}");
}

fn display_source(source: &str) -> &str {
    if source.is_empty() {
        "-"
    } else {
        source
    }
}

fn content_preview(content: &[u8]) -> String {
    match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", content.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
