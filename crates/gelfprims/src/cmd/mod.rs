use clap::{Args, Subcommand};
use gelfprims_chunk::DEFAULT_FRAME_SIZE;
use gelfprims_client::{Client, ClientConfig, Compression, Level, Message};

use crate::exit::{client_error, CliResult};
use crate::output::OutputFormat;

pub mod pipe;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single message.
    Send(SendArgs),
    /// Send one message per line read from stdin.
    Pipe(PipeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Pipe(args) => pipe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Connection and message options shared by `send` and `pipe`.
#[derive(Args, Debug)]
pub struct ClientArgs {
    /// Endpoint URI, e.g. udp://graylog:12201?compress=zlib.
    pub uri: String,
    /// Compression when the URI has no compress parameter.
    #[arg(long, value_name = "KIND")]
    pub compression: Option<Compression>,
    /// Maximum datagram size, chunk header included.
    #[arg(long, default_value_t = DEFAULT_FRAME_SIZE)]
    pub frame_size: usize,
    /// Override the host field (default: local hostname).
    #[arg(long)]
    pub host: Option<String>,
    /// Syslog severity 0-7.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=7))]
    pub level: Option<u8>,
    /// Additional field as NAME=VALUE (repeatable). Numeric and boolean
    /// values are sent as JSON numbers and booleans.
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, serde_json::Value)>,
}

impl ClientArgs {
    pub fn connect(&self) -> CliResult<Client> {
        let config = ClientConfig {
            frame_size: self.frame_size,
            compression: self.compression.unwrap_or_default(),
            ..ClientConfig::default()
        };
        let mut client =
            Client::with_config(config).map_err(|err| client_error("client setup failed", err))?;
        client
            .dial(&self.uri)
            .map_err(|err| client_error("dial failed", err))?;
        Ok(client)
    }

    /// Apply host, level and fields to a message.
    pub fn decorate(&self, mut message: Message) -> Message {
        if let Some(host) = &self.host {
            message = message.with_host(host.clone());
        }
        if let Some(level) = self.level.and_then(Level::from_u8) {
            message = message.with_level(level);
        }
        for (name, value) in &self.fields {
            message = message.with_field(name.clone(), value.clone());
        }
        message
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub client: ClientArgs,
    /// Short message text.
    #[arg(long, short = 'm')]
    pub message: String,
    /// Full message text, e.g. a backtrace.
    #[arg(long)]
    pub full: Option<String>,
}

#[derive(Args, Debug)]
pub struct PipeArgs {
    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_field(input: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {input:?}"))?;
    if name.is_empty() {
        return Err("field name must not be empty".to_string());
    }

    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(parsed @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => parsed,
        _ => serde_json::Value::String(value.to_string()),
    };
    Ok((name.to_string(), value))
}

/// Reject a message the dispatcher would drop, so the CLI can report it.
pub(crate) fn check_message(message: &Message) -> CliResult<()> {
    message
        .validate()
        .map_err(|err| client_error("invalid message", err))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_field_types_values() {
        assert_eq!(parse_field("count=3").unwrap(), ("count".to_string(), json!(3)));
        assert_eq!(parse_field("ok=true").unwrap(), ("ok".to_string(), json!(true)));
        assert_eq!(
            parse_field("path=/var/log").unwrap(),
            ("path".to_string(), json!("/var/log"))
        );
        assert_eq!(parse_field("eq=a=b").unwrap(), ("eq".to_string(), json!("a=b")));
        assert_eq!(parse_field("quoted=\"x\"").unwrap().1, json!("\"x\""));
    }

    #[test]
    fn parse_field_rejects_malformed_input() {
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }
}
