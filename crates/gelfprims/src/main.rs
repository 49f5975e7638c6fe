mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "gelfprims", version, about = "GELF log delivery CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
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
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "gelfprims",
            "send",
            "udp://127.0.0.1:12201",
            "--message",
            "hello",
            "--level",
            "3",
            "--field",
            "service=api",
        ])
        .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(_)));
    }

    #[test]
    fn send_requires_message() {
        let err = Cli::try_parse_from(["gelfprims", "send", "udp://127.0.0.1:12201"])
            .expect_err("missing --message should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_out_of_range_level() {
        let err = Cli::try_parse_from([
            "gelfprims",
            "send",
            "udp://127.0.0.1:12201",
            "--message",
            "x",
            "--level",
            "9",
        ])
        .expect_err("level 9 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_pipe_with_global_flags() {
        let cli = Cli::try_parse_from([
            "gelfprims",
            "--format",
            "json",
            "pipe",
            "tcp://127.0.0.1:12201",
            "--compression",
            "zlib",
        ])
        .expect("pipe args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Pipe(_)));
    }
}
