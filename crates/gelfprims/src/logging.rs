use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Library crates whose events follow `--log-level`.
const GELF_TARGETS: [&str; 4] = [
    "gelfprims",
    "gelfprims_client",
    "gelfprims_chunk",
    "gelfprims_transport",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `level` for the gelfprims crates; anything else stays at warn unless
/// `level` is quieter.
fn targets(level: LogLevel) -> Targets {
    let level = LevelFilter::from(level);
    GELF_TARGETS
        .iter()
        .fold(Targets::new(), |targets, target| targets.with_target(*target, level))
        .with_default(level.min(LevelFilter::WARN))
}

/// Install the stderr subscriber. Stdout is left to command output, and the
/// worker thread names show which pipeline stage logged an event.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(false);
    let registry = tracing_subscriber::registry().with(targets(level));

    let _ = match format {
        LogFormat::Text => registry.with(fmt).try_init(),
        LogFormat::Json => registry.with(fmt.json()).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn verbose_levels_stay_scoped_to_gelf_crates() {
        let filter = targets(LogLevel::Debug);
        assert!(filter.would_enable("gelfprims_client::dispatch", &Level::DEBUG));
        assert!(filter.would_enable("gelfprims_chunk::writer", &Level::DEBUG));
        assert!(!filter.would_enable("gelfprims_chunk::writer", &Level::TRACE));
        assert!(!filter.would_enable("clap_builder::parser", &Level::INFO));
        assert!(filter.would_enable("clap_builder::parser", &Level::WARN));
    }

    #[test]
    fn quiet_levels_apply_everywhere() {
        let filter = targets(LogLevel::Error);
        assert!(!filter.would_enable("gelfprims_client::client", &Level::WARN));
        assert!(!filter.would_enable("other_crate", &Level::WARN));
        assert!(filter.would_enable("other_crate", &Level::ERROR));
    }
}
