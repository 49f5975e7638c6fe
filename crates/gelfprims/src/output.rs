use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gelfprims_client::{Compression, DeliveryStats};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

/// Outcome of one `send` or `pipe` run.
#[derive(Debug, Serialize)]
pub struct DeliveryReport {
    pub endpoint: String,
    pub compression: Compression,
    pub frame_size: usize,
    pub queued: u64,
    pub delivered: u64,
    pub dropped: u64,
}

impl DeliveryReport {
    pub fn new(
        endpoint: &str,
        compression: Compression,
        frame_size: usize,
        queued: u64,
        stats: DeliveryStats,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            compression,
            frame_size,
            queued,
            delivered: stats.delivered,
            dropped: stats.dropped,
        }
    }
}

pub fn print_report(report: &DeliveryReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "ENDPOINT",
                    "COMPRESSION",
                    "FRAME SIZE",
                    "QUEUED",
                    "DELIVERED",
                    "DROPPED",
                ])
                .add_row(vec![
                    report.endpoint.clone(),
                    report.compression.to_string(),
                    report.frame_size.to_string(),
                    report.queued.to_string(),
                    report.delivered.to_string(),
                    report.dropped.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "endpoint={} compression={} frame_size={} queued={} delivered={} dropped={}",
                report.endpoint,
                report.compression,
                report.frame_size,
                report.queued,
                report.delivered,
                report.dropped
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_compression_lowercase() {
        let report = DeliveryReport::new(
            "udp://127.0.0.1:12201",
            Compression::Zlib,
            1420,
            3,
            DeliveryStats {
                delivered: 2,
                dropped: 1,
            },
        );
        let value: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["compression"], "zlib");
        assert_eq!(value["delivered"], 2);
        assert_eq!(value["dropped"], 1);
    }
}
