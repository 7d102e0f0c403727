//! The structs
//!
use chrono::{DateTime, Local};
use regex::Regex;
use std::{io::Stdout, sync::Mutex};

/// The category a sample belongs to.
///
/// The node and replication stats families each have their own whitelist,
/// the cluster probe family holds one sample per rpc probe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MetricFamily {
    NodeStats,
    ReplicationStats,
    ClusterProbe,
}
/// A single gauge.
///
/// ```text
/// { "family": "node-stats", "instance": "node_gets", "value": 42, "timestamp": "2026-10-16T10:01:02+02:00" }
/// ```
/// The timestamp is set by the scheduler when the sample is taken,
/// the parsers leave it empty.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub family: MetricFamily,
    pub instance: String,
    pub value: i64,
    pub timestamp: Option<DateTime<Local>>,
}
/// The output formats of the [StdoutSink].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}
/// The sink that writes samples to standard output.
///
/// The csv writer is kept for the lifetime of the sink, so the header is written once.
pub struct StdoutSink {
    pub format: OutputFormat,
    pub stat_name_filter: Regex,
    pub csv_writer: Mutex<csv::Writer<Stdout>>,
}
