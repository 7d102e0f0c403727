//! The structs
//!
use clap::Parser;
use std::time::Duration;
use crate::probe::ProbeSpec;
use crate::sample::OutputFormat;

/// The command line switches.
///
/// Most switches are strings and are resolved into [Settings], so they can also be set via .env.
#[derive(Debug, Parser, Default)]
#[command(author, version, about, long_about = None)]
pub struct Opts {
    /// url of the node statistics endpoint, for example http://127.0.0.1:8098/stats (StatsURL)
    #[arg(long, value_name = "url")]
    pub stats_url: Option<String>,
    /// url of the replication statistics endpoint (ReplURL)
    #[arg(long, value_name = "url")]
    pub repl_url: Option<String>,
    /// reserved (CheckRepl)
    #[arg(long, value_name = "value")]
    pub check_repl: Option<String>,
    /// collectd style option, for example StatsURL=http://127.0.0.1:8098/stats
    #[arg(short = 'o', long = "option", value_name = "key=value")]
    pub options: Vec<String>,
    /// the node probed via rpc
    #[arg(long, value_name = "name@host")]
    pub node: Option<String>,
    /// distribution cookie of the node
    #[arg(long)]
    pub cookie: Option<String>,
    /// the node name riak_stats uses when connecting
    #[arg(long, value_name = "name@host")]
    pub local_node: Option<String>,
    /// port of epmd on the host of the node
    #[arg(long)]
    pub epmd_port: Option<String>,
    /// seconds between samples
    #[arg(short, long)]
    pub interval: Option<String>,
    /// timeout in seconds for a stats fetch
    #[arg(long)]
    pub http_timeout: Option<String>,
    /// timeout in seconds for an rpc probe
    #[arg(long)]
    pub rpc_timeout: Option<String>,
    /// maximum size in bytes of a stats response, the rest is cut off
    #[arg(long)]
    pub buffer_capacity: Option<String>,
    /// number of threads for the stats fetches
    #[arg(long)]
    pub parallel: Option<String>,
    /// output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
    /// regex to select sample instances to output
    #[arg(long, value_name = "regex")]
    pub stat_name_match: Option<String>,
    /// take a single sample and exit
    #[arg(long)]
    pub once: bool,
    /// write the settings that are set via switches or environment to .env
    #[arg(long)]
    pub write_dotenv: bool,
}
/// The resolved settings. These are fixed after startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub stats_url: Option<String>,
    pub repl_url: Option<String>,
    /// Stored, but not acted upon.
    pub check_repl: Option<String>,
    pub node: String,
    pub cookie: String,
    pub local_node: String,
    pub epmd_port: u16,
    pub interval: Duration,
    pub http_timeout: Duration,
    pub rpc_timeout: Duration,
    pub buffer_capacity: usize,
    pub parallel: usize,
    pub once: bool,
    pub probes: Vec<ProbeSpec>,
}
