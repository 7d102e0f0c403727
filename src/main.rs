//! riak_stats: periodically sample the node statistics and the cluster health of a Riak node.
//!
//! The node statistics and replication statistics are read via http,
//! the cluster health is probed via rpc calls over the Erlang distribution protocol.
//! Samples are written to standard output as a table, json or csv.
//!
use clap::Parser;
use std::collections::HashMap;
use log::*;
use anyhow::Result;
use riak_stats::config::{Opts, Settings};
use riak_stats::sample::StdoutSink;
use riak_stats::{scheduler, utility};

#[tokio::main]
async fn main() -> Result<()>
{
    env_logger::init();
    dotenv::dotenv().ok();
    let options = Opts::parse();

    let mut changed_options = HashMap::new();
    let settings = Settings::from_opts(&options, &mut changed_options)?;
    utility::dotenv_writer(options.write_dotenv, changed_options)?;
    if settings.stats_url.is_none() && settings.repl_url.is_none() {
        warn!("Neither the stats url nor the replication stats url is set, only the cluster probes produce samples");
    }
    info!("sampling {} every {:?}", settings.node, settings.interval);

    let sink = StdoutSink::new(options.output, utility::set_regex(&options.stat_name_match)?);
    scheduler::run(&settings, &sink).await
}
