//! riak_stats samples the health of a Riak node.
//!
//! Two channels are read on every tick:
//! - the `/stats` and replication stats HTTP endpoints, which return a text dump of `"key": value,` lines,
//!   filtered against a whitelist per endpoint and turned into gauges.
//! - a set of cluster probes, which perform an rpc call over the Erlang distribution protocol
//!   and check the reply for an expected atom.
//!
//! Everything that is measured ends up as a [sample::MetricSample] in a [sample::MetricSink].
//!
extern crate serde;
extern crate serde_json;
#[macro_use]
extern crate serde_derive;

pub mod config;
pub mod error;
pub mod probe;
pub mod rpc;
pub mod sample;
pub mod scheduler;
pub mod stats;
pub mod utility;

/// The http client accepts invalid certificates, the stats endpoints are frequently served with self-signed ones.
pub const ACCEPT_INVALID_CERTS: bool = true;
/// Node statistics fetch buffer capacity in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 16384;
pub const DEFAULT_NODE: &str = "riak@127.0.0.1";
pub const DEFAULT_COOKIE: &str = "riak";
pub const DEFAULT_LOCAL_NODE: &str = "riak_stats@127.0.0.1";
pub const DEFAULT_INTERVAL: u64 = 10;
pub const DEFAULT_HTTP_TIMEOUT: u64 = 10;
pub const DEFAULT_RPC_TIMEOUT: u64 = 5;
pub const DEFAULT_PARALLEL: usize = 2;
