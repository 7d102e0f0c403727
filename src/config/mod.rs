//! Module for the settings of riak_stats.
//!
//! Settings are resolved in the order: command line switch, environment variable
//! (which can be set via a `.env` file in the current directory), default.
//! The collectd style keys `StatsURL`, `ReplURL` and `CheckRepl` can be given with `--option Key=Value`.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
