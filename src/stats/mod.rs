//! Module for reading the node statistics and replication statistics http endpoints.
//!
//! Both endpoints return a text dump in which every statistic is on its own line:
//! ```text
//! "node_gets": 0,
//! "node_gets_total": 0,
//! "node_get_fsm_siblings_mean": 0,
//! ```
//! Each endpoint has a whitelist of the statistics that are turned into gauges,
//! anything else in the dump is ignored.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
