//! The structs
//!
use std::collections::HashSet;
use crate::sample::{MetricFamily, MetricSample};

/// The statistics taken from the node stats endpoint.
pub const NODE_STATS_METRICS: [&str; 31] = [
    "node_gets",
    "node_gets_total",
    "node_puts",
    "node_puts_total",
    "vnode_gets",
    "vnode_gets_total",
    "vnode_puts",
    "vnode_puts_total",
    "read_repairs",
    "read_repairs_total",
    "coord_redirs_total",
    "node_get_fsm_time_mean",
    "node_get_fsm_time_median",
    "node_get_fsm_time_95",
    "node_get_fsm_time_100",
    "node_put_fsm_time_mean",
    "node_put_fsm_time_median",
    "node_put_fsm_time_95",
    "node_put_fsm_time_100",
    "node_get_fsm_objsize_mean",
    "node_get_fsm_objsize_median",
    "node_get_fsm_objsize_95",
    "node_get_fsm_objsize_100",
    "node_get_fsm_siblings_mean",
    "node_get_fsm_siblings_median",
    "node_get_fsm_siblings_95",
    "node_get_fsm_siblings_100",
    "memory_processes_used",
    "sys_process_count",
    "pbc_connects",
    "pbc_active",
];
/// The statistics taken from the replication stats endpoint.
pub const REPLICATION_STATS_METRICS: [&str; 6] = [
    "queue_length",
    "queue_byte_size",
    "queue_percentage",
    "dropped_count",
    "local_leader_message_queue_len",
    "local_leader_heap_size",
];
/// At most this many lines of a response body are parsed.
pub const MAX_LINES: usize = 160;

/// The set of statistic names that are turned into samples for an endpoint family.
///
/// The whitelist is built once and never changed.
#[derive(Debug, Clone)]
pub struct MetricWhitelist {
    pub family: MetricFamily,
    pub names: HashSet<&'static str>,
}
/// The response body of a single fetch.
///
/// The buffer never holds more than `capacity` bytes: anything appended beyond that is dropped.
#[derive(Debug, Clone, Default)]
pub struct FetchBuffer {
    pub data: Vec<u8>,
    pub capacity: usize,
}
/// A configured stats endpoint: the url (which can be unset) and the whitelist belonging to it.
#[derive(Debug, Clone)]
pub struct StatsEndpoint {
    pub url: Option<String>,
    pub whitelist: MetricWhitelist,
}
/// Wrapper struct for the samples of all stats endpoints in a tick.
#[derive(Debug, Default)]
pub struct AllStatsSamples {
    pub samples: Vec<MetricSample>,
}
