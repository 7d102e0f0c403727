//! Module for the cluster probes.
//!
//! A probe is an rpc call to a module and function on a cluster node,
//! of which the reply is checked for an expected atom:
//! - `riak_core_status:ringready()` returns `{ok, Nodes}` on a ready ring.
//! - `riak_core_node_watcher:services()` returns `[riak_kv, riak_pipe, ...]`, with `riak_kv` first.
//! - `net_adm:ping(Node)` returns `pong`.
//! - `riak_core_status:ring_status()` returns a tuple, of which only the presence is checked.
//!
//! Every probe produces one sample in the `cluster-probe` family, 1 when the atom was found,
//! -1 when it was not found or the probe failed.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
