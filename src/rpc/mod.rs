//! Module for rpc calls to a cluster node over the Erlang distribution protocol.
//!
//! A call is a full round trip on a fresh connection:
//! - ask epmd on the host of the node for the distribution port of the node.
//! - connect and perform the distribution handshake, authenticated with the cookie.
//! - send `{call, Module, Function, Args, user}` to the `rex` server of the node.
//! - wait for `{rex, Reply}`, and close the connection.
//!
//! The reply is returned in external term format, for the probes to evaluate.
//!
mod structs;
mod functions;
mod distribution;

pub use structs::*;
pub use functions::*;
pub use distribution::*;
