//! Error types for the stats fetches and the cluster probes.
//!
//! None of these are fatal: they end a single fetch or probe for the current tick,
//! get logged, and the scheduler continues with the next one.
use std::{io, time::Duration};
use thiserror::Error;

/// Errors fetching a stats endpoint over http.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("url is not set")]
    UrlNotSet,

    #[error("http client initialization failed: {0}")]
    ClientInit(#[source] reqwest::Error),

    #[error("http request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },

    #[error("reading response body from {url} failed: {source}")]
    Body {
        url: String,
        source: io::Error,
    },
}

/// Errors performing or evaluating an rpc call against a cluster node.
#[derive(Error, Debug)]
pub enum RpcError {
    /// Establishing the local node identity, the epmd lookup, or the distribution handshake failed.
    #[error("connection to {node} failed: {reason}")]
    Connect {
        node: String,
        reason: String,
    },

    #[error("rpc {module}:{function} on {node} failed: {reason}")]
    Call {
        node: String,
        module: String,
        function: String,
        reason: String,
    },

    #[error("decoding reply failed: {0}")]
    Decode(String),

    #[error("rpc {module}:{function} on {node} timed out after {timeout:?}")]
    Timeout {
        node: String,
        module: String,
        function: String,
        timeout: Duration,
    },
}
