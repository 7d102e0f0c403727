//! The structs
//!
use std::time::Duration;
use tokio::net::TcpStream;
use eetf::Pid;

/// The well known port of epmd.
pub const EPMD_PORT: u16 = 4369;

/// A node name: `alive@host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeName {
    pub alive: String,
    pub host: String,
}
/// The registration of a node in epmd, as returned by `PORT_PLEASE2_REQ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpmdEntry {
    pub port: u16,
    pub highest_version: u16,
    pub lowest_version: u16,
}
/// An authenticated distribution connection to a node.
///
/// `local_pid` is the pid the rpc reply is sent to.
pub struct DistConnection {
    pub stream: TcpStream,
    pub local_pid: Pid,
}
/// The client performing the rpc calls. It holds no connection: every call connects anew.
#[derive(Debug, Clone)]
pub struct RpcClient {
    pub local_node: String,
    pub epmd_port: u16,
    pub timeout: Duration,
}
/// The reply of an rpc call in external term format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcReply {
    pub buffer: Vec<u8>,
}
