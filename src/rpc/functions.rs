//! The impls and functions
//!
use std::time::{Duration, Instant};
use eetf::Term;
use log::*;
use crate::error::RpcError;
use crate::probe::ProbeSpec;
use crate::rpc::{DistConnection, NodeName, RpcClient, RpcReply};

fn connect_error(
    probe: &ProbeSpec,
    reason: impl ToString,
) -> RpcError
{
    RpcError::Connect { node: probe.node.clone(), reason: reason.to_string() }
}

fn call_error(
    probe: &ProbeSpec,
    reason: impl ToString,
) -> RpcError
{
    RpcError::Call {
        node: probe.node.clone(),
        module: probe.module.clone(),
        function: probe.function.clone(),
        reason: reason.to_string(),
    }
}

impl RpcClient {
    pub fn new(
        local_node: &str,
        epmd_port: u16,
        timeout: Duration,
    ) -> Self
    {
        RpcClient {
            local_node: local_node.to_string(),
            epmd_port,
            timeout,
        }
    }
    /// Perform the rpc call of a probe on a new connection, within the timeout of the client.
    pub async fn call(
        &self,
        probe: &ProbeSpec,
    ) -> Result<RpcReply, RpcError>
    {
        match tokio::time::timeout(self.timeout, self.round_trip(probe)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(RpcError::Timeout {
                node: probe.node.clone(),
                module: probe.module.clone(),
                function: probe.function.clone(),
                timeout: self.timeout,
            }),
        }
    }
    async fn round_trip(
        &self,
        probe: &ProbeSpec,
    ) -> Result<RpcReply, RpcError>
    {
        let timer = Instant::now();
        let local: NodeName = self.local_node.parse().map_err(|e| connect_error(probe, e))?;
        let remote: NodeName = probe.node.parse().map_err(|e| connect_error(probe, e))?;
        if probe.cookie.is_empty() {
            return Err(connect_error(probe, "cookie is not set"));
        }

        let mut connection = DistConnection::connect(&local, &remote, &probe.cookie, self.epmd_port).await
            .map_err(|e| connect_error(probe, e))?;
        let result = connection.rpc(&probe.module, &probe.function, probe.arguments()).await;
        connection.close().await;
        let reply = result.map_err(|e| call_error(probe, e))?;
        debug!("rpc {}:{} on {}: {} {:?}", probe.module, probe.function, remote, reply, timer.elapsed());

        if let Term::Tuple(tuple) = &reply {
            if tuple.elements.len() == 2 && matches!(&tuple.elements[0], Term::Atom(atom) if atom.name == "badrpc") {
                return Err(call_error(probe, &reply));
            }
        }

        let mut buffer = Vec::new();
        reply.encode(&mut buffer).map_err(|e| call_error(probe, e))?;
        Ok(RpcReply { buffer })
    }
}
