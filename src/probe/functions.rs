//! The impls and functions
//!
use std::{io::Cursor, time::Instant};
use eetf::{Atom, FixInteger, List, Term};
use log::*;
use crate::error::RpcError;
use crate::rpc::RpcClient;
use crate::sample::{MetricFamily, MetricSample};
use crate::probe::{ProbeResult, ProbeSpec, ReplyShape};

impl ProbeSpec {
    pub fn new(
        node: &str,
        cookie: &str,
        module: &str,
        function: &str,
        argument: Option<&str>,
        match_window: usize,
        expected_atom: Option<&str>,
    ) -> Self
    {
        ProbeSpec {
            node: node.to_string(),
            cookie: cookie.to_string(),
            module: module.to_string(),
            function: function.to_string(),
            argument: argument.map(|a| a.to_string()),
            match_window,
            expected_atom: expected_atom.map(|a| a.to_string()),
        }
    }
    /// The four probes run against a riak node on every tick.
    pub fn default_probes(
        node: &str,
        cookie: &str,
    ) -> Vec<ProbeSpec>
    {
        vec![
            ProbeSpec::new(node, cookie, "riak_core_status", "ring_status", None, 3, None),
            ProbeSpec::new(node, cookie, "riak_core_status", "ringready", None, 1, Some("ok")),
            ProbeSpec::new(node, cookie, "riak_core_node_watcher", "services", None, 1, Some("riak_kv")),
            ProbeSpec::new(node, cookie, "net_adm", "ping", Some(node), 1, Some("pong")),
        ]
    }
    /// The argument list of the call: empty, or a single atom.
    pub fn arguments(&self) -> List {
        match &self.argument {
            Some(argument) if !argument.is_empty() => List::from(vec![Term::Atom(Atom::from(argument.as_str()))]),
            _ => List::nil(),
        }
    }
    /// Perform the probe: connect, call, evaluate, and turn the outcome into a sample.
    ///
    /// A failing probe is logged, and gives the same -1 as a reply without the expected atom.
    pub async fn run(
        &self,
        client: &RpcClient,
    ) -> MetricSample
    {
        let timer = Instant::now();
        let result = client.call(self).await
            .and_then(|reply| evaluate(&reply.buffer, self.match_window, self.expected_atom.as_deref()))
            .unwrap_or_else(|e| {
                error!("probe {}:{} failed: {}", self.module, self.function, e);
                ProbeResult::NotMatched
            });
        info!("probe {}:{} on {}: {:?} {:?}", self.module, self.function, self.node, result, timer.elapsed());
        MetricSample::new(MetricFamily::ClusterProbe, &self.function, result.value())
    }
}

impl ProbeResult {
    pub fn value(&self) -> i64 {
        match self {
            ProbeResult::Matched => 1,
            ProbeResult::NotMatched => -1,
        }
    }
}

impl ReplyShape {
    /// Decode an encoded reply, and tag it by its outer type.
    pub fn decode(buffer: &[u8]) -> Result<ReplyShape, RpcError> {
        let term = Term::decode(Cursor::new(buffer))
            .map_err(|e| RpcError::Decode(e.to_string()))?;
        Ok(match term {
            Term::Tuple(tuple) => ReplyShape::Tuple(tuple.elements),
            Term::List(list) => ReplyShape::List(list.elements),
            Term::ImproperList(list) => ReplyShape::List(list.elements),
            // a list of small integers arrives as a string
            Term::ByteList(bytes) => ReplyShape::List(
                bytes.bytes.iter().map(|byte| Term::FixInteger(FixInteger::from(i32::from(*byte)))).collect()
            ),
            other => ReplyShape::Single(other),
        })
    }
    pub fn elements(&self) -> &[Term] {
        match self {
            ReplyShape::Tuple(elements) | ReplyShape::List(elements) => elements,
            ReplyShape::Single(term) => std::slice::from_ref(term),
        }
    }
    pub fn arity(&self) -> usize {
        self.elements().len()
    }
}

/// Check whether `expected_atom` is among the first `match_window` elements of the encoded reply,
/// or among all elements when `match_window` is 0. The scan stops at the first match.
///
/// Scanning beyond the end of the reply, or into an element that is not an atom, is a decode error.
/// Without an expected atom, the reply only has to hold the scanned elements.
pub fn evaluate(
    buffer: &[u8],
    match_window: usize,
    expected_atom: Option<&str>,
) -> Result<ProbeResult, RpcError>
{
    let shape = ReplyShape::decode(buffer)?;
    let arity = shape.arity();
    let scan = if match_window == 0 { arity } else { match_window };
    debug!("reply arity: {}, scanning: {}", arity, scan);

    let expected_atom = match expected_atom {
        Some(expected_atom) => expected_atom,
        None => {
            return if scan <= arity {
                Ok(ProbeResult::Matched)
            } else {
                Err(RpcError::Decode(format!("reply has {} elements, {} expected", arity, scan)))
            };
        }
    };

    for position in 0..scan {
        match shape.elements().get(position) {
            Some(Term::Atom(atom)) if atom.name == expected_atom => return Ok(ProbeResult::Matched),
            Some(Term::Atom(_)) => continue,
            Some(other) => return Err(RpcError::Decode(format!("element {} is not an atom: {}", position, other))),
            None => return Err(RpcError::Decode(format!("element {} is beyond the reply of {} elements", position, arity))),
        }
    }
    Ok(ProbeResult::NotMatched)
}
