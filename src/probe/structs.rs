//! The structs
//!
use eetf::Term;

/// A single rpc health check.
///
/// `match_window` is the number of reply elements scanned for `expected_atom`,
/// 0 means all elements of the reply.
/// Without an expected atom, the probe only checks the reply holds the scanned elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSpec {
    pub node: String,
    pub cookie: String,
    pub module: String,
    pub function: String,
    pub argument: Option<String>,
    pub match_window: usize,
    pub expected_atom: Option<String>,
}
/// The outcome of evaluating a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Matched,
    NotMatched,
}
/// The decoded reply, tagged by its outer type.
///
/// Anything that is not a list or a tuple, such as the bare `pong` atom of a ping,
/// is a single element.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyShape {
    Tuple(Vec<Term>),
    List(Vec<Term>),
    Single(Term),
}
