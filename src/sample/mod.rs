//! Module for the metric samples and the sink they are submitted to.
//!
//! A sample is the unit of output: a family (the endpoint or probe type),
//! an instance (the metric name or the rpc function name) and a gauge value.
//! Every sample produced in a tick is handed over exactly once to a [MetricSink].
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
