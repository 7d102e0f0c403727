//! Module for the periodic sampling.
//!
//! Every tick reads the node stats and replication stats endpoints, and runs the cluster probes.
//! A failing fetch or probe only affects its own samples, the rest of the tick continues.
//!
mod functions;

pub use functions::*;
