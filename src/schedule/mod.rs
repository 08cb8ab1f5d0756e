//! Work coalescing and worker-pool plumbing behind the engine.

pub(crate) mod coalescer;
pub(crate) mod workers;
