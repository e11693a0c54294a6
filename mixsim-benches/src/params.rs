//! Benchmark parameter types.

use std::fmt;

/// Seed used for every benchmark scenario.
pub const SEED: u64 = 42;

/// Parameters describing one benchmarked network.
#[derive(Clone, Debug)]
pub struct NetworkBenchParams {
    /// Total number of nodes.
    pub num_nodes: usize,
    /// Number of layers.
    pub num_layers: usize,
    /// Packets routed per simulation run.
    pub num_packets: usize,
    /// Random seed.
    pub seed: u64,
}

impl NetworkBenchParams {
    /// A network of `num_nodes` nodes in `num_layers` layers routing 1000
    /// packets per run.
    #[must_use]
    pub const fn new(num_nodes: usize, num_layers: usize) -> Self {
        Self {
            num_nodes,
            num_layers,
            num_packets: 1_000,
            seed: SEED,
        }
    }
}

impl fmt::Display for NetworkBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},L={}", self.num_nodes, self.num_layers)
    }
}
