//! Benchmark support crate for mixsim.
//!
//! Provides scenario parameters and setup helpers shared by the Criterion
//! benchmarks for topology generation, routing and full simulation runs.

pub mod error;
pub mod params;

use mixsim_core::{SimulationConfig, Topology, create_network};
use rand::{SeedableRng, rngs::SmallRng};

use crate::{error::BenchSetupError, params::NetworkBenchParams};

/// Builds the configuration described by `params`.
///
/// # Errors
/// Returns [`BenchSetupError::Simulation`] when the parameters do not form a
/// valid configuration.
pub fn scenario(params: &NetworkBenchParams) -> Result<SimulationConfig, BenchSetupError> {
    let config = SimulationConfig::builder()
        .with_num_nodes(params.num_nodes)
        .with_num_layers(params.num_layers)
        .with_num_packets(params.num_packets)
        .with_seed(params.seed)
        .build()?;
    Ok(config)
}

/// Generates the topology for `params` with a seeded generator.
///
/// # Errors
/// Returns [`BenchSetupError`] when configuration or generation fails.
pub fn network(params: &NetworkBenchParams) -> Result<Topology, BenchSetupError> {
    let config = scenario(params)?;
    let mut rng = SmallRng::seed_from_u64(params.seed);
    Ok(create_network(&config, &mut rng)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    fn network_matches_requested_shape() {
        let params = NetworkBenchParams::new(60, 3);
        let topology = network(&params).expect("valid parameters");
        assert_eq!(topology.node_count(), 60);
        assert_eq!(topology.layer_count(), 3);
    }

    #[rstest]
    fn scenario_rejects_empty_layers() {
        let params = NetworkBenchParams::new(10, 0);
        let err = scenario(&params).expect_err("zero layers are invalid");
        assert!(matches!(err, BenchSetupError::Simulation(_)));
    }
}
