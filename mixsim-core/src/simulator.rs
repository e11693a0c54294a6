//! Simulation driver tying the generator, router and metrics together.
//!
//! Provides the [`Simulator`] entry point plus one-shot helpers. A run builds
//! its topology once, routes `num_packets` synthetic packets, then aggregates
//! the metrics into a [`MetricsReport`].

use rand::{Rng, SeedableRng, rngs::SmallRng};
use tracing::{info, instrument, warn};

use crate::{
    Result,
    config::SimulationConfig,
    flow::{Flow, simulate_packet_flow},
    metrics::{calculate_anonymity_set, calculate_entropy, simulate_adversary_correlation},
    report::MetricsReport,
    topology::{NodeId, Topology, create_network},
};

/// Owns the topology and random source of one simulation.
///
/// # Examples
/// ```
/// use mixsim_core::{SimulationConfig, Simulator};
///
/// let config = SimulationConfig::builder()
///     .with_num_nodes(30)
///     .with_num_layers(3)
///     .with_num_packets(200)
///     .build()
///     .expect("configuration is valid");
/// let mut simulator = Simulator::new(config).expect("topology generation succeeds");
/// assert_eq!(simulator.topology().node_count(), 30);
///
/// let report = simulator.run().expect("run succeeds");
/// assert!(report.anonymity_set <= 30);
/// assert!((0.0..=1.0).contains(&report.correlation_rate));
/// ```
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulationConfig,
    topology: Topology,
    rng: SmallRng,
}

impl Simulator {
    /// Generates the topology from a random source seeded with
    /// [`SimulationConfig::seed`].
    ///
    /// # Errors
    /// Propagates topology generation failures from [`create_network`].
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let rng = SmallRng::seed_from_u64(config.seed());
        Self::with_rng(config, rng)
    }

    /// Generates the topology from a caller-supplied random source, which the
    /// simulator then keeps for its runs.
    ///
    /// # Errors
    /// Propagates topology generation failures from [`create_network`].
    pub fn with_rng(config: SimulationConfig, mut rng: SmallRng) -> Result<Self> {
        let topology = create_network(&config, &mut rng)?;
        Ok(Self {
            config,
            topology,
            rng,
        })
    }

    /// Configuration the simulator was built with.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Topology generated for this simulator.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Routes the configured packets and aggregates the metrics.
    ///
    /// Successive calls continue the same random stream, so they sample new
    /// traffic over the same topology.
    ///
    /// # Errors
    /// Propagates routing and correlation failures.
    pub fn run(&mut self) -> Result<MetricsReport> {
        simulate(&self.config, &self.topology, &mut self.rng)
    }
}

/// Runs one simulation with a random source seeded from
/// [`SimulationConfig::seed`].
///
/// Two calls with the same configuration return the same report.
///
/// # Errors
/// Propagates topology generation, routing and correlation failures.
///
/// # Examples
/// ```
/// use mixsim_core::{SimulationConfig, run_simulation};
///
/// let config = SimulationConfig::default();
/// let first = run_simulation(&config).expect("run succeeds");
/// let second = run_simulation(&config).expect("run succeeds");
/// assert_eq!(first, second);
/// ```
pub fn run_simulation(config: &SimulationConfig) -> Result<MetricsReport> {
    let mut rng = SmallRng::seed_from_u64(config.seed());
    run_simulation_with_rng(config, &mut rng)
}

/// Runs one simulation drawing every random choice from `rng`.
///
/// # Errors
/// Propagates topology generation, routing and correlation failures.
pub fn run_simulation_with_rng<R: Rng + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<MetricsReport> {
    let topology = create_network(config, rng)?;
    simulate(config, &topology, rng)
}

#[instrument(
    name = "core.run_simulation",
    err,
    skip(config, topology, rng),
    fields(
        node_count = topology.node_count(),
        num_layers = topology.layer_count(),
        num_packets = config.num_packets(),
        adversary_coverage = config.adversary_coverage()
    ),
)]
fn simulate<R: Rng + ?Sized>(
    config: &SimulationConfig,
    topology: &Topology,
    rng: &mut R,
) -> Result<MetricsReport> {
    let node_count = topology.node_count();
    let mut flows = Vec::with_capacity(config.num_packets());
    let mut latencies = Vec::with_capacity(config.num_packets());

    for _ in 0..config.num_packets() {
        let source = NodeId::new(rng.gen_range(0..node_count));
        let destination = NodeId::new(rng.gen_range(0..node_count));
        if source == destination {
            continue;
        }
        let route = simulate_packet_flow(topology, source, destination)?;
        if route.is_unreachable() {
            record_unroutable();
            continue;
        }
        record_routed(route.latency());
        flows.push(Flow::new(source, destination));
        latencies.push(route.latency());
    }

    if flows.is_empty() && config.num_packets() > 0 {
        warn!(
            num_packets = config.num_packets(),
            "no packet reached its destination"
        );
    }

    let anonymity_set = calculate_anonymity_set(&flows);
    let entropy = calculate_entropy(&traffic_distribution(&flows, config.num_nodes()));
    let num_monitored = monitored_node_count(config, node_count);
    let correlation_rate = simulate_adversary_correlation(topology, num_monitored, rng)?;
    let report = MetricsReport {
        anonymity_set,
        entropy,
        correlation_rate,
        avg_latency: mean(&latencies),
    };

    info!(
        flows = flows.len(),
        anonymity_set = report.anonymity_set,
        entropy = report.entropy,
        correlation_rate = report.correlation_rate,
        avg_latency = report.avg_latency,
        level = %report.anonymity_level(),
        "simulation completed"
    );
    Ok(report)
}

/// Packets sent per source id, over a vector of `num_nodes` buckets.
fn traffic_distribution(flows: &[Flow], num_nodes: usize) -> Vec<u64> {
    let mut counts = vec![0_u64; num_nodes];
    for flow in flows {
        if let Some(count) = counts.get_mut(flow.source().get()) {
            *count += 1;
        }
    }
    counts
}

/// `floor(num_nodes * coverage)`, capped by the nodes actually generated.
fn monitored_node_count(config: &SimulationConfig, node_count: usize) -> usize {
    let requested = config.num_monitored();
    if requested > node_count {
        warn!(
            requested,
            node_count, "monitored node count exceeds generated nodes; clamping"
        );
        return node_count;
    }
    requested
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "average latency is a floating-point mean"
)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(feature = "metrics")]
fn record_routed(latency: f64) {
    ::metrics::counter!("simulation_packets_routed").increment(1);
    ::metrics::histogram!("simulation_route_latency").record(latency);
}

#[cfg(not(feature = "metrics"))]
fn record_routed(_latency: f64) {}

#[cfg(feature = "metrics")]
fn record_unroutable() {
    ::metrics::counter!("simulation_packets_unroutable").increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record_unroutable() {}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    fn traffic_distribution_counts_sources() {
        let flows: Vec<Flow> = [(0, 5), (0, 6), (3, 9)].into_iter().map(Flow::from).collect();
        assert_eq!(traffic_distribution(&flows, 5), vec![2, 0, 0, 1, 0]);
    }

    #[rstest]
    #[case::empty(&[], 0.0)]
    #[case::single(&[4.0], 4.0)]
    #[case::several(&[1.0, 2.0, 6.0], 3.0)]
    fn mean_handles_empty_input(#[case] values: &[f64], #[case] expected: f64) {
        assert!((mean(values) - expected).abs() < 1e-12);
    }

    #[rstest]
    fn monitored_count_is_clamped_to_generated_nodes() {
        let config = SimulationConfig::builder()
            .with_num_nodes(12)
            .with_num_layers(5)
            .with_adversary_coverage(1.0)
            .build()
            .expect("configuration must be valid");
        assert_eq!(config.num_monitored(), 12);
        assert_eq!(monitored_node_count(&config, 10), 10);
        assert_eq!(monitored_node_count(&config, 12), 12);
    }

    #[rstest]
    fn simulator_matches_one_shot_run() {
        let config = SimulationConfig::builder()
            .with_num_packets(300)
            .with_seed(99)
            .build()
            .expect("configuration must be valid");
        let mut simulator = Simulator::new(config.clone()).expect("generation must succeed");
        let from_simulator = simulator.run().expect("run must succeed");
        let one_shot = run_simulation(&config).expect("run must succeed");
        assert_eq!(from_simulator, one_shot);
    }

    #[rstest]
    fn zero_packets_yield_empty_traffic_metrics() {
        let config = SimulationConfig::builder()
            .with_num_packets(0)
            .build()
            .expect("configuration must be valid");
        let report = run_simulation(&config).expect("run must succeed");
        assert_eq!(report.anonymity_set, 0);
        assert_eq!(report.entropy, 0.0);
        assert_eq!(report.avg_latency, 0.0);
    }
}
