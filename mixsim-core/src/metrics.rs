//! Anonymity metrics computed over the flows of a run.
//!
//! All three computations are stateless: they borrow what the driver hands
//! them and never touch topology state.

use std::collections::HashSet;

use rand::{Rng, seq::index};
use tracing::{debug, instrument};

use crate::{
    Result,
    error::SimulationError,
    flow::{Flow, simulate_packet_flow},
    topology::{NodeId, Topology},
};

/// Number of source/destination pairs the adversary samples.
pub const CORRELATION_TRIALS: usize = 100;
/// Monitored share of a path that must be exceeded for a correlation to
/// succeed.
pub const CORRELATION_THRESHOLD: f64 = 0.5;

/// Counts the distinct senders observed across `flows`.
///
/// # Examples
/// ```
/// use mixsim_core::{Flow, calculate_anonymity_set};
///
/// let flows = [Flow::from((1, 2)), Flow::from((1, 3)), Flow::from((2, 4))];
/// assert_eq!(calculate_anonymity_set(&flows), 2);
/// ```
#[must_use]
pub fn calculate_anonymity_set(flows: &[Flow]) -> usize {
    flows
        .iter()
        .map(Flow::source)
        .collect::<HashSet<NodeId>>()
        .len()
}

/// Shannon entropy, in bits, of the per-source packet counts.
///
/// Counts are normalised into probabilities and zero buckets are dropped
/// before evaluating `-Σ p log2 p`, so an empty or all-zero distribution has
/// an entropy of `0.0`.
///
/// # Examples
/// ```
/// use mixsim_core::calculate_entropy;
///
/// assert!((calculate_entropy(&[5, 5, 5, 5]) - 2.0).abs() < 1e-12);
/// assert_eq!(calculate_entropy(&[0, 0, 0]), 0.0);
/// ```
#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "entropy is defined over floating-point probabilities"
)]
#[must_use]
pub fn calculate_entropy(traffic_distribution: &[u64]) -> f64 {
    let total: u64 = traffic_distribution.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let entropy: f64 = traffic_distribution
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let probability = count as f64 / total;
            -probability * probability.log2()
        })
        .sum();
    // A single bucket sums to -0.0.
    entropy.max(0.0)
}

/// Estimates how often an adversary monitoring `num_monitored` random nodes
/// can correlate sender and receiver.
///
/// Runs [`CORRELATION_TRIALS`] trials, each routing a packet between a
/// uniformly random source and destination (which may coincide). A trial
/// succeeds when strictly more than half of the nodes on its path are
/// monitored. Trials without a path are skipped but still count towards the
/// fixed denominator, so the result is `successes / 100`.
///
/// # Errors
/// Returns [`SimulationError::TooManyMonitoredNodes`] when `num_monitored`
/// exceeds the topology's node count.
///
/// # Examples
/// ```
/// use mixsim_core::{SimulationConfig, create_network, simulate_adversary_correlation};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let config = SimulationConfig::default();
/// let mut rng = SmallRng::seed_from_u64(9);
/// let topology = create_network(&config, &mut rng).expect("generation succeeds");
/// let rate = simulate_adversary_correlation(&topology, 0, &mut rng)
///     .expect("zero monitored nodes is valid");
/// assert_eq!(rate, 0.0);
/// ```
#[instrument(
    name = "core.simulate_adversary_correlation",
    err,
    skip(topology, rng),
    fields(node_count = topology.node_count(), num_monitored = num_monitored),
)]
pub fn simulate_adversary_correlation<R: Rng + ?Sized>(
    topology: &Topology,
    num_monitored: usize,
    rng: &mut R,
) -> Result<f64> {
    let node_count = topology.node_count();
    if num_monitored > node_count {
        return Err(SimulationError::TooManyMonitoredNodes {
            requested: num_monitored,
            node_count,
        });
    }

    let mut monitored = vec![false; node_count];
    for id in index::sample(rng, node_count, num_monitored) {
        if let Some(flag) = monitored.get_mut(id) {
            *flag = true;
        }
    }

    let mut successes = 0_usize;
    let mut skipped = 0_usize;
    for _ in 0..CORRELATION_TRIALS {
        let source = NodeId::new(rng.gen_range(0..node_count));
        let destination = NodeId::new(rng.gen_range(0..node_count));
        let route = simulate_packet_flow(topology, source, destination)?;
        if route.is_unreachable() {
            skipped += 1;
            continue;
        }
        let observed = route
            .hops()
            .iter()
            .filter(|hop| monitored.get(hop.get()).copied().unwrap_or(false))
            .count();
        if exceeds_threshold(observed, route.len()) {
            successes += 1;
        }
    }

    debug!(successes, skipped, "correlation trials finished");
    Ok(ratio(successes, CORRELATION_TRIALS))
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "the threshold is a fraction of the path length"
)]
fn exceeds_threshold(observed: usize, path_len: usize) -> bool {
    observed as f64 / path_len as f64 > CORRELATION_THRESHOLD
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "rates are reported as floating-point fractions"
)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    numerator as f64 / denominator as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{SeedableRng, rngs::SmallRng};
    use rstest::rstest;

    use crate::{SimulationConfig, create_network};

    fn topology(nodes: usize, layers: usize, seed: u64) -> Topology {
        let config = SimulationConfig::builder()
            .with_num_nodes(nodes)
            .with_num_layers(layers)
            .build()
            .expect("configuration must be valid");
        create_network(&config, &mut SmallRng::seed_from_u64(seed))
            .expect("generation must succeed")
    }

    #[rstest]
    #[case::documented(vec![(1, 2), (1, 3), (2, 4)], 2)]
    #[case::empty(vec![], 0)]
    #[case::single_sender(vec![(5, 1), (5, 2), (5, 3)], 1)]
    fn anonymity_set_counts_distinct_sources(
        #[case] pairs: Vec<(usize, usize)>,
        #[case] expected: usize,
    ) {
        let flows: Vec<Flow> = pairs.into_iter().map(Flow::from).collect();
        assert_eq!(calculate_anonymity_set(&flows), expected);
    }

    #[rstest]
    #[case::two(2)]
    #[case::five(5)]
    #[case::hundred(100)]
    fn uniform_entropy_is_log2_of_bucket_count(#[case] buckets: usize) {
        let counts = vec![3_u64; buckets];
        let expected = (buckets as f64).log2();
        assert!((calculate_entropy(&counts) - expected).abs() < 1e-9);
    }

    #[rstest]
    #[case::one_hot(vec![0, 0, 9, 0])]
    #[case::all_zero(vec![0, 0, 0, 0])]
    #[case::empty(vec![])]
    fn degenerate_distributions_have_zero_entropy(#[case] counts: Vec<u64>) {
        let entropy = calculate_entropy(&counts);
        assert_eq!(entropy, 0.0);
        assert!(entropy.is_sign_positive());
    }

    #[test]
    fn zero_buckets_do_not_change_entropy() {
        let sparse = calculate_entropy(&[1, 0, 1, 0, 0, 2]);
        let dense = calculate_entropy(&[1, 1, 2]);
        assert!((sparse - dense).abs() < 1e-12);
        assert!((dense - 1.5).abs() < 1e-12);
    }

    #[rstest]
    fn no_monitored_nodes_never_correlate() {
        let topology = topology(100, 5, 1);
        let mut rng = SmallRng::seed_from_u64(2);
        let rate = simulate_adversary_correlation(&topology, 0, &mut rng)
            .expect("zero monitored nodes is valid");
        assert_eq!(rate, 0.0);
    }

    #[rstest]
    fn full_coverage_always_correlates_when_every_pair_routes() {
        let topology = topology(1, 1, 4);
        let mut rng = SmallRng::seed_from_u64(5);
        let rate = simulate_adversary_correlation(&topology, 1, &mut rng)
            .expect("monitoring every node is valid");
        assert_eq!(rate, 1.0);
    }

    #[rstest]
    fn full_coverage_counts_every_routed_trial() {
        let topology = topology(100, 5, 6);
        let mut rng = SmallRng::seed_from_u64(7);
        let rate = simulate_adversary_correlation(&topology, 100, &mut rng)
            .expect("monitoring every node is valid");
        assert!(rate > 0.0);
        assert!(rate <= 1.0);
    }

    #[rstest]
    fn unroutable_trials_keep_the_fixed_denominator() {
        // Distinct nodes of a single layer never connect, so only the
        // self-pairs among the 100 trials route.
        let topology = topology(4, 1, 8);
        let mut rng = SmallRng::seed_from_u64(9);
        let rate = simulate_adversary_correlation(&topology, 4, &mut rng)
            .expect("monitoring every node is valid");
        assert!(rate < 1.0);
        let scaled = rate * CORRELATION_TRIALS as f64;
        assert!((scaled - scaled.round()).abs() < 1e-9);
    }

    #[rstest]
    fn monitoring_more_nodes_than_exist_fails() {
        let topology = topology(10, 2, 10);
        let mut rng = SmallRng::seed_from_u64(11);
        let err = simulate_adversary_correlation(&topology, 11, &mut rng)
            .expect_err("only ten nodes exist");
        assert_eq!(
            err,
            SimulationError::TooManyMonitoredNodes {
                requested: 11,
                node_count: 10
            }
        );
    }

    #[rstest]
    #[case::half(1, 2, false)]
    #[case::majority(2, 3, true)]
    #[case::minority(1, 3, false)]
    #[case::all(1, 1, true)]
    fn threshold_is_strict(#[case] observed: usize, #[case] len: usize, #[case] expected: bool) {
        assert_eq!(exceeds_threshold(observed, len), expected);
    }
}
