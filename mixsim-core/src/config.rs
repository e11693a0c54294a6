//! Simulation parameters and the builder that validates them.
//!
//! A [`SimulationConfig`] is immutable once built; every run reads it but
//! never mutates it.

use crate::{Result, error::SimulationError, topology::MAX_FAN_OUT};

/// Default number of relay nodes requested for a run.
pub const DEFAULT_NUM_NODES: usize = 100;
/// Default number of layers in the stratified topology.
pub const DEFAULT_NUM_LAYERS: usize = 5;
/// Default number of synthetic packets routed per run.
pub const DEFAULT_NUM_PACKETS: usize = 1000;
/// Default fraction of nodes monitored by the adversary.
pub const DEFAULT_ADVERSARY_COVERAGE: f64 = 0.2;
/// Default simulated duration in seconds.
pub const DEFAULT_SIMULATION_DURATION: u64 = 3600;
/// Default mean of the exponential edge-latency distribution.
pub const DEFAULT_MEAN_EDGE_LATENCY: f64 = 50.0;
/// Default seed for the run's random source.
pub const DEFAULT_SEED: u64 = 0x5EED_CAFE;

/// Decides what the topology generator does when a layer holds fewer nodes
/// than the fan-out it sampled.
///
/// # Examples
/// ```
/// use mixsim_core::FanOutPolicy;
///
/// assert_eq!(FanOutPolicy::default(), FanOutPolicy::Clamp);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FanOutPolicy {
    /// Connect to every node of the next layer when the sampled fan-out
    /// exceeds its width.
    #[default]
    Clamp,
    /// Refuse to generate topologies whose layers are narrower than the
    /// largest fan-out.
    Strict,
}

/// Immutable parameter set for one simulation run.
///
/// # Examples
/// ```
/// use mixsim_core::SimulationConfig;
///
/// let config = SimulationConfig::default();
/// assert_eq!(config.num_nodes(), 100);
/// assert_eq!(config.num_layers(), 5);
/// assert_eq!(config.num_monitored(), 20);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "UncheckedConfig"))]
pub struct SimulationConfig {
    num_nodes: usize,
    num_layers: usize,
    num_packets: usize,
    adversary_coverage: f64,
    simulation_duration: u64,
    mean_edge_latency: f64,
    fan_out_policy: FanOutPolicy,
    seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_nodes: DEFAULT_NUM_NODES,
            num_layers: DEFAULT_NUM_LAYERS,
            num_packets: DEFAULT_NUM_PACKETS,
            adversary_coverage: DEFAULT_ADVERSARY_COVERAGE,
            simulation_duration: DEFAULT_SIMULATION_DURATION,
            mean_edge_latency: DEFAULT_MEAN_EDGE_LATENCY,
            fan_out_policy: FanOutPolicy::Clamp,
            seed: DEFAULT_SEED,
        }
    }
}

impl SimulationConfig {
    /// Returns a builder populated with the default parameters.
    #[must_use]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
    }

    /// Requested number of relay nodes. Nodes beyond
    /// `nodes_per_layer * num_layers` are not materialised.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of layers in the stratified topology.
    #[must_use]
    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    /// Number of synthetic packets routed by the driver.
    #[must_use]
    pub fn num_packets(&self) -> usize {
        self.num_packets
    }

    /// Fraction of nodes the adversary monitors.
    #[must_use]
    pub fn adversary_coverage(&self) -> f64 {
        self.adversary_coverage
    }

    /// Simulated duration in seconds. Carried for future metrics; nothing
    /// reads it yet.
    #[must_use]
    pub fn simulation_duration(&self) -> u64 {
        self.simulation_duration
    }

    /// Mean of the exponential distribution edge latencies are drawn from.
    #[must_use]
    pub fn mean_edge_latency(&self) -> f64 {
        self.mean_edge_latency
    }

    /// Policy applied when a layer is narrower than the sampled fan-out.
    #[must_use]
    pub fn fan_out_policy(&self) -> FanOutPolicy {
        self.fan_out_policy
    }

    /// Seed used by [`crate::run_simulation`] and [`crate::Simulator::new`].
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of nodes in each layer (floor division).
    ///
    /// # Examples
    /// ```
    /// use mixsim_core::SimulationConfig;
    ///
    /// let config = SimulationConfig::builder()
    ///     .with_num_nodes(23)
    ///     .with_num_layers(5)
    ///     .build()
    ///     .expect("configuration is valid");
    /// assert_eq!(config.nodes_per_layer(), 4);
    /// ```
    #[must_use]
    pub fn nodes_per_layer(&self) -> usize {
        self.num_nodes / self.num_layers
    }

    /// Number of nodes the adversary monitors: `floor(num_nodes * coverage)`.
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::float_arithmetic,
        reason = "coverage is a validated fraction and the product is floored like the model"
    )]
    #[must_use]
    pub fn num_monitored(&self) -> usize {
        (self.num_nodes as f64 * self.adversary_coverage).floor() as usize
    }
}

/// Deserialised form of [`SimulationConfig`]. Missing fields take their
/// defaults and the result goes through [`SimulationConfigBuilder::build`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct UncheckedConfig {
    num_nodes: usize,
    num_layers: usize,
    num_packets: usize,
    adversary_coverage: f64,
    simulation_duration: u64,
    mean_edge_latency: f64,
    fan_out_policy: FanOutPolicy,
    seed: u64,
}

#[cfg(feature = "serde")]
impl Default for UncheckedConfig {
    fn default() -> Self {
        let SimulationConfig {
            num_nodes,
            num_layers,
            num_packets,
            adversary_coverage,
            simulation_duration,
            mean_edge_latency,
            fan_out_policy,
            seed,
        } = SimulationConfig::default();
        Self {
            num_nodes,
            num_layers,
            num_packets,
            adversary_coverage,
            simulation_duration,
            mean_edge_latency,
            fan_out_policy,
            seed,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<UncheckedConfig> for SimulationConfig {
    type Error = SimulationError;

    fn try_from(raw: UncheckedConfig) -> Result<Self> {
        SimulationConfigBuilder::new()
            .with_num_nodes(raw.num_nodes)
            .with_num_layers(raw.num_layers)
            .with_num_packets(raw.num_packets)
            .with_adversary_coverage(raw.adversary_coverage)
            .with_simulation_duration(raw.simulation_duration)
            .with_mean_edge_latency(raw.mean_edge_latency)
            .with_fan_out_policy(raw.fan_out_policy)
            .with_seed(raw.seed)
            .build()
    }
}

/// Configures and validates [`SimulationConfig`] values.
///
/// # Examples
/// ```
/// use mixsim_core::{FanOutPolicy, SimulationConfigBuilder};
///
/// let config = SimulationConfigBuilder::new()
///     .with_num_nodes(40)
///     .with_num_layers(4)
///     .with_adversary_coverage(0.5)
///     .with_fan_out_policy(FanOutPolicy::Strict)
///     .with_seed(7)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(config.nodes_per_layer(), 10);
/// assert_eq!(config.num_monitored(), 20);
/// ```
#[derive(Debug, Clone)]
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl Default for SimulationConfigBuilder {
    fn default() -> Self {
        Self {
            config: SimulationConfig::default(),
        }
    }
}

impl SimulationConfigBuilder {
    /// Creates a builder populated with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the requested node count.
    #[must_use]
    pub fn with_num_nodes(mut self, num_nodes: usize) -> Self {
        self.config.num_nodes = num_nodes;
        self
    }

    /// Overrides the layer count.
    #[must_use]
    pub fn with_num_layers(mut self, num_layers: usize) -> Self {
        self.config.num_layers = num_layers;
        self
    }

    /// Overrides the number of packets routed per run.
    #[must_use]
    pub fn with_num_packets(mut self, num_packets: usize) -> Self {
        self.config.num_packets = num_packets;
        self
    }

    /// Overrides the monitored fraction of the network.
    #[must_use]
    pub fn with_adversary_coverage(mut self, coverage: f64) -> Self {
        self.config.adversary_coverage = coverage;
        self
    }

    /// Overrides the simulated duration in seconds.
    #[must_use]
    pub fn with_simulation_duration(mut self, seconds: u64) -> Self {
        self.config.simulation_duration = seconds;
        self
    }

    /// Overrides the mean edge latency.
    #[must_use]
    pub fn with_mean_edge_latency(mut self, mean: f64) -> Self {
        self.config.mean_edge_latency = mean;
        self
    }

    /// Selects how narrow layers are handled.
    #[must_use]
    pub fn with_fan_out_policy(mut self, policy: FanOutPolicy) -> Self {
        self.config.fan_out_policy = policy;
        self
    }

    /// Seeds the run's random source.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Validates the parameters and returns the immutable configuration.
    ///
    /// # Errors
    /// Returns [`SimulationError::InvalidLayerCount`] when `num_layers` is
    /// zero, [`SimulationError::InsufficientNodes`] when there are fewer nodes
    /// than layers, [`SimulationError::InvalidAdversaryCoverage`] when the
    /// coverage is not a fraction in `[0, 1]`,
    /// [`SimulationError::InvalidMeanLatency`] when the mean latency is not
    /// finite and positive, and [`SimulationError::InsufficientLayerWidth`]
    /// when [`FanOutPolicy::Strict`] is selected for layers narrower than the
    /// maximum fan-out.
    ///
    /// # Examples
    /// ```
    /// use mixsim_core::{SimulationConfigBuilder, SimulationError};
    ///
    /// let err = SimulationConfigBuilder::new()
    ///     .with_num_layers(0)
    ///     .build()
    ///     .expect_err("zero layers must be rejected");
    /// assert!(matches!(err, SimulationError::InvalidLayerCount { got: 0 }));
    /// ```
    pub fn build(self) -> Result<SimulationConfig> {
        let config = self.config;
        if config.num_layers == 0 {
            return Err(SimulationError::InvalidLayerCount {
                got: config.num_layers,
            });
        }
        if config.num_nodes < config.num_layers {
            return Err(SimulationError::InsufficientNodes {
                nodes: config.num_nodes,
                layers: config.num_layers,
            });
        }
        if !(0.0..=1.0).contains(&config.adversary_coverage) {
            return Err(SimulationError::InvalidAdversaryCoverage {
                got: config.adversary_coverage,
            });
        }
        if !config.mean_edge_latency.is_finite() || config.mean_edge_latency <= 0.0 {
            return Err(SimulationError::InvalidMeanLatency {
                got: config.mean_edge_latency,
            });
        }
        let layer_width = config.nodes_per_layer();
        if config.fan_out_policy == FanOutPolicy::Strict
            && config.num_layers > 1
            && layer_width < MAX_FAN_OUT
        {
            return Err(SimulationError::InsufficientLayerWidth {
                layer_width,
                required: MAX_FAN_OUT,
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    fn defaults_match_reference_model() {
        let config = SimulationConfigBuilder::new()
            .build()
            .expect("defaults must be valid");
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.num_packets(), 1000);
        assert_eq!(config.simulation_duration(), 3600);
        assert_eq!(config.fan_out_policy(), FanOutPolicy::Clamp);
        assert!((config.adversary_coverage() - 0.2).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case::none(0.0, 0)]
    #[case::fifth(0.2, 20)]
    #[case::third(1.0 / 3.0, 33)]
    #[case::all(1.0, 100)]
    fn num_monitored_floors_product(#[case] coverage: f64, #[case] expected: usize) {
        let config = SimulationConfigBuilder::new()
            .with_adversary_coverage(coverage)
            .build()
            .expect("coverage is valid");
        assert_eq!(config.num_monitored(), expected);
    }

    #[rstest]
    #[case::negative(-0.1)]
    #[case::above_one(1.5)]
    #[case::nan(f64::NAN)]
    fn build_rejects_out_of_range_coverage(#[case] coverage: f64) {
        let err = SimulationConfigBuilder::new()
            .with_adversary_coverage(coverage)
            .build()
            .expect_err("coverage outside [0, 1] must fail");
        assert_eq!(
            err.code(),
            crate::SimulationErrorCode::InvalidAdversaryCoverage
        );
    }

    #[rstest]
    fn build_rejects_fewer_nodes_than_layers() {
        let err = SimulationConfigBuilder::new()
            .with_num_nodes(3)
            .with_num_layers(4)
            .build()
            .expect_err("every layer needs a node");
        assert_eq!(
            err,
            SimulationError::InsufficientNodes {
                nodes: 3,
                layers: 4
            }
        );
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-5.0)]
    #[case::infinite(f64::INFINITY)]
    fn build_rejects_invalid_mean_latency(#[case] mean: f64) {
        let err = SimulationConfigBuilder::new()
            .with_mean_edge_latency(mean)
            .build()
            .expect_err("mean latency must be finite and positive");
        assert!(matches!(err, SimulationError::InvalidMeanLatency { .. }));
    }

    #[rstest]
    fn strict_policy_rejects_narrow_layers() {
        let err = SimulationConfigBuilder::new()
            .with_num_nodes(12)
            .with_num_layers(3)
            .with_fan_out_policy(FanOutPolicy::Strict)
            .build()
            .expect_err("four-node layers cannot host five targets");
        assert_eq!(
            err,
            SimulationError::InsufficientLayerWidth {
                layer_width: 4,
                required: 5
            }
        );
    }

    #[rstest]
    fn strict_policy_accepts_single_narrow_layer() {
        let config = SimulationConfigBuilder::new()
            .with_num_nodes(2)
            .with_num_layers(1)
            .with_fan_out_policy(FanOutPolicy::Strict)
            .build()
            .expect("a single layer has no outgoing edges");
        assert_eq!(config.nodes_per_layer(), 2);
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn deserialisation_fills_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"num_nodes": 40, "num_layers": 4, "seed": 3}"#)
                .expect("partial config must deserialise");
        assert_eq!(config.nodes_per_layer(), 10);
        assert_eq!(config.num_packets(), DEFAULT_NUM_PACKETS);
        assert_eq!(config.seed(), 3);
    }

    #[cfg(feature = "serde")]
    #[rstest]
    #[case::zero_layers(r#"{"num_layers": 0}"#, "num_layers must be at least 1")]
    #[case::narrow_strict(
        r#"{"num_nodes": 12, "num_layers": 3, "fan_out_policy": "strict"}"#,
        "layer width 4"
    )]
    fn deserialisation_validates(#[case] json: &str, #[case] message: &str) {
        let err = serde_json::from_str::<SimulationConfig>(json)
            .expect_err("invalid config must be rejected");
        assert!(err.to_string().contains(message), "unexpected error: {err}");
    }
}
