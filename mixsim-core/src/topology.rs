//! Stratified relay topology and its randomised generator.
//!
//! Nodes are partitioned into contiguous, equally sized layers. Edges only
//! run from a layer to the next one, each carrying a latency drawn once from
//! an exponential distribution.

use std::{fmt, ops::Range};

use rand::{Rng, seq::index};
use rand_distr::{Distribution, Exp};
use tracing::{debug, instrument};

use crate::{
    Result,
    config::SimulationConfig,
    error::SimulationError,
};

/// Smallest number of next-layer targets a node connects to.
pub const MIN_FAN_OUT: usize = 3;
/// Largest number of next-layer targets a node connects to.
pub const MAX_FAN_OUT: usize = 5;
/// Lower bound of the dormant reputation attribute.
pub const MIN_REPUTATION: f64 = 0.7;
/// Upper bound (exclusive) of the dormant reputation attribute.
pub const MAX_REPUTATION: f64 = 1.0;

/// Identifier of a relay node within a [`Topology`].
///
/// # Examples
/// ```
/// use mixsim_core::NodeId;
///
/// let id = NodeId::new(4);
/// assert_eq!(id.get(), 4);
/// assert_eq!(id.to_string(), "4");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(usize);

impl NodeId {
    /// Creates a node identifier.
    #[rustfmt::skip]
    #[must_use]
    pub const fn new(id: usize) -> Self { Self(id) }

    /// Returns the underlying index.
    #[rustfmt::skip]
    #[must_use]
    pub const fn get(self) -> usize { self.0 }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A relay node and its static attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    layer: usize,
    reputation: f64,
}

impl Node {
    /// Node identifier.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Layer the node belongs to.
    #[must_use]
    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Reputation sampled at creation. No algorithm reads it.
    #[must_use]
    pub fn reputation(&self) -> f64 {
        self.reputation
    }
}

/// Directed link from a node to one of its next-layer targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    target: NodeId,
    latency: f64,
}

impl Edge {
    /// Next-layer node the edge points to.
    #[must_use]
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Latency fixed for the topology's lifetime.
    #[must_use]
    pub fn latency(&self) -> f64 {
        self.latency
    }
}

/// Stratified directed graph of relay nodes.
///
/// # Examples
/// ```
/// use mixsim_core::{SimulationConfig, create_network};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let config = SimulationConfig::builder()
///     .with_num_nodes(20)
///     .with_num_layers(4)
///     .build()
///     .expect("configuration is valid");
/// let mut rng = SmallRng::seed_from_u64(1);
/// let topology = create_network(&config, &mut rng).expect("generation succeeds");
/// assert_eq!(topology.node_count(), 20);
/// assert!(topology.edges().all(|(source, edge)| {
///     topology.layer_of(edge.target()) == topology.layer_of(source).map(|layer| layer + 1)
/// }));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    nodes: Vec<Node>,
    adjacency: Vec<Vec<Edge>>,
    nodes_per_layer: usize,
    num_layers: usize,
}

impl Topology {
    /// Number of materialised nodes (`nodes_per_layer * num_layers`).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.num_layers
    }

    /// Width of every layer.
    #[must_use]
    pub fn nodes_per_layer(&self) -> usize {
        self.nodes_per_layer
    }

    /// Total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Whether `id` names a node of this topology.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.get() < self.nodes.len()
    }

    /// Looks up a node by identifier.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.get())
    }

    /// Iterates over all nodes in identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Layer of `id`, or `None` for unknown nodes.
    #[must_use]
    pub fn layer_of(&self, id: NodeId) -> Option<usize> {
        self.node(id).map(Node::layer)
    }

    /// Identifiers of the nodes in `layer`; empty for layers past the end.
    #[must_use]
    pub fn layer_nodes(&self, layer: usize) -> Range<usize> {
        if layer >= self.num_layers {
            return 0..0;
        }
        let start = layer * self.nodes_per_layer;
        start..start + self.nodes_per_layer
    }

    /// Outgoing edges of `id` in insertion order; empty for unknown nodes.
    #[must_use]
    pub fn edges_from(&self, id: NodeId) -> &[Edge] {
        self.adjacency.get(id.get()).map_or(&[], Vec::as_slice)
    }

    /// Iterates over every edge as `(source, edge)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, &Edge)> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(source, edges)| edges.iter().map(move |edge| (NodeId::new(source), edge)))
    }

    /// Latency of the edge `source -> target`, if it exists.
    #[must_use]
    pub fn edge_latency(&self, source: NodeId, target: NodeId) -> Option<f64> {
        self.edges_from(source)
            .iter()
            .find(|edge| edge.target == target)
            .map(Edge::latency)
    }

    /// Number of outgoing edges of `id`.
    #[must_use]
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.edges_from(id).len()
    }
}

/// Builds a stratified topology from `config`, drawing every random choice
/// from `rng`.
///
/// Nodes are created first, layer by layer, each with a reputation in
/// `[0.7, 1.0)`. Every node outside the last layer then connects to
/// `k ~ Uniform{3, 4, 5}` distinct nodes of the next layer, capped at the
/// layer width. Validation only admits narrow layers under
/// [`FanOutPolicy::Clamp`](crate::FanOutPolicy::Clamp).
///
/// # Errors
/// Returns [`SimulationError::InvalidMeanLatency`] when the latency
/// distribution cannot be constructed.
#[instrument(
    name = "core.create_network",
    err,
    skip(config, rng),
    fields(
        num_nodes = config.num_nodes(),
        num_layers = config.num_layers(),
        nodes_per_layer = config.nodes_per_layer(),
        policy = ?config.fan_out_policy()
    ),
)]
pub fn create_network<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Result<Topology> {
    let num_layers = config.num_layers();
    let nodes_per_layer = config.nodes_per_layer();
    let latency = latency_distribution(config.mean_edge_latency())?;

    let node_count = nodes_per_layer * num_layers;
    let nodes: Vec<Node> = (0..node_count)
        .map(|id| Node {
            id: NodeId::new(id),
            layer: id / nodes_per_layer,
            reputation: rng.gen_range(MIN_REPUTATION..MAX_REPUTATION),
        })
        .collect();

    let mut adjacency = vec![Vec::new(); node_count];
    let mut clamped = 0_usize;
    for layer in 0..num_layers.saturating_sub(1) {
        let next_start = (layer + 1) * nodes_per_layer;
        for source in layer * nodes_per_layer..next_start {
            let sampled = rng.gen_range(MIN_FAN_OUT..=MAX_FAN_OUT);
            let fan_out = sampled.min(nodes_per_layer);
            if fan_out < sampled {
                clamped += 1;
            }
            let edges: Vec<Edge> = index::sample(rng, nodes_per_layer, fan_out)
                .into_iter()
                .map(|offset| Edge {
                    target: NodeId::new(next_start + offset),
                    latency: latency.sample(rng),
                })
                .collect();
            if let Some(slot) = adjacency.get_mut(source) {
                *slot = edges;
            }
        }
    }

    if clamped > 0 {
        debug!(
            clamped,
            layer_width = nodes_per_layer,
            "fan-out clamped to layer width"
        );
    }

    Ok(Topology {
        nodes,
        adjacency,
        nodes_per_layer,
        num_layers,
    })
}

#[expect(
    clippy::float_arithmetic,
    reason = "the exponential rate is the reciprocal of the configured mean"
)]
fn latency_distribution(mean: f64) -> Result<Exp<f64>> {
    Exp::new(mean.recip()).map_err(|_| SimulationError::InvalidMeanLatency { got: mean })
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use rstest::rstest;

    fn config(nodes: usize, layers: usize) -> SimulationConfig {
        SimulationConfig::builder()
            .with_num_nodes(nodes)
            .with_num_layers(layers)
            .build()
            .expect("configuration must be valid")
    }

    fn generate(config: &SimulationConfig, seed: u64) -> Topology {
        let mut rng = SmallRng::seed_from_u64(seed);
        create_network(config, &mut rng).expect("generation must succeed")
    }

    #[rstest]
    fn remainder_nodes_are_not_materialised() {
        let topology = generate(&config(103, 5), 3);
        assert_eq!(topology.nodes_per_layer(), 20);
        assert_eq!(topology.node_count(), 100);
        assert!(!topology.contains(NodeId::new(100)));
        assert!(topology.node(NodeId::new(102)).is_none());
    }

    #[rstest]
    fn nodes_are_assigned_to_contiguous_layers() {
        let topology = generate(&config(100, 5), 11);
        for node in topology.nodes() {
            assert_eq!(node.layer(), node.id().get() / 20);
            assert!((MIN_REPUTATION..MAX_REPUTATION).contains(&node.reputation()));
        }
        assert_eq!(topology.layer_nodes(2), 40..60);
        assert_eq!(topology.layer_nodes(5), 0..0);
    }

    #[rstest]
    fn last_layer_has_no_outgoing_edges() {
        let topology = generate(&config(50, 5), 5);
        for id in topology.layer_nodes(4) {
            assert_eq!(topology.out_degree(NodeId::new(id)), 0);
        }
    }

    #[rstest]
    fn edge_targets_are_distinct_with_positive_latency() {
        let topology = generate(&config(60, 3), 9);
        for node in topology.nodes() {
            let mut targets: Vec<NodeId> = topology
                .edges_from(node.id())
                .iter()
                .map(Edge::target)
                .collect();
            let degree = targets.len();
            targets.sort_unstable();
            targets.dedup();
            assert_eq!(targets.len(), degree);
        }
        assert!(topology.edges().all(|(_, edge)| edge.latency() >= 0.0));
        let (source, edge) = topology.edges().next().expect("graph has edges");
        assert_eq!(
            topology.edge_latency(source, edge.target()),
            Some(edge.latency())
        );
    }

    #[rstest]
    fn narrow_layers_are_clamped() {
        let topology = generate(&config(6, 3), 21);
        for id in topology.layer_nodes(0).chain(topology.layer_nodes(1)) {
            assert_eq!(topology.out_degree(NodeId::new(id)), 2);
        }
    }

    #[rstest]
    fn same_seed_produces_identical_topologies() {
        let config = config(100, 5);
        assert_eq!(generate(&config, 42), generate(&config, 42));
    }

    proptest! {
        #[test]
        fn edges_only_join_adjacent_layers(
            layers in 1_usize..=6,
            width in 1_usize..=12,
            seed in any::<u64>(),
        ) {
            let topology = generate(&config(layers * width, layers), seed);
            for (source, edge) in topology.edges() {
                let from = topology.layer_of(source).expect("source exists");
                let to = topology.layer_of(edge.target()).expect("target exists");
                prop_assert_eq!(to, from + 1);
            }
        }

        #[test]
        fn out_degree_stays_within_fan_out_bounds(
            layers in 2_usize..=5,
            width in 1_usize..=10,
            seed in any::<u64>(),
        ) {
            let topology = generate(&config(layers * width, layers), seed);
            let last_layer = layers - 1;
            for node in topology.nodes() {
                let degree = topology.out_degree(node.id());
                if node.layer() == last_layer {
                    prop_assert_eq!(degree, 0);
                } else {
                    prop_assert!(degree >= MIN_FAN_OUT.min(width));
                    prop_assert!(degree <= MAX_FAN_OUT.min(width));
                }
            }
        }
    }
}
