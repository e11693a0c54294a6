//! Packet routing over a stratified topology.
//!
//! Routes are chosen by hop count alone. Edge latencies never influence the
//! choice; they are summed over the chosen path afterwards.

use std::collections::VecDeque;

use crate::{
    Result,
    error::SimulationError,
    topology::{NodeId, Topology},
};

/// A `(source, destination)` pair recorded for one routed packet.
///
/// # Examples
/// ```
/// use mixsim_core::{Flow, NodeId};
///
/// let flow = Flow::new(NodeId::new(1), NodeId::new(2));
/// assert_eq!(flow.source().get(), 1);
/// assert_eq!(flow.destination().get(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flow {
    source: NodeId,
    destination: NodeId,
}

impl Flow {
    /// Records a flow between two nodes.
    #[must_use]
    pub const fn new(source: NodeId, destination: NodeId) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Sending node.
    #[must_use]
    pub const fn source(&self) -> NodeId {
        self.source
    }

    /// Receiving node.
    #[must_use]
    pub const fn destination(&self) -> NodeId {
        self.destination
    }
}

impl From<(usize, usize)> for Flow {
    fn from((source, destination): (usize, usize)) -> Self {
        Self::new(NodeId::new(source), NodeId::new(destination))
    }
}

/// Path taken by a packet and the latency accumulated along it.
///
/// An empty path means the destination is unreachable from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    hops: Vec<NodeId>,
    latency: f64,
}

impl Route {
    /// The route returned when no path exists.
    ///
    /// # Examples
    /// ```
    /// use mixsim_core::Route;
    ///
    /// let route = Route::unreachable();
    /// assert!(route.is_unreachable());
    /// assert_eq!(route.latency(), 0.0);
    /// ```
    #[must_use]
    pub const fn unreachable() -> Self {
        Self {
            hops: Vec::new(),
            latency: 0.0,
        }
    }

    /// Nodes visited from source to destination, both included.
    #[must_use]
    pub fn hops(&self) -> &[NodeId] {
        &self.hops
    }

    /// Number of nodes on the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Whether the path is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Alias of [`Self::is_empty`] that reads better at call sites.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        self.is_empty()
    }

    /// Sum of edge latencies along the path.
    #[must_use]
    pub fn latency(&self) -> f64 {
        self.latency
    }
}

/// Routes a packet from `source` to `destination` along a hop-count shortest
/// path and sums the latencies of the traversed edges.
///
/// A packet addressed to its own source takes the single-node path. When no
/// path exists the result is [`Route::unreachable`]; that is a normal outcome,
/// not an error.
///
/// # Errors
/// Returns [`SimulationError::UnknownNode`] when either identifier is outside
/// the topology.
///
/// # Examples
/// ```
/// use mixsim_core::{NodeId, SimulationConfig, create_network, simulate_packet_flow};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let config = SimulationConfig::builder()
///     .with_num_nodes(15)
///     .with_num_layers(3)
///     .build()
///     .expect("configuration is valid");
/// let topology = create_network(&config, &mut SmallRng::seed_from_u64(3))
///     .expect("generation succeeds");
///
/// // Later layers never reach earlier ones.
/// let backwards = simulate_packet_flow(&topology, NodeId::new(10), NodeId::new(0))
///     .expect("nodes exist");
/// assert!(backwards.is_unreachable());
/// ```
pub fn simulate_packet_flow(
    topology: &Topology,
    source: NodeId,
    destination: NodeId,
) -> Result<Route> {
    for node in [source, destination] {
        if !topology.contains(node) {
            return Err(SimulationError::UnknownNode {
                node,
                node_count: topology.node_count(),
            });
        }
    }

    let Some(hops) = shortest_path(topology, source, destination) else {
        return Ok(Route::unreachable());
    };
    let latency = path_latency(topology, &hops);
    Ok(Route { hops, latency })
}

/// Breadth-first search from `source`, visiting neighbours in edge insertion
/// order. Returns `None` when `destination` is never reached.
fn shortest_path(topology: &Topology, source: NodeId, destination: NodeId) -> Option<Vec<NodeId>> {
    let mut parents: Vec<Option<NodeId>> = vec![None; topology.node_count()];
    let mut visited = vec![false; topology.node_count()];
    let mut queue = VecDeque::from([source]);
    *visited.get_mut(source.get())? = true;

    while let Some(current) = queue.pop_front() {
        if current == destination {
            return Some(unwind(&parents, destination));
        }
        for edge in topology.edges_from(current) {
            let target = edge.target();
            let Some(seen) = visited.get_mut(target.get()) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            if let Some(parent) = parents.get_mut(target.get()) {
                *parent = Some(current);
            }
            queue.push_back(target);
        }
    }
    None
}

fn unwind(parents: &[Option<NodeId>], destination: NodeId) -> Vec<NodeId> {
    let mut path = vec![destination];
    let mut current = destination;
    while let Some(Some(parent)) = parents.get(current.get()) {
        path.push(*parent);
        current = *parent;
    }
    path.reverse();
    path
}

#[expect(
    clippy::float_arithmetic,
    reason = "route latency is the sum of edge latencies"
)]
fn path_latency(topology: &Topology, hops: &[NodeId]) -> f64 {
    hops.windows(2)
        .filter_map(|pair| match pair {
            [from, to] => topology.edge_latency(*from, *to),
            _ => None,
        })
        .sum()
}
