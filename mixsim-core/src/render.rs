//! Layered layout and Graphviz export for human inspection of a topology.
//!
//! Nothing in the simulator consumes this output.

use std::io::{self, Write};

use crate::topology::{NodeId, Topology};

/// Position of a node in the layered drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodePosition {
    /// Node being placed.
    pub node: NodeId,
    /// Horizontal coordinate: the node's layer.
    pub x: f64,
    /// Vertical coordinate: the node's offset within its layer, centred on
    /// zero.
    pub y: f64,
}

/// Places every node in a column per layer, centred vertically.
///
/// # Examples
/// ```
/// use mixsim_core::{SimulationConfig, create_network, render};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let config = SimulationConfig::builder()
///     .with_num_nodes(8)
///     .with_num_layers(2)
///     .build()
///     .expect("configuration is valid");
/// let topology = create_network(&config, &mut SmallRng::seed_from_u64(0))
///     .expect("generation succeeds");
/// let positions = render::layout(&topology);
/// assert_eq!(positions.len(), 8);
/// assert_eq!((positions[5].x, positions[5].y), (1.0, -1.0));
/// ```
#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "layout coordinates are floating-point"
)]
#[must_use]
pub fn layout(topology: &Topology) -> Vec<NodePosition> {
    let half_width = topology.nodes_per_layer() as f64 / 2.0;
    topology
        .nodes()
        .map(|node| {
            let offset = node.id().get() - topology.layer_nodes(node.layer()).start;
            NodePosition {
                node: node.id(),
                x: node.layer() as f64,
                y: offset as f64 - half_width,
            }
        })
        .collect()
}

/// Writes `topology` as a Graphviz `digraph`, pinning each node at its
/// [`layout`] position and labelling edges with their latency.
///
/// # Errors
/// Returns [`io::Error`] if writing to `writer` fails.
///
/// # Examples
/// ```
/// use mixsim_core::{SimulationConfig, create_network, render};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let config = SimulationConfig::builder()
///     .with_num_nodes(10)
///     .with_num_layers(2)
///     .build()
///     .expect("configuration is valid");
/// let topology = create_network(&config, &mut SmallRng::seed_from_u64(0))
///     .expect("generation succeeds");
/// let mut buffer = Vec::new();
/// render::write_dot(&topology, &mut buffer).expect("writing to a vec succeeds");
/// let dot = String::from_utf8(buffer).expect("dot output is UTF-8");
/// assert!(dot.starts_with("digraph topology {"));
/// assert_eq!(dot.matches(" -> ").count(), topology.edge_count());
/// ```
pub fn write_dot(topology: &Topology, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "digraph topology {{")?;
    writeln!(writer, "  label=\"Stratified topology\";")?;
    writeln!(writer, "  node [shape=point, width=0.08];")?;
    for position in layout(topology) {
        writeln!(
            writer,
            "  n{} [pos=\"{:.1},{:.1}!\"];",
            position.node, position.x, position.y
        )?;
    }
    for (source, edge) in topology.edges() {
        writeln!(
            writer,
            "  n{source} -> n{} [label=\"{:.2}\"];",
            edge.target(),
            edge.latency()
        )?;
    }
    writeln!(writer, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{SeedableRng, rngs::SmallRng};
    use rstest::rstest;

    use crate::{SimulationConfig, create_network};

    #[rstest]
    fn layout_centres_each_layer() {
        let config = SimulationConfig::builder()
            .with_num_nodes(12)
            .with_num_layers(3)
            .build()
            .expect("configuration must be valid");
        let topology =
            create_network(&config, &mut SmallRng::seed_from_u64(1)).expect("generation must succeed");
        let positions = layout(&topology);
        let layer_one: Vec<f64> = positions
            .iter()
            .filter(|position| position.x == 1.0)
            .map(|position| position.y)
            .collect();
        assert_eq!(layer_one, vec![-2.0, -1.0, 0.0, 1.0]);
    }

    #[rstest]
    fn dot_output_lists_every_node() -> io::Result<()> {
        let config = SimulationConfig::builder()
            .with_num_nodes(6)
            .with_num_layers(3)
            .build()
            .expect("configuration must be valid");
        let topology =
            create_network(&config, &mut SmallRng::seed_from_u64(2)).expect("generation must succeed");
        let mut buffer = Vec::new();
        write_dot(&topology, &mut buffer)?;
        let dot = String::from_utf8(buffer).expect("dot output must be UTF-8");
        for id in 0..6 {
            assert!(dot.contains(&format!("  n{id} [pos=")));
        }
        assert!(dot.contains("n0 -> n"));
        assert!(dot.trim_end().ends_with('}'));
        Ok(())
    }
}
