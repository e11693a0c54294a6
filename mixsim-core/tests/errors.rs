//! Error codes and messages exposed by the core API.

use mixsim_core::{
    FanOutPolicy, NodeId, SimulationConfig, SimulationError, SimulationErrorCode, create_network,
    simulate_adversary_correlation, simulate_packet_flow,
};
use mixsim_test_support::fixtures;
use rand::{SeedableRng, rngs::SmallRng};
use rstest::rstest;

#[rstest]
#[case::layers(
    SimulationError::InvalidLayerCount { got: 0 },
    "MIXSIM_INVALID_LAYER_COUNT",
)]
#[case::nodes(
    SimulationError::InsufficientNodes { nodes: 2, layers: 3 },
    "MIXSIM_INSUFFICIENT_NODES",
)]
#[case::coverage(
    SimulationError::InvalidAdversaryCoverage { got: 2.0 },
    "MIXSIM_INVALID_ADVERSARY_COVERAGE",
)]
#[case::latency(
    SimulationError::InvalidMeanLatency { got: -1.0 },
    "MIXSIM_INVALID_MEAN_LATENCY",
)]
#[case::width(
    SimulationError::InsufficientLayerWidth { layer_width: 2, required: 5 },
    "MIXSIM_INSUFFICIENT_LAYER_WIDTH",
)]
#[case::unknown(
    SimulationError::UnknownNode { node: NodeId::new(9), node_count: 4 },
    "MIXSIM_UNKNOWN_NODE",
)]
#[case::monitored(
    SimulationError::TooManyMonitoredNodes { requested: 5, node_count: 4 },
    "MIXSIM_TOO_MANY_MONITORED_NODES",
)]
fn error_codes_are_stable(#[case] error: SimulationError, #[case] code: &str) {
    assert_eq!(error.code().as_str(), code);
    assert_eq!(error.code().to_string(), code);
}

#[test]
fn messages_name_the_offending_values() {
    let err = SimulationError::InsufficientNodes {
        nodes: 2,
        layers: 3,
    };
    assert_eq!(err.to_string(), "num_nodes (2) must be at least num_layers (3)");

    let err = SimulationError::UnknownNode {
        node: NodeId::new(9),
        node_count: 4,
    };
    assert_eq!(
        err.to_string(),
        "node 9 is not part of a topology with 4 nodes"
    );
}

#[test]
fn invalid_configuration_fails_before_generation() {
    let err = SimulationConfig::builder()
        .with_num_nodes(0)
        .with_num_layers(0)
        .build()
        .expect_err("zero layers must be rejected");
    assert_eq!(err.code(), SimulationErrorCode::InvalidLayerCount);
}

#[test]
fn strict_fan_out_rejects_narrow_layers() {
    let err = SimulationConfig::builder()
        .with_num_nodes(20)
        .with_num_layers(5)
        .with_fan_out_policy(FanOutPolicy::Strict)
        .build()
        .expect_err("four-node layers are too narrow");
    assert_eq!(err.code(), SimulationErrorCode::InsufficientLayerWidth);
}

#[test]
fn routing_and_correlation_reject_out_of_range_inputs() {
    let config = fixtures::layered(3, 5, 1);
    let mut rng = SmallRng::seed_from_u64(1);
    let topology = create_network(&config, &mut rng).expect("generation must succeed");

    let err = simulate_packet_flow(&topology, NodeId::new(15), NodeId::new(0))
        .expect_err("node 15 does not exist");
    assert_eq!(err.code(), SimulationErrorCode::UnknownNode);

    let err = simulate_adversary_correlation(&topology, 16, &mut rng)
        .expect_err("only fifteen nodes exist");
    assert_eq!(err.code(), SimulationErrorCode::TooManyMonitoredNodes);
}
