//! Mixsim core library.
//!
//! Builds synthetic stratified mixnet topologies, routes synthetic traffic
//! through them, and measures anonymity: anonymity-set size, traffic entropy,
//! adversarial correlation success rate and end-to-end latency.
//!
//! Every random choice is drawn from a caller-supplied random source, so a
//! fixed seed reproduces a run exactly.
//!
//! # Metrics
//!
//! When the `metrics` feature is enabled the driver emits:
//!
//! - `simulation_packets_routed` (counter)
//! - `simulation_packets_unroutable` (counter)
//! - `simulation_route_latency` (histogram, simulated time units)
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod error;
mod flow;
mod metrics;
pub mod render;
mod report;
mod simulator;
mod topology;

pub use crate::{
    config::{
        DEFAULT_ADVERSARY_COVERAGE, DEFAULT_MEAN_EDGE_LATENCY, DEFAULT_NUM_LAYERS,
        DEFAULT_NUM_NODES, DEFAULT_NUM_PACKETS, DEFAULT_SEED, DEFAULT_SIMULATION_DURATION,
        FanOutPolicy, SimulationConfig, SimulationConfigBuilder,
    },
    error::{Result, SimulationError, SimulationErrorCode},
    flow::{Flow, Route, simulate_packet_flow},
    metrics::{
        CORRELATION_THRESHOLD, CORRELATION_TRIALS, calculate_anonymity_set, calculate_entropy,
        simulate_adversary_correlation,
    },
    report::{
        AnonymityLevel, HIGH_ANONYMITY_THRESHOLD, MEDIUM_ANONYMITY_THRESHOLD, MetricsReport,
        STRONG_UNLINKABILITY_THRESHOLD, STRONG_UNOBSERVABILITY_ENTROPY, SecurityAnalysis,
        Strength,
    },
    simulator::{Simulator, run_simulation, run_simulation_with_rng},
    topology::{
        Edge, MAX_FAN_OUT, MAX_REPUTATION, MIN_FAN_OUT, MIN_REPUTATION, Node, NodeId, Topology,
        create_network,
    },
};
