//! Command-line interface for the mixsim anonymity simulator.
//!
//! `run` executes a simulation and prints its report; `topology` renders a
//! generated network as Graphviz DOT.

mod commands;

pub use commands::{
    Cli, CliError, Command, ExecutionSummary, FanOutArg, NetworkArgs, OutputFormat, RunCommand,
    RunSummary, TopologyCommand, TopologySummary, render_summary, run_cli,
};
