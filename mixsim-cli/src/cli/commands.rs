//! Command implementations and argument parsing for the mixsim CLI.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use mixsim_core::{
    AnonymityLevel, DEFAULT_ADVERSARY_COVERAGE, DEFAULT_MEAN_EDGE_LATENCY, DEFAULT_NUM_LAYERS,
    DEFAULT_NUM_NODES, DEFAULT_NUM_PACKETS, DEFAULT_SEED, DEFAULT_SIMULATION_DURATION,
    FanOutPolicy, MetricsReport, SecurityAnalysis, SimulationConfig, SimulationConfigBuilder,
    SimulationError, Simulator, Topology, render,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{Span, field, info, instrument};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "mixsim",
    about = "Simulate traffic through a stratified mixnet and measure anonymity."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a simulation and print the anonymity report.
    Run(RunCommand),
    /// Generate a topology and write it as Graphviz DOT.
    Topology(TopologyCommand),
}

/// Flags shaping the generated network, shared by every command.
#[derive(Debug, Args, Clone)]
pub struct NetworkArgs {
    /// Total number of mix nodes.
    #[arg(long = "nodes", default_value_t = DEFAULT_NUM_NODES)]
    pub nodes: usize,

    /// Number of layers packets traverse.
    #[arg(long = "layers", default_value_t = DEFAULT_NUM_LAYERS)]
    pub layers: usize,

    /// Seed for every random choice made by the run.
    #[arg(long = "seed", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Mean of the exponential edge latency distribution.
    #[arg(long = "mean-latency", default_value_t = DEFAULT_MEAN_EDGE_LATENCY)]
    pub mean_latency: f64,

    /// Behaviour when a layer is narrower than the sampled fan-out.
    #[arg(long = "fan-out-policy", value_enum, default_value_t = FanOutArg::Clamp)]
    pub fan_out_policy: FanOutArg,
}

impl NetworkArgs {
    fn builder(&self) -> SimulationConfigBuilder {
        SimulationConfig::builder()
            .with_num_nodes(self.nodes)
            .with_num_layers(self.layers)
            .with_seed(self.seed)
            .with_mean_edge_latency(self.mean_latency)
            .with_fan_out_policy(self.fan_out_policy.into())
    }
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Network shape.
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Number of packets to route.
    #[arg(long = "packets", default_value_t = DEFAULT_NUM_PACKETS)]
    pub packets: usize,

    /// Fraction of nodes the passive adversary observes.
    #[arg(long = "adversary-coverage", default_value_t = DEFAULT_ADVERSARY_COVERAGE)]
    pub adversary_coverage: f64,

    /// Nominal duration of the simulated period in seconds.
    #[arg(long = "duration", default_value_t = DEFAULT_SIMULATION_DURATION)]
    pub duration: u64,

    /// Report format written to stdout.
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Options accepted by the `topology` command.
#[derive(Debug, Args, Clone)]
pub struct TopologyCommand {
    /// Network shape.
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Destination file for the DOT rendering (stdout when omitted).
    #[arg(long = "output")]
    pub output: Option<PathBuf>,
}

/// Fan-out policies selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FanOutArg {
    /// Cap the fan-out at the layer width.
    Clamp,
    /// Reject layers narrower than the largest fan-out.
    Strict,
}

impl From<FanOutArg> for FanOutPolicy {
    fn from(value: FanOutArg) -> Self {
        match value {
            FanOutArg::Clamp => Self::Clamp,
            FanOutArg::Strict => Self::Strict,
        }
    }
}

/// Report formats supported by `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Console summary with a security analysis section.
    #[default]
    Human,
    /// Pretty-printed JSON document.
    Json,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Writing an output file failed.
    #[error("failed to write `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// Configuring or running the simulation failed.
    #[error(transparent)]
    Core(#[from] SimulationError),
}

/// Outcome of a `run` command.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Validated configuration the simulation ran with.
    pub config: SimulationConfig,
    /// Metrics gathered by the run.
    pub report: MetricsReport,
    /// Requested output format.
    pub format: OutputFormat,
}

/// Outcome of a `topology` command.
#[derive(Debug, Clone)]
pub struct TopologySummary {
    /// The generated network.
    pub topology: Topology,
    /// File the DOT rendering was written to, if any.
    pub output: Option<PathBuf>,
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub enum ExecutionSummary {
    /// A simulation report.
    Run(RunSummary),
    /// A rendered topology.
    Topology(TopologySummary),
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when the configuration is invalid, the simulation
/// fails, or an output file cannot be written.
///
/// # Examples
/// ```
/// use clap::Parser;
/// use mixsim_cli::cli::{Cli, ExecutionSummary, run_cli};
///
/// let cli = Cli::parse_from(["mixsim", "run", "--nodes", "30", "--layers", "3", "--packets", "50"]);
/// let summary = run_cli(cli).expect("simulation must succeed");
/// let ExecutionSummary::Run(run) = summary else {
///     panic!("run produces a report");
/// };
/// assert!(run.report.anonymity_set <= 30);
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Run(run) => {
            Span::current().record("command", field::display("run"));
            run_command(run).map(ExecutionSummary::Run)
        }
        Command::Topology(topology) => {
            Span::current().record("command", field::display("topology"));
            topology_command(topology).map(ExecutionSummary::Topology)
        }
    }
}

#[instrument(
    name = "cli.execute",
    err,
    skip(command),
    fields(nodes = command.network.nodes, layers = command.network.layers, seed = command.network.seed),
)]
pub(super) fn run_command(command: RunCommand) -> Result<RunSummary, CliError> {
    let config = command
        .network
        .builder()
        .with_num_packets(command.packets)
        .with_adversary_coverage(command.adversary_coverage)
        .with_simulation_duration(command.duration)
        .build()?;

    let mut simulator = Simulator::new(config)?;
    let report = simulator.run()?;
    info!(
        anonymity_set = report.anonymity_set,
        correlation_rate = report.correlation_rate,
        "command completed"
    );
    Ok(RunSummary {
        config: simulator.config().clone(),
        report,
        format: command.format,
    })
}

#[instrument(
    name = "cli.topology",
    err,
    skip(command),
    fields(output = field::Empty),
)]
pub(super) fn topology_command(command: TopologyCommand) -> Result<TopologySummary, CliError> {
    let config = command.network.builder().build()?;
    let topology = Simulator::new(config)?.topology().clone();

    if let Some(path) = command.output.as_deref() {
        Span::current().record("output", field::display(path.display()));
        write_dot_file(&topology, path)?;
    }
    info!(
        nodes = topology.node_count(),
        edges = topology.edge_count(),
        "topology generated"
    );
    Ok(TopologySummary {
        topology,
        output: command.output,
    })
}

fn write_dot_file(topology: &Topology, path: &Path) -> Result<(), CliError> {
    let to_cli_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_cli_error)?;
    let mut writer = BufWriter::new(file);
    render::write_dot(topology, &mut writer).map_err(to_cli_error)?;
    writer.flush().map_err(to_cli_error)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    config: &'a SimulationConfig,
    report: &'a MetricsReport,
    anonymity_level: AnonymityLevel,
    security_analysis: SecurityAnalysis,
}

/// Renders `summary` to `writer`.
///
/// Reports use the format requested on the command line. Topologies are
/// written as DOT unless they already went to a file, in which case a one-line
/// confirmation is printed.
///
/// # Errors
/// Returns [`io::Error`] if writing to `writer` or serialising JSON fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary {
        ExecutionSummary::Run(run) => match run.format {
            OutputFormat::Human => render_human(run, writer),
            OutputFormat::Json => {
                let document = JsonReport {
                    config: &run.config,
                    report: &run.report,
                    anonymity_level: run.report.anonymity_level(),
                    security_analysis: run.report.security_analysis(),
                };
                serde_json::to_writer_pretty(&mut writer, &document)?;
                writeln!(writer)
            }
        },
        ExecutionSummary::Topology(topology) => match &topology.output {
            Some(path) => writeln!(
                writer,
                "wrote {} nodes and {} edges to {}",
                topology.topology.node_count(),
                topology.topology.edge_count(),
                path.display()
            ),
            None => render::write_dot(&topology.topology, writer),
        },
    }
}

fn render_human(run: &RunSummary, mut writer: impl Write) -> io::Result<()> {
    let RunSummary { config, report, .. } = run;
    let analysis = report.security_analysis();
    let coverage = percent(config.adversary_coverage());

    writeln!(
        writer,
        "Nodes: {}, Layers: {}",
        config.num_nodes(),
        config.num_layers()
    )?;
    writeln!(writer, "Adversary coverage: {coverage:.1}%")?;
    writeln!(writer)?;
    writeln!(writer, "=== SIMULATION RESULTS ===")?;
    writeln!(writer, "Anonymity Set Size: {}", report.anonymity_set)?;
    writeln!(writer, "Traffic Entropy: {:.2} bits", report.entropy)?;
    writeln!(
        writer,
        "Correlation Success Rate: {:.1}%",
        percent(report.correlation_rate)
    )?;
    writeln!(writer, "Average Latency: {:.2} ms", report.avg_latency)?;
    writeln!(writer, "Anonymity Level: {}", report.anonymity_level())?;
    writeln!(writer)?;
    writeln!(writer, "=== SECURITY ANALYSIS ===")?;
    writeln!(writer, "Against {coverage:.0}% passive adversary:")?;
    writeln!(writer, "- Unlinkability: {}", analysis.unlinkability)?;
    writeln!(writer, "- Unobservability: {}", analysis.unobservability)?;
    writeln!(writer, "- Resistance: {:.1}%", percent(analysis.resistance))
}

#[expect(clippy::float_arithmetic, reason = "display scaling only")]
fn percent(fraction: f64) -> f64 {
    fraction * 100.0
}
