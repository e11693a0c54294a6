//! Error types for the mixsim core library.
//!
//! Defines the error enum exposed by the public API, its stable codes, and a
//! convenient result alias.

use std::fmt;

use thiserror::Error;

use crate::topology::NodeId;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Error type produced when configuring or running a simulation.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimulationError {
    /// The topology needs at least one layer.
    #[error("num_layers must be at least 1 (got {got})")]
    InvalidLayerCount {
        /// The invalid layer count supplied by the caller.
        got: usize,
    },
    /// Every layer needs at least one node.
    #[error("num_nodes ({nodes}) must be at least num_layers ({layers})")]
    InsufficientNodes {
        /// Requested node count.
        nodes: usize,
        /// Requested layer count.
        layers: usize,
    },
    /// Adversary coverage must be a finite fraction in `[0, 1]`.
    #[error("adversary_coverage must be within [0, 1] (got {got})")]
    InvalidAdversaryCoverage {
        /// The rejected coverage value.
        got: f64,
    },
    /// Edge latencies need a finite, strictly positive mean.
    #[error("mean_edge_latency must be finite and positive (got {got})")]
    InvalidMeanLatency {
        /// The rejected mean latency.
        got: f64,
    },
    /// Layers are too narrow to sample the requested fan-out under the
    /// strict fan-out policy.
    #[error("layer width {layer_width} cannot host a fan-out of up to {required} distinct targets")]
    InsufficientLayerWidth {
        /// Number of nodes in each layer.
        layer_width: usize,
        /// Largest fan-out the generator may request.
        required: usize,
    },
    /// A node identifier does not exist in the topology.
    #[error("node {node} is not part of a topology with {node_count} nodes")]
    UnknownNode {
        /// The identifier that was looked up.
        node: NodeId,
        /// Number of nodes in the topology.
        node_count: usize,
    },
    /// The adversary was asked to monitor more nodes than exist.
    #[error("cannot monitor {requested} nodes in a topology with {node_count} nodes")]
    TooManyMonitoredNodes {
        /// Requested number of monitored nodes.
        requested: usize,
        /// Number of nodes in the topology.
        node_count: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`SimulationError`] variants.
    enum SimulationErrorCode for SimulationError {
        /// The topology needs at least one layer.
        InvalidLayerCount => InvalidLayerCount { .. } => "MIXSIM_INVALID_LAYER_COUNT",
        /// Every layer needs at least one node.
        InsufficientNodes => InsufficientNodes { .. } => "MIXSIM_INSUFFICIENT_NODES",
        /// Adversary coverage must be a finite fraction in `[0, 1]`.
        InvalidAdversaryCoverage => InvalidAdversaryCoverage { .. } => "MIXSIM_INVALID_ADVERSARY_COVERAGE",
        /// Edge latencies need a finite, strictly positive mean.
        InvalidMeanLatency => InvalidMeanLatency { .. } => "MIXSIM_INVALID_MEAN_LATENCY",
        /// Layers are too narrow for the strict fan-out policy.
        InsufficientLayerWidth => InsufficientLayerWidth { .. } => "MIXSIM_INSUFFICIENT_LAYER_WIDTH",
        /// A node identifier does not exist in the topology.
        UnknownNode => UnknownNode { .. } => "MIXSIM_UNKNOWN_NODE",
        /// The adversary was asked to monitor more nodes than exist.
        TooManyMonitoredNodes => TooManyMonitoredNodes { .. } => "MIXSIM_TOO_MANY_MONITORED_NODES",
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, SimulationError>;
