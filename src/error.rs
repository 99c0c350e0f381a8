use thiserror::Error;

use crate::types::Aabb;

/// Invalid room or reward configuration. Fatal to the component being built.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Room floor bounds are degenerate: {0}")]
    DegenerateFloor(Aabb),

    #[error("Maximum environment steps must be positive")]
    ZeroStepBudget,

    #[error("Placement retry budget must be positive")]
    ZeroPlacementAttempts,

    #[error("Invalid value for {field}: {value}")]
    InvalidParameter { field: &'static str, value: f64 },

    #[error("Agent {agent} has an invalid footprint {width} x {depth}")]
    InvalidFootprint { agent: String, width: f64, depth: f64 },
}

/// Fault that leaves a single agent inert for the episode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent {0} has no wall colliders to target")]
    MissingWalls(String),
}

/// Parent lookup miss. Recovered locally and retried later.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("No parent relation recorded for child prefix '{0}'")]
    UnknownChildPrefix(String),

    #[error("No live parent with prefix '{0}'")]
    ParentNotFound(String),

    #[error("Child {0} has no recorded parent prefix")]
    MissingPrefix(String),
}

/// Failure reported by a scene capture backend.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture backend unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to write capture: {0}")]
    Io(#[from] std::io::Error),
}
