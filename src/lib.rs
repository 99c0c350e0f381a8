//! furnish - multi-agent furniture placement environment
//!
//! Agents learn to place themselves inside a walled room: furniture backs
//! onto the nearest wall at a target gap, and child objects (chairs, lamps)
//! settle around a parent agent. A room coordinator steps every agent,
//! shapes rewards per phase, aggregates a shared group reward and decides
//! episode boundaries for an external learner.

pub mod agent;
pub mod config;
pub mod error;
pub mod group;
pub mod metrics;
pub mod observation;
pub mod placement;
pub mod policy;
pub mod relation;
pub mod room;
pub mod scene;
pub mod services;
pub mod spatial;
pub mod types;

/// Identifier type used for agents and shapes.
pub type Id = String;

/// Generates a new unique identifier (UUID v4).
pub fn generate_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
