//! Observation encoding for room agents.
//!
//! Each agent kind has its own fixed-size vector; the coordinator returns
//! one vector per roster agent, in roster order.

use crate::agent::{Agent, AgentKind, ParentSnapshot};
use crate::types::{Aabb, Vec2};

/// Builds observation vectors for agents.
pub struct ObservationBuilder;

impl ObservationBuilder {
    /// Length of a furniture observation.
    pub const FURNITURE_DIM: usize = 8;
    /// Length of a child observation.
    pub const CHILD_DIM: usize = 11;

    /// Builds the observation vector for one agent.
    ///
    /// Furniture:
    /// ```text
    /// [size.x, size.z, forward.x, forward.z, last_dot,
    ///  wall_forward.x, wall_forward.z, target_distance]
    /// ```
    ///
    /// Child:
    /// ```text
    /// [rel_pos.x, rel_pos.z, forward.x, forward.z, size.x, size.z,
    ///  parent_size.x, parent_size.z, target_distance, parent_distance, facing_dot]
    /// ```
    ///
    /// `rel_pos` is relative to the floor centre. Parent features are zero
    /// while the parent is unresolved.
    pub fn build(agent: &Agent, parent: Option<&ParentSnapshot>, floor: &Aabb) -> Vec<f64> {
        let size = agent.body.footprint.size();
        let forward = agent.body.forward();
        match &agent.kind {
            AgentKind::Furniture(f) => vec![
                size.x,
                size.z,
                forward.x,
                forward.z,
                f.last_dot,
                f.last_wall_forward.x,
                f.last_wall_forward.z,
                agent.spec.target_distance,
            ],
            AgentKind::Child(c) => {
                let rel = agent.body.position - floor.center();
                let parent_size = parent.map_or(Vec2::zero(), |p| p.size);
                vec![
                    rel.x,
                    rel.z,
                    forward.x,
                    forward.z,
                    size.x,
                    size.z,
                    parent_size.x,
                    parent_size.z,
                    agent.spec.target_distance,
                    c.current_distance,
                    c.last_facing_dot,
                ]
            }
        }
    }

    /// Observation length for an agent of this kind.
    pub fn dim(agent: &Agent) -> usize {
        match agent.kind {
            AgentKind::Furniture(_) => Self::FURNITURE_DIM,
            AgentKind::Child(_) => Self::CHILD_DIM,
        }
    }
}
