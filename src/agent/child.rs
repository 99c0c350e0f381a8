//! Child agents placed relative to a parent agent instead of a wall.

use tracing::debug;

use super::{Body, PhaseSignal, StepContext};
use crate::config::{ChildSettings, RewardSpec};
use crate::relation::name_prefix;
use crate::types::Vec2;
use crate::Id;

/// What a child needs to know about its parent for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentSnapshot {
    pub id: Id,
    pub position: Vec2,
    /// Footprint size of the parent.
    pub size: Vec2,
}

#[derive(Debug, Clone)]
pub struct ChildState {
    /// Live parent binding. Stale after the parent is replaced.
    pub parent: Option<Id>,
    pub parent_name: Option<String>,
    /// Prefix used to re-resolve the parent after replacement.
    pub parent_prefix: Option<String>,
    /// Centre distance to the parent from the last step.
    pub current_distance: f64,
    pub last_facing_dot: f64,
    pub settings: ChildSettings,
}

impl ChildState {
    pub fn new(settings: ChildSettings, parent_name: Option<String>) -> Self {
        let parent_prefix = parent_name.as_deref().map(|n| name_prefix(n).to_string());
        Self {
            parent: None,
            parent_name,
            parent_prefix,
            current_distance: 0.0,
            last_facing_dot: 0.0,
            settings,
        }
    }

    pub(super) fn reset(&mut self) {
        self.current_distance = 0.0;
        self.last_facing_dot = 0.0;
    }

    /// Binds the child to a live parent and records its prefix.
    pub fn bind(&mut self, parent_id: Id, parent_name: &str) {
        self.parent = Some(parent_id);
        self.parent_prefix = Some(name_prefix(parent_name).to_string());
        self.parent_name = Some(parent_name.to_string());
    }

    /// Drops the live binding but keeps the prefix for re-resolution.
    pub fn unbind(&mut self) {
        self.parent = None;
    }

    pub(super) fn act(
        &mut self,
        body: &mut Body,
        spec: &RewardSpec,
        ctx: &StepContext<'_>,
    ) -> Option<PhaseSignal> {
        let time_cost = ctx.config.time_cost();
        let Some(parent) = ctx.parent.as_ref() else {
            debug!(agent = %body.name, "no parent bound");
            body.add_reward(-time_cost);
            return None;
        };

        let offset = parent.position - body.position;
        let distance = offset.length();
        self.current_distance = distance;

        let error = (distance - spec.target_distance).abs();
        let within = error <= spec.freeze_tolerance;
        if within {
            body.add_reward(spec.w_dist);
        } else {
            body.add_reward(-error * spec.w_dist);
        }

        let facing = body.forward().normalized().dot(&offset.normalized());
        self.last_facing_dot = facing;
        if facing > 0.0 {
            body.add_reward(facing * spec.w_angle);
        } else {
            body.add_reward(facing * self.settings.w_angle_away);
        }

        if within && facing > spec.angle_threshold_cos {
            body.add_reward(spec.success_bonus);
            body.frozen = true;
            debug!(agent = %body.name, distance, facing, "child placed");
            return Some(PhaseSignal::ChildCompleted);
        }

        body.add_reward(-time_cost);
        None
    }
}
