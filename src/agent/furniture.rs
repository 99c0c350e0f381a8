//! Two-phase wall placement for furniture agents.
//!
//! - **Positioning**: lock the nearest wall and move until the gap to it is
//!   within `target_distance ± freeze_tolerance`.
//! - **Aligning**: snap rotations relative to the locked wall until the
//!   agent's forward matches the wall's, then freeze.

use tracing::debug;

use super::{AgentAction, Body, PhaseSignal, Pose, StepContext};
use crate::config::{FurnitureSettings, RewardSpec};
use crate::spatial::{nearest_wall, shape_distance, Layer, SpatialQuery, WallInfo};
use crate::types::Vec2;
use crate::Id;

/// Phase of the placement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Positioning,
    Aligning,
}

/// Outcome of a contact between two furniture agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactReaction {
    /// A mobile agent bumped a frozen one: penalised and turned around.
    Blocked,
    /// A frozen agent was bumped: unfrozen and back to Positioning.
    Yielded,
}

/// Live state of a furniture agent.
#[derive(Debug, Clone)]
pub struct FurnitureState {
    pub phase: Phase,
    /// Wall locked for the current attempt.
    pub target_wall: Option<Id>,
    /// Consecutive steps with negligible displacement.
    pub frustration: u32,
    last_position: Vec2,
    /// Forward dot product from the last Aligning step.
    pub last_dot: f64,
    /// Forward of the locked wall from the last Aligning step.
    pub last_wall_forward: Vec2,
    pub wall_info: Option<WallInfo>,
    pub settings: FurnitureSettings,
}

impl FurnitureState {
    pub fn new(settings: FurnitureSettings) -> Self {
        Self {
            phase: Phase::Positioning,
            target_wall: None,
            frustration: 0,
            last_position: Vec2::zero(),
            last_dot: 0.0,
            last_wall_forward: Vec2::zero(),
            wall_info: None,
            settings,
        }
    }

    pub(super) fn reset(&mut self, position: Vec2) {
        self.phase = Phase::Positioning;
        self.target_wall = None;
        self.frustration = 0;
        self.last_position = position;
        self.last_dot = 0.0;
        self.last_wall_forward = Vec2::zero();
        self.wall_info = None;
    }

    pub(super) fn plan_motion(
        &self,
        body: &Body,
        action: AgentAction,
        world: &dyn SpatialQuery,
        step_length: f64,
    ) -> Option<Pose> {
        match self.phase {
            Phase::Positioning => body.translated(action.movement, step_length),
            Phase::Aligning => {
                let wall_forward = world.forward_of(self.target_wall.as_deref()?)?;
                let yaw = wall_forward.yaw() + action.rotation.offset();
                Some(Pose {
                    position: body.position,
                    yaw,
                })
            }
        }
    }

    /// Repulsion penalty from the nearest other furniture within
    /// `social_distance`: zero at the radius, maximal at zero distance.
    pub fn social_penalty(&self, body: &Body, world: &dyn SpatialQuery) -> f64 {
        let radius = self.settings.social_distance;
        let nearest = world
            .overlap_circle(body.position, radius, Layer::Furniture)
            .into_iter()
            .filter(|id| *id != body.id)
            .filter_map(|id| world.bounds_of(&id))
            .map(|b| b.center().distance_to(&body.position))
            .fold(f64::INFINITY, f64::min);
        if !nearest.is_finite() {
            return 0.0;
        }
        let ratio = (1.0 - nearest / radius).clamp(0.0, 1.0);
        -ratio * self.settings.repulsion_penalty
    }

    pub(super) fn act(
        &mut self,
        body: &mut Body,
        spec: &RewardSpec,
        ctx: &StepContext<'_>,
    ) -> Option<PhaseSignal> {
        let repulsion = self.social_penalty(body, ctx.world);
        if repulsion != 0.0 {
            body.add_reward(repulsion);
        }
        match self.phase {
            Phase::Positioning => self.positioning(body, spec, ctx),
            Phase::Aligning => self.aligning(body, spec, ctx),
        }
    }

    fn positioning(
        &mut self,
        body: &mut Body,
        spec: &RewardSpec,
        ctx: &StepContext<'_>,
    ) -> Option<PhaseSignal> {
        if self.target_wall.is_none() {
            self.target_wall = nearest_wall(ctx.world, &body.id).map(|w| w.wall);
        }
        let wall = self.target_wall.clone()?;
        let Some(distance) = shape_distance(ctx.world, &body.id, &wall) else {
            self.target_wall = None;
            return None;
        };
        self.wall_info = Some(WallInfo {
            distance,
            normal: ctx.world.forward_of(&wall).unwrap_or_default(),
            wall,
        });

        if body.position.distance_to(&self.last_position) < self.settings.stuck_epsilon {
            self.frustration += 1;
        } else {
            self.frustration = 0;
        }
        self.last_position = body.position;

        if self.frustration > self.settings.frustration_threshold {
            body.add_reward(-self.settings.frustration_penalty);
            self.target_wall = None;
            body.turn_around();
            self.frustration = 0;
            debug!(agent = %body.name, "frustrated, releasing wall and turning around");
            return Some(PhaseSignal::Escaped);
        }

        if (distance - spec.target_distance).abs() <= spec.freeze_tolerance {
            self.phase = Phase::Aligning;
            body.add_reward(self.settings.aligning_bonus);
            debug!(agent = %body.name, distance, "entered aligning phase");
            return Some(PhaseSignal::EnteredAligning);
        }

        if distance < self.settings.min_clearance {
            body.add_reward(-self.settings.clearance_penalty);
        } else {
            body.add_reward(-ctx.config.time_cost());
        }
        None
    }

    fn aligning(
        &mut self,
        body: &mut Body,
        spec: &RewardSpec,
        ctx: &StepContext<'_>,
    ) -> Option<PhaseSignal> {
        let wall_forward = self
            .target_wall
            .as_deref()
            .and_then(|w| ctx.world.forward_of(w));
        let (Some(wall), Some(wall_forward)) = (self.target_wall.clone(), wall_forward) else {
            debug!(agent = %body.name, "lost locked wall, back to positioning");
            self.phase = Phase::Positioning;
            self.target_wall = None;
            return None;
        };

        if let Some(distance) = shape_distance(ctx.world, &body.id, &wall) {
            self.wall_info = Some(WallInfo {
                distance,
                normal: wall_forward,
                wall,
            });
        }

        let agent_forward = body.forward().normalized();
        let wall_forward = wall_forward.normalized();
        let dot = agent_forward.dot(&wall_forward);
        self.last_dot = dot;
        self.last_wall_forward = wall_forward;

        body.add_reward(-ctx.config.time_cost());
        body.add_reward(dot * spec.w_angle);

        if dot > spec.angle_threshold_cos {
            body.add_reward(spec.success_bonus);
            body.frozen = true;
            debug!(agent = %body.name, dot, "aligned and frozen");
            return Some(PhaseSignal::Frozen);
        }
        None
    }

    pub(super) fn on_contact(&mut self, body: &mut Body, other_frozen: bool) -> Option<ContactReaction> {
        if !body.frozen && other_frozen {
            body.add_reward(-self.settings.blocking_penalty);
            body.turn_around();
            Some(ContactReaction::Blocked)
        } else if body.frozen && !other_frozen {
            body.frozen = false;
            self.phase = Phase::Positioning;
            self.frustration = 0;
            self.last_position = body.position;
            body.add_reward(-self.settings.yield_penalty);
            Some(ContactReaction::Yielded)
        } else {
            None
        }
    }
}
