//! Agents and their per-step dynamics.
//!
//! Every agent shares a [`Body`] (pose, footprint, freeze flag, reward
//! ledger) and carries one of two behaviours in [`AgentKind`]:
//!
//! - [`FurnitureState`]: the two-phase Positioning → Aligning machine that
//!   targets the nearest wall.
//! - [`ChildState`]: a single-state controller that targets a parent agent.
//!
//! The room coordinator drives each agent once per tick through
//! [`Agent::plan_motion`] and [`Agent::act`].

pub mod child;
pub mod furniture;

pub use child::{ChildState, ParentSnapshot};
pub use furniture::{ContactReaction, FurnitureState, Phase};

use tracing::error;

use crate::config::{ChildSettings, FurnitureSettings, RewardSpec, RoomConfig};
use crate::error::AgentError;
use crate::spatial::{Collider, Layer, SpatialQuery};
use crate::types::{normalize_yaw, Aabb, Footprint, Vec2};
use crate::{generate_id, Id};

/// Translation branch of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Movement {
    #[default]
    Idle,
    Forward,
    Backward,
    Left,
    Right,
}

impl Movement {
    /// Maps a discrete branch value (`0..=4`); out-of-range values idle.
    pub fn from_index(i: usize) -> Self {
        match i {
            1 => Movement::Forward,
            2 => Movement::Backward,
            3 => Movement::Left,
            4 => Movement::Right,
            _ => Movement::Idle,
        }
    }

    pub const COUNT: usize = 5;
}

/// Rotation branch of an action, relative to the locked wall's forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Wall,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    /// Maps a discrete branch value (`0..=3`); out-of-range values use `Wall`.
    pub fn from_index(i: usize) -> Self {
        match i {
            1 => Rotation::Quarter,
            2 => Rotation::Half,
            3 => Rotation::ThreeQuarter,
            _ => Rotation::Wall,
        }
    }

    /// Yaw offset in degrees.
    pub fn offset(&self) -> f64 {
        match self {
            Rotation::Wall => 0.0,
            Rotation::Quarter => 90.0,
            Rotation::Half => 180.0,
            Rotation::ThreeQuarter => -90.0,
        }
    }

    pub const COUNT: usize = 4;
}

/// One agent's action for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgentAction {
    pub movement: Movement,
    pub rotation: Rotation,
}

impl AgentAction {
    pub fn new(movement: Movement, rotation: Rotation) -> Self {
        Self { movement, rotation }
    }

    /// Builds an action from the two discrete branch values.
    pub fn from_discrete(movement: usize, rotation: usize) -> Self {
        Self::new(Movement::from_index(movement), Rotation::from_index(rotation))
    }

    pub fn idle() -> Self {
        Self::default()
    }
}

/// A position and yaw on the floor plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec2,
    pub yaw: f64,
}

/// Observable state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentStatus {
    Positioning,
    Aligning,
    /// Child agent working toward its parent.
    Relating,
    Frozen,
    Disabled,
}

/// Event reported upward by an agent's step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseSignal {
    EnteredAligning,
    /// Frustration escape: wall unlocked and agent turned around.
    Escaped,
    Frozen,
    ChildCompleted,
}

/// Inputs an agent reads during [`Agent::act`].
pub struct StepContext<'a> {
    pub world: &'a dyn SpatialQuery,
    pub config: &'a RoomConfig,
    /// Resolved parent for child agents.
    pub parent: Option<ParentSnapshot>,
}

/// State shared by every agent kind.
#[derive(Debug, Clone)]
pub struct Body {
    pub id: Id,
    pub name: String,
    pub position: Vec2,
    /// Yaw in degrees, `[0, 360)`.
    pub yaw: f64,
    pub footprint: Footprint,
    /// Kinematics locked; no further actions or reward this episode.
    pub frozen: bool,
    step_reward: f64,
    episode_reward: f64,
}

impl Body {
    fn new(name: String, footprint: Footprint) -> Self {
        Self {
            id: generate_id(),
            name,
            position: Vec2::zero(),
            yaw: 0.0,
            footprint,
            frozen: false,
            step_reward: 0.0,
            episode_reward: 0.0,
        }
    }

    pub fn forward(&self) -> Vec2 {
        Vec2::from_yaw(self.yaw)
    }

    pub fn right(&self) -> Vec2 {
        Vec2::from_yaw(self.yaw + 90.0)
    }

    pub fn bounds(&self) -> Aabb {
        self.footprint.bounds_at(self.position, self.yaw)
    }

    pub fn add_reward(&mut self, delta: f64) {
        self.step_reward += delta;
        self.episode_reward += delta;
    }

    /// Rotates the agent by 180°.
    pub fn turn_around(&mut self) {
        self.yaw = normalize_yaw(self.yaw + 180.0);
    }

    /// Pose reached by translating one step along `movement`.
    fn translated(&self, movement: Movement, step_length: f64) -> Option<Pose> {
        let dir = match movement {
            Movement::Idle => return None,
            Movement::Forward => self.forward(),
            Movement::Backward => -self.forward(),
            Movement::Left => -self.right(),
            Movement::Right => self.right(),
        };
        Some(Pose {
            position: self.position + dir * step_length,
            yaw: self.yaw,
        })
    }
}

/// Behaviour variant of an agent.
#[derive(Debug, Clone)]
pub enum AgentKind {
    Furniture(FurnitureState),
    Child(ChildState),
}

/// A simulated agent.
#[derive(Debug, Clone)]
pub struct Agent {
    pub body: Body,
    pub spec: RewardSpec,
    pub kind: AgentKind,
    disabled: Option<AgentError>,
}

impl Agent {
    /// Creates a wall-targeting furniture agent.
    pub fn furniture(
        name: impl Into<String>,
        footprint: Footprint,
        spec: RewardSpec,
        settings: FurnitureSettings,
    ) -> Self {
        Self {
            body: Body::new(name.into(), footprint),
            spec,
            kind: AgentKind::Furniture(FurnitureState::new(settings)),
            disabled: None,
        }
    }

    /// Creates a child agent, optionally naming its parent object.
    pub fn child(
        name: impl Into<String>,
        footprint: Footprint,
        spec: RewardSpec,
        settings: ChildSettings,
        parent_name: Option<String>,
    ) -> Self {
        Self {
            body: Body::new(name.into(), footprint),
            spec,
            kind: AgentKind::Child(ChildState::new(settings, parent_name)),
            disabled: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.body.id
    }

    pub fn name(&self) -> &str {
        &self.body.name
    }

    pub fn layer(&self) -> Layer {
        match self.kind {
            AgentKind::Furniture(_) => Layer::Furniture,
            AgentKind::Child(_) => Layer::Child,
        }
    }

    pub fn collider(&self) -> Collider {
        Collider {
            bounds: self.body.bounds(),
            forward: self.body.forward(),
            layer: self.layer(),
        }
    }

    pub fn is_furniture(&self) -> bool {
        matches!(self.kind, AgentKind::Furniture(_))
    }

    pub fn as_child(&self) -> Option<&ChildState> {
        match &self.kind {
            AgentKind::Child(c) => Some(c),
            AgentKind::Furniture(_) => None,
        }
    }

    pub fn as_child_mut(&mut self) -> Option<&mut ChildState> {
        match &mut self.kind {
            AgentKind::Child(c) => Some(c),
            AgentKind::Furniture(_) => None,
        }
    }

    pub fn as_furniture(&self) -> Option<&FurnitureState> {
        match &self.kind {
            AgentKind::Furniture(f) => Some(f),
            AgentKind::Child(_) => None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.body.frozen
    }

    pub fn disabled(&self) -> Option<&AgentError> {
        self.disabled.as_ref()
    }

    /// Takes part in stepping: neither frozen nor disabled.
    pub fn is_active(&self) -> bool {
        !self.body.frozen && self.disabled.is_none()
    }

    pub fn status(&self) -> AgentStatus {
        if self.disabled.is_some() {
            return AgentStatus::Disabled;
        }
        if self.body.frozen {
            return AgentStatus::Frozen;
        }
        match &self.kind {
            AgentKind::Furniture(f) => match f.phase {
                Phase::Positioning => AgentStatus::Positioning,
                Phase::Aligning => AgentStatus::Aligning,
            },
            AgentKind::Child(_) => AgentStatus::Relating,
        }
    }

    /// Locks kinematics. Idempotent.
    pub fn freeze(&mut self) {
        self.body.frozen = true;
    }

    /// Drains the reward accumulated since the last call.
    pub fn take_step_reward(&mut self) -> f64 {
        std::mem::take(&mut self.body.step_reward)
    }

    /// Reward accumulated since the last episode began.
    pub fn episode_reward(&self) -> f64 {
        self.body.episode_reward
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.body.position = pose.position;
        self.body.yaw = normalize_yaw(pose.yaw);
    }

    /// Resets live state at the start of an episode.
    ///
    /// Furniture agents without any wall to target become inert for the
    /// episode instead of failing the room.
    pub fn on_episode_begin(&mut self, world: &dyn SpatialQuery) {
        self.body.frozen = false;
        self.body.step_reward = 0.0;
        self.body.episode_reward = 0.0;
        match &mut self.kind {
            AgentKind::Furniture(f) => {
                f.reset(self.body.position);
                if world.shapes_in_layer(Layer::Wall).is_empty() {
                    let err = AgentError::MissingWalls(self.body.name.clone());
                    error!(agent = %self.body.name, %err, "disabling agent");
                    self.disabled = Some(err);
                } else {
                    self.disabled = None;
                }
            }
            AgentKind::Child(c) => c.reset(),
        }
    }

    /// Pose the agent wants to move to this step, if any.
    pub fn plan_motion(
        &self,
        action: AgentAction,
        world: &dyn SpatialQuery,
        config: &RoomConfig,
    ) -> Option<Pose> {
        if !self.is_active() {
            return None;
        }
        match &self.kind {
            AgentKind::Furniture(f) => f.plan_motion(&self.body, action, world, config.step_length()),
            AgentKind::Child(_) => self.body.translated(action.movement, config.step_length()),
        }
    }

    /// Computes this step's reward and phase transition.
    ///
    /// Frozen and disabled agents do nothing.
    pub fn act(&mut self, ctx: &StepContext<'_>) -> Option<PhaseSignal> {
        if !self.is_active() {
            return None;
        }
        match &mut self.kind {
            AgentKind::Furniture(f) => f.act(&mut self.body, &self.spec, ctx),
            AgentKind::Child(c) => c.act(&mut self.body, &self.spec, ctx),
        }
    }

    /// Reacts to contact with another agent. Only furniture reacts, and
    /// only to other furniture.
    pub fn on_contact(&mut self, other_is_furniture: bool, other_frozen: bool) -> Option<ContactReaction> {
        if !other_is_furniture || self.disabled.is_some() {
            return None;
        }
        match &mut self.kind {
            AgentKind::Furniture(f) => f.on_contact(&mut self.body, other_frozen),
            AgentKind::Child(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::BoxWorld;

    fn furniture() -> Agent {
        Agent::furniture(
            "Table_01",
            Footprint::new(1.0, 1.0),
            RewardSpec::furniture(),
            FurnitureSettings::default(),
        )
    }

    #[test]
    fn action_from_discrete() {
        let a = AgentAction::from_discrete(3, 2);
        assert_eq!(a.movement, Movement::Left);
        assert_eq!(a.rotation, Rotation::Half);
        assert_eq!(AgentAction::from_discrete(9, 9), AgentAction::idle());
    }

    #[test]
    fn agent_without_walls_is_disabled() {
        let world = BoxWorld::new();
        let mut a = furniture();
        a.on_episode_begin(&world);
        assert_eq!(a.status(), AgentStatus::Disabled);
        assert!(!a.is_active());
        assert!(a.plan_motion(AgentAction::from_discrete(1, 0), &world, &RoomConfig::default()).is_none());
    }

    #[test]
    fn translation_follows_forward() {
        let world = BoxWorld::new();
        let mut a = Agent::child(
            "Chair_01",
            Footprint::new(0.5, 0.5),
            RewardSpec::child(),
            ChildSettings::default(),
            None,
        );
        a.set_pose(Pose {
            position: Vec2::zero(),
            yaw: 90.0,
        });
        let config = RoomConfig::default();
        let pose = a
            .plan_motion(AgentAction::from_discrete(1, 0), &world, &config)
            .unwrap();
        assert!((pose.position.x - config.step_length()).abs() < 1e-12);
        assert!(pose.position.z.abs() < 1e-12);
    }

    #[test]
    fn take_step_reward_drains_once() {
        let mut a = furniture();
        a.body.add_reward(0.25);
        a.body.add_reward(-0.05);
        assert!((a.take_step_reward() - 0.2).abs() < 1e-12);
        assert_eq!(a.take_step_reward(), 0.0);
        assert!((a.episode_reward() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn freeze_is_idempotent() {
        let mut a = furniture();
        a.freeze();
        a.freeze();
        assert!(a.is_frozen());
        assert_eq!(a.status(), AgentStatus::Frozen);
    }
}
