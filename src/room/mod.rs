//! Room episode coordinator.
//!
//! [`RoomEpisode`] owns the agents of one room, the collision world and the
//! shared [`MultiAgentGroup`]. It advances every agent once per tick, turns
//! freeze and completion reports into episode boundaries, and rebuilds the
//! roster between episodes.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ─start→ Initializing ─tick→ Running ─end→ Ending ─→ Running (re-initialized)
//!                                                      └─→ ReplacementPending(Settling)
//!                                                          ─tick→ ReplacementPending(Reconnecting)
//!                                                          ─tick→ Running
//! ```
//!
//! [`RoomEpisode::reset`] initializes immediately and returns the first
//! observations.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentAction, ParentSnapshot, PhaseSignal, Pose, StepContext};
use crate::config::RoomConfig;
use crate::error::{ConfigError, ResolutionError};
use crate::group::{EpisodeSummary, MultiAgentGroup};
use crate::observation::ObservationBuilder;
use crate::placement::PlacementSampler;
use crate::relation::RelationTable;
use crate::scene::{AgentBlueprint, AgentStore, Group};
use crate::services::{AgentReplacer, SceneCapture};
use crate::spatial::{BoxWorld, Collider, Layer, SpatialQuery};
use crate::types::{Aabb, Vec2};
use crate::Id;

#[cfg(test)]
mod tests;

/// Thickness of walls built by [`RoomLayout::rectangular`].
pub const WALL_THICKNESS: f64 = 0.2;

/// A wall shape. `forward` points into the room.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WallSpec {
    pub name: String,
    pub bounds: Aabb,
    pub forward: Vec2,
}

/// Static description of a room: floor, walls and the agents to spawn.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoomLayout {
    pub floor: Aabb,
    pub walls: Vec<WallSpec>,
    pub agents: Vec<AgentBlueprint>,
}

impl RoomLayout {
    /// A floor without walls.
    pub fn open(floor: Aabb) -> Self {
        Self {
            floor,
            walls: Vec::new(),
            agents: Vec::new(),
        }
    }

    /// A `width × depth` floor centred on the origin, enclosed by four walls.
    pub fn rectangular(width: f64, depth: f64) -> Self {
        let (hw, hd, t) = (width * 0.5, depth * 0.5, WALL_THICKNESS);
        let wall = |name: &str, a: Vec2, b: Vec2, forward: Vec2| WallSpec {
            name: name.to_string(),
            bounds: Aabb::new(a, b),
            forward,
        };
        Self {
            floor: Aabb::new(Vec2::new(-hw, -hd), Vec2::new(hw, hd)),
            walls: vec![
                wall("wall_north", Vec2::new(-hw - t, hd), Vec2::new(hw + t, hd + t), Vec2::new(0.0, -1.0)),
                wall("wall_south", Vec2::new(-hw - t, -hd - t), Vec2::new(hw + t, -hd), Vec2::new(0.0, 1.0)),
                wall("wall_east", Vec2::new(hw, -hd), Vec2::new(hw + t, hd), Vec2::new(-1.0, 0.0)),
                wall("wall_west", Vec2::new(-hw - t, -hd), Vec2::new(-hw, hd), Vec2::new(1.0, 0.0)),
            ],
            agents: Vec::new(),
        }
    }

    pub fn with_agent(mut self, blueprint: AgentBlueprint) -> Self {
        self.agents.push(blueprint);
        self
    }
}

/// Stage of a between-episode agent replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplacementStage {
    /// Waiting one tick for destroyed agents to disappear.
    Settling,
    /// Roster rebuilt; children are re-bound on the next tick.
    Reconnecting,
}

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodeState {
    Idle,
    Initializing,
    Running,
    Ending,
    ReplacementPending(ReplacementStage),
}

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodeOutcome {
    /// Every active agent froze.
    Success,
    /// Step budget exhausted.
    Timeout,
    /// Enough child agents completed.
    QuotaReached,
}

/// Report of a finished episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeEnd {
    pub outcome: EpisodeOutcome,
    pub summary: EpisodeSummary,
    /// Overlapping agent pairs found at the end.
    pub overlap_pairs: usize,
    /// Zero-based index of the finished episode.
    pub episode: u32,
}

/// Result of a single [`RoomEpisode::step`].
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Step counter value at the end of the tick's simulation.
    pub time_step: u32,
    /// Coordinator state after the tick.
    pub state: EpisodeState,
    /// Reward earned by each roster agent this tick, in roster order.
    pub rewards: Vec<f64>,
    /// Reward added directly to the group this tick (hurry-up, terminal, overlap).
    pub group_reward_delta: f64,
    pub active_agents: usize,
    pub episode_end: Option<EpisodeEnd>,
    /// Observations for the roster after the tick.
    pub observations: Vec<Vec<f64>>,
}

/// Multi-agent placement episode for one room.
pub struct RoomEpisode {
    config: RoomConfig,
    floor: Aabb,
    world: Box<dyn SpatialQuery>,
    store: AgentStore,
    roster: Vec<Id>,
    group: MultiAgentGroup,
    relations: RelationTable,
    state: EpisodeState,
    step_counter: u32,
    total_episodes: u32,
    completed_children: u32,
    rng: StdRng,
    sampler: PlacementSampler,
    capture: Option<Box<dyn SceneCapture>>,
    replacer: Option<Box<dyn AgentReplacer>>,
}

impl RoomEpisode {
    /// Creates a coordinator backed by a [`BoxWorld`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid, the floor
    /// is degenerate or an agent footprint is not finite and positive.
    pub fn new(config: RoomConfig, layout: RoomLayout, seed: u64) -> Result<Self, ConfigError> {
        Self::with_world(config, layout, Box::new(BoxWorld::new()), seed)
    }

    /// Creates a coordinator on top of an existing collision world. The
    /// layout's walls are added to it.
    pub fn with_world(
        config: RoomConfig,
        layout: RoomLayout,
        mut world: Box<dyn SpatialQuery>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !layout.floor.is_valid() {
            return Err(ConfigError::DegenerateFloor(layout.floor));
        }
        if let Some(bad) = layout.agents.iter().find(|b| !b.footprint.is_valid()) {
            return Err(ConfigError::InvalidFootprint {
                agent: bad.name.clone(),
                width: bad.footprint.half_width * 2.0,
                depth: bad.footprint.half_depth * 2.0,
            });
        }
        for wall in &layout.walls {
            world.upsert(
                &wall.name,
                Collider {
                    bounds: wall.bounds,
                    forward: wall.forward.normalized(),
                    layer: Layer::Wall,
                },
            );
        }
        let mut store = AgentStore::new();
        for blueprint in &layout.agents {
            store.instantiate(blueprint, &config);
        }
        let sampler = PlacementSampler::new(config.placement_attempts);
        Ok(Self {
            config,
            floor: layout.floor,
            world,
            store,
            roster: Vec::new(),
            group: MultiAgentGroup::new(),
            relations: RelationTable::new(),
            state: EpisodeState::Idle,
            step_counter: 0,
            total_episodes: 0,
            completed_children: 0,
            rng: StdRng::seed_from_u64(seed),
            sampler,
            capture: None,
            replacer: None,
        })
    }

    pub fn with_capture(mut self, capture: Box<dyn SceneCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_replacer(mut self, replacer: Box<dyn AgentReplacer>) -> Self {
        self.replacer = Some(replacer);
        self
    }

    // --- Accessors ---

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn floor(&self) -> &Aabb {
        &self.floor
    }

    pub fn step_counter(&self) -> u32 {
        self.step_counter
    }

    pub fn total_episodes(&self) -> u32 {
        self.total_episodes
    }

    pub fn completed_children(&self) -> u32 {
        self.completed_children
    }

    /// Agents taking part in the current episode, in registration order.
    pub fn roster(&self) -> &[Id] {
        &self.roster
    }

    pub fn n_agents(&self) -> usize {
        self.roster.len()
    }

    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    pub fn world(&self) -> &dyn SpatialQuery {
        self.world.as_ref()
    }

    pub fn group(&self) -> &MultiAgentGroup {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut MultiAgentGroup {
        &mut self.group
    }

    pub fn relations(&self) -> &RelationTable {
        &self.relations
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.store.get(id)
    }

    pub fn agent_by_name(&self, name: &str) -> Option<&Agent> {
        self.store.find_by_name(name)
    }

    /// Roster agents not yet frozen. Disabled agents never freeze, so they
    /// hold the episode open until the step budget runs out.
    pub fn active_count(&self) -> usize {
        self.roster
            .iter()
            .filter_map(|id| self.store.get(id))
            .filter(|a| !a.is_frozen())
            .count()
    }

    /// Moves an agent to `pose` and updates its collider.
    pub fn place_agent(&mut self, id: &str, pose: Pose) -> bool {
        let Some(agent) = self.store.get_mut(id) else {
            return false;
        };
        agent.set_pose(pose);
        self.world.upsert(id, agent.collider());
        true
    }

    // --- Lifecycle ---

    /// Schedules initialization on the next tick.
    pub fn start(&mut self) {
        if self.state == EpisodeState::Idle {
            self.state = EpisodeState::Initializing;
        }
    }

    /// Initializes a fresh episode now and returns its first observations.
    ///
    /// Totals of an unfinished episode are discarded.
    pub fn reset(&mut self) -> Vec<Vec<f64>> {
        if self.step_counter > 0 {
            self.group.interrupt_group_episode();
        }
        self.initialize();
        self.observations()
    }

    /// Builds the roster and places every agent.
    ///
    /// Clears prior registrations, records parent/child relations, registers
    /// every live agent with the group, samples non-overlapping poses and
    /// binds children to their parents.
    pub fn initialize(&mut self) {
        self.state = EpisodeState::Initializing;
        for id in std::mem::take(&mut self.roster) {
            self.group.unregister_agent(&id);
        }
        self.flush_destroyed();

        let members: Vec<Id> = [Group::Furniture, Group::Child]
            .into_iter()
            .flat_map(|g| self.store.members(g).to_vec())
            .filter(|id| self.store.is_live(id))
            .collect();

        for id in &members {
            self.world.remove(id);
        }

        for id in &members {
            let Some(agent) = self.store.get(id) else {
                continue;
            };
            if let Some(parent_name) = agent.as_child().and_then(|c| c.parent_name.as_deref()) {
                self.relations.record(agent.name(), parent_name);
            }
            let footprint = agent.body.footprint;
            let placement = self.sampler.sample(
                &mut self.rng,
                &self.floor,
                &footprint,
                self.world.as_ref(),
                Some(id),
            );
            self.place_agent(
                id,
                Pose {
                    position: placement.position,
                    yaw: placement.yaw,
                },
            );
            self.group.register_agent(id);
            self.roster.push(id.clone());
        }

        for id in &self.roster {
            if let Some(agent) = self.store.get_mut(id) {
                agent.on_episode_begin(self.world.as_ref());
            }
        }
        self.reconnect_children();

        self.step_counter = 0;
        self.completed_children = 0;
        self.state = EpisodeState::Running;
        info!(
            agents = self.roster.len(),
            episode = self.total_episodes,
            "roster initialized"
        );
    }

    /// Advances the coordinator by one tick.
    ///
    /// `actions` are matched to the roster by position; missing entries idle.
    pub fn step(&mut self, actions: &[AgentAction]) -> StepResult {
        match self.state {
            EpisodeState::Idle | EpisodeState::Ending => self.passive_result(0.0, None),
            EpisodeState::Initializing => {
                self.initialize();
                self.passive_result(0.0, None)
            }
            EpisodeState::ReplacementPending(ReplacementStage::Settling) => {
                self.flush_destroyed();
                self.purge_stale();
                self.initialize();
                self.state = EpisodeState::ReplacementPending(ReplacementStage::Reconnecting);
                self.passive_result(0.0, None)
            }
            EpisodeState::ReplacementPending(ReplacementStage::Reconnecting) => {
                self.reconnect_children();
                self.state = EpisodeState::Running;
                self.passive_result(0.0, None)
            }
            EpisodeState::Running => self.run_tick(actions),
        }
    }

    fn run_tick(&mut self, actions: &[AgentAction]) -> StepResult {
        self.purge_stale();
        if self.roster.is_empty() {
            return self.passive_result(0.0, None);
        }
        self.step_counter += 1;
        self.group.record_step();
        let group_before = self.group.summary().group_reward;

        let roster = self.roster.clone();
        for (i, id) in roster.iter().enumerate() {
            let action = actions.get(i).copied().unwrap_or_default();
            let contacts = self.move_agent(id, action);
            if !contacts.is_empty() {
                self.resolve_contacts(id, &contacts);
            }
            match self.act_agent(id) {
                Some(PhaseSignal::ChildCompleted) => {
                    self.completed_children += 1;
                    info!(agent = id.as_str(), completed = self.completed_children, "child completed");
                }
                Some(signal) => debug!(agent = id.as_str(), ?signal, "phase signal"),
                None => {}
            }
        }

        let mut rewards = Vec::with_capacity(roster.len());
        for id in &roster {
            let r = self.store.get_mut(id).map_or(0.0, Agent::take_step_reward);
            self.group.add_agent_reward(id, r);
            rewards.push(r);
        }

        self.group
            .add_group_reward(-self.config.hurry_up_penalty * self.config.time_cost());

        let time_step = self.step_counter;
        let active = self.active_count();
        let outcome = if active == 0 {
            Some(EpisodeOutcome::Success)
        } else if self.config.child_completion_quota > 0
            && self.completed_children >= self.config.child_completion_quota
        {
            Some(EpisodeOutcome::QuotaReached)
        } else if self.step_counter >= self.config.max_environment_steps {
            Some(EpisodeOutcome::Timeout)
        } else {
            None
        };

        let (group_delta, end) = match outcome {
            Some(outcome) => {
                let end = self.end_episode(outcome);
                (end.summary.group_reward - group_before, Some(end))
            }
            None => (self.group.summary().group_reward - group_before, None),
        };

        StepResult {
            time_step,
            state: self.state,
            rewards,
            group_reward_delta: group_delta,
            active_agents: active,
            episode_end: end,
            observations: self.observations(),
        }
    }

    /// Applies terminal rewards, closes the group episode and prepares the
    /// next one.
    pub fn end_episode(&mut self, outcome: EpisodeOutcome) -> EpisodeEnd {
        self.state = EpisodeState::Ending;
        let max_steps = f64::from(self.config.max_environment_steps.max(1));
        let episode = self.total_episodes;

        match outcome {
            EpisodeOutcome::Success => {
                self.group.add_group_reward(
                    self.config.completion_bonus_scale / max_steps + self.config.completion_reward,
                );
                if self.config.capture_episodes {
                    self.capture_scene(episode);
                }
            }
            EpisodeOutcome::Timeout => self.group.add_group_reward(-self.config.timeout_penalty),
            EpisodeOutcome::QuotaReached => {}
        }

        let overlap_pairs = self.overlap_pairs();
        if overlap_pairs > 0 {
            warn!(pairs = overlap_pairs, "overlapping agents at episode end");
            self.group
                .add_group_reward(-self.config.overlap_penalty * overlap_pairs as f64);
        }

        let summary = match outcome {
            EpisodeOutcome::Timeout => self.group.interrupt_group_episode(),
            EpisodeOutcome::Success | EpisodeOutcome::QuotaReached => self.group.end_group_episode(),
        };
        info!(
            episode,
            ?outcome,
            steps = self.step_counter,
            reward = summary.total(),
            "episode ended"
        );
        self.step_counter = 0;
        self.total_episodes += 1;

        let replaced = if self.config.replace_between_episodes {
            self.replace_agents()
        } else {
            false
        };
        if replaced {
            self.state = EpisodeState::ReplacementPending(ReplacementStage::Settling);
        } else {
            self.initialize();
        }

        EpisodeEnd {
            outcome,
            summary,
            overlap_pairs,
            episode,
        }
    }

    fn replace_agents(&mut self) -> bool {
        let Some(replacer) = self.replacer.as_mut() else {
            warn!("agent replacement enabled without a replacer");
            return false;
        };
        let replacement = replacer.replace_agents(&mut self.store, &self.config, &mut self.rng);
        if replacement.is_empty() {
            return false;
        }
        debug!(
            destroyed = replacement.destroyed.len(),
            spawned = replacement.spawned.len(),
            "agents replaced"
        );
        for id in &replacement.spawned {
            let is_child = self.store.get(id).is_some_and(|a| a.as_child().is_some());
            if is_child {
                if let Err(err) = self.connect_new_child(id) {
                    debug!(agent = id.as_str(), %err, "spawned child left unbound");
                }
            }
        }
        true
    }

    fn capture_scene(&mut self, episode: u32) {
        let Some(capture) = self.capture.as_mut() else {
            return;
        };
        let label = format!("Scene_Episode_{}_{}", self.config.room_number, episode);
        if let Err(err) = capture.capture_episode(&label) {
            warn!(%label, %err, "scene capture failed");
        }
    }

    // --- Relations ---

    /// Binds a child agent to a live parent sharing its recorded prefix.
    pub fn connect_new_child(&mut self, child_id: &str) -> Result<Id, ResolutionError> {
        bind_child(&mut self.store, &self.relations, child_id)
    }

    /// Re-binds every roster child whose parent is missing. Returns how many
    /// children are bound afterwards.
    pub fn reconnect_children(&mut self) -> usize {
        let children: Vec<Id> = self
            .roster
            .iter()
            .filter(|id| self.store.get(id).is_some_and(|a| a.as_child().is_some()))
            .cloned()
            .collect();
        let mut bound = 0;
        for id in children {
            if parent_snapshot(&self.store, &id).is_some() {
                bound += 1;
                continue;
            }
            match bind_child(&mut self.store, &self.relations, &id) {
                Ok(_) => bound += 1,
                Err(err) => debug!(agent = id.as_str(), %err, "parent unresolved"),
            }
        }
        bound
    }

    // --- Roster maintenance ---

    /// Drops roster entries whose agent no longer exists, unregistering them.
    pub fn purge_stale(&mut self) -> usize {
        let store = &self.store;
        let (live, stale): (Vec<Id>, Vec<Id>) =
            std::mem::take(&mut self.roster).into_iter().partition(|id| store.is_live(id));
        self.roster = live;
        for id in &stale {
            self.group.unregister_agent(id);
        }
        if !stale.is_empty() {
            debug!(count = stale.len(), "purged stale roster entries");
        }
        stale.len()
    }

    fn flush_destroyed(&mut self) {
        for id in self.store.flush_destroyed() {
            self.world.remove(&id);
        }
    }

    /// Agent pairs whose bounds overlap.
    pub fn overlap_pairs(&self) -> usize {
        let bounds: Vec<Aabb> = self
            .roster
            .iter()
            .filter_map(|id| self.store.get(id))
            .map(|a| a.body.bounds())
            .collect();
        let mut pairs = 0;
        for (i, a) in bounds.iter().enumerate() {
            pairs += bounds[i + 1..].iter().filter(|b| a.intersects(b)).count();
        }
        pairs
    }

    // --- Per-agent tick ---

    /// Commits the agent's planned pose if it is free, otherwise leaves it in
    /// place. Returns the furniture agents that blocked the move.
    fn move_agent(&mut self, id: &str, action: AgentAction) -> Vec<Id> {
        let Some(agent) = self.store.get(id) else {
            return Vec::new();
        };
        let Some(pose) = agent.plan_motion(action, self.world.as_ref(), &self.config) else {
            return Vec::new();
        };
        let half = agent.body.footprint.half_extents(pose.yaw);
        let position = match self.floor.shrunk(half) {
            Some(area) => pose.position.clamped(area.min, area.max),
            None => self.floor.center(),
        };
        let hits: Vec<Id> = self
            .world
            .overlap_box(position, half)
            .into_iter()
            .filter(|hit| hit != id)
            .collect();
        if hits.is_empty() {
            self.place_agent(id, Pose { position, yaw: pose.yaw });
            return Vec::new();
        }
        hits.into_iter()
            .filter(|hit| self.world.layer_of(hit) == Some(Layer::Furniture))
            .collect()
    }

    fn resolve_contacts(&mut self, id: &str, others: &[Id]) {
        let Some(self_frozen) = self
            .store
            .get(id)
            .filter(|a| a.is_furniture())
            .map(Agent::is_frozen)
        else {
            return;
        };
        for other in others {
            let Some(other_frozen) = self.store.get(other).map(Agent::is_frozen) else {
                continue;
            };
            let mine = self.store.get_mut(id).and_then(|a| a.on_contact(true, other_frozen));
            let theirs = self.store.get_mut(other).and_then(|a| a.on_contact(true, self_frozen));
            if mine.is_some() || theirs.is_some() {
                debug!(agent = id, other = other.as_str(), ?mine, ?theirs, "contact");
            }
            self.sync_collider(other);
        }
        self.sync_collider(id);
    }

    fn act_agent(&mut self, id: &str) -> Option<PhaseSignal> {
        let agent = self.store.get(id)?;
        if !agent.is_active() {
            return None;
        }
        let parent = if agent.as_child().is_some() {
            self.ensure_parent(id)
        } else {
            None
        };
        let ctx = StepContext {
            world: self.world.as_ref(),
            config: &self.config,
            parent,
        };
        let signal = self.store.get_mut(id)?.act(&ctx);
        self.sync_collider(id);
        signal
    }

    fn ensure_parent(&mut self, child_id: &str) -> Option<ParentSnapshot> {
        if let Some(snapshot) = parent_snapshot(&self.store, child_id) {
            return Some(snapshot);
        }
        match bind_child(&mut self.store, &self.relations, child_id) {
            Ok(_) => parent_snapshot(&self.store, child_id),
            Err(err) => {
                debug!(agent = child_id, %err, "parent unresolved");
                None
            }
        }
    }

    fn sync_collider(&mut self, id: &str) {
        if let Some(agent) = self.store.get(id) {
            self.world.upsert(id, agent.collider());
        }
    }

    // --- Observations ---

    /// One observation per roster agent.
    pub fn observations(&self) -> Vec<Vec<f64>> {
        self.roster
            .iter()
            .filter_map(|id| {
                let agent = self.store.get(id)?;
                let parent = parent_snapshot(&self.store, id);
                Some(ObservationBuilder::build(agent, parent.as_ref(), &self.floor))
            })
            .collect()
    }

    fn passive_result(&self, group_reward_delta: f64, episode_end: Option<EpisodeEnd>) -> StepResult {
        StepResult {
            time_step: self.step_counter,
            state: self.state,
            rewards: vec![0.0; self.roster.len()],
            group_reward_delta,
            active_agents: self.active_count(),
            episode_end,
            observations: self.observations(),
        }
    }

    /// Moves, freezes or otherwise mutates an agent directly.
    #[cfg(test)]
    pub(crate) fn agent_mut(&mut self, id: &str) -> Option<&mut Agent> {
        self.store.get_mut(id)
    }
}

/// Snapshot of a child's bound parent, if the binding is still live.
fn parent_snapshot(store: &AgentStore, child_id: &str) -> Option<ParentSnapshot> {
    let parent_id = store.get(child_id)?.as_child()?.parent.clone()?;
    if !store.is_live(&parent_id) {
        return None;
    }
    let parent = store.get(&parent_id)?;
    Some(ParentSnapshot {
        position: parent.body.position,
        size: parent.body.footprint.size(),
        id: parent_id,
    })
}

/// Resolves a child's parent by prefix among live agents and binds it.
///
/// The relation table is consulted first; a child whose prefix was never
/// recorded falls back to the parent prefix it carries itself.
fn bind_child(
    store: &mut AgentStore,
    relations: &RelationTable,
    child_id: &str,
) -> Result<Id, ResolutionError> {
    let (name, own_prefix) = store
        .get(child_id)
        .and_then(|a| a.as_child().map(|c| (a.name().to_string(), c.parent_prefix.clone())))
        .ok_or_else(|| ResolutionError::MissingPrefix(child_id.to_string()))?;

    let candidates: Vec<(String, String)> = [Group::Furniture, Group::Child]
        .into_iter()
        .flat_map(|g| store.live_names(g))
        .filter(|(id, _)| *id != child_id)
        .map(|(id, n)| (id.to_string(), n.to_string()))
        .collect();
    let pairs = || candidates.iter().map(|(id, n)| (id.as_str(), n.as_str()));

    let parent = match relations.resolve_for_child(&name, pairs()) {
        Ok(id) => id,
        Err(ResolutionError::UnknownChildPrefix(_)) => {
            let prefix = own_prefix.ok_or_else(|| ResolutionError::MissingPrefix(name.clone()))?;
            RelationTable::resolve_parent(&prefix, pairs())?
        }
        Err(err) => return Err(err),
    };

    let parent_name = store
        .get(&parent)
        .map(|a| a.name().to_string())
        .unwrap_or_default();
    if let Some(child) = store.get_mut(child_id).and_then(Agent::as_child_mut) {
        child.bind(parent.clone(), &parent_name);
    }
    Ok(parent)
}
