use std::sync::{Arc, Mutex};

use super::*;
use crate::agent::{AgentStatus, Movement, Rotation};
use crate::error::CaptureError;
use crate::group::GroupSignal;
use crate::policy::{Policy, RandomPolicy};
use crate::services::PrefabCatalog;

// =============================================================================
// Helpers
// =============================================================================

fn room_config(max_steps: u32) -> RoomConfig {
    RoomConfig {
        max_environment_steps: max_steps,
        ..RoomConfig::default()
    }
}

fn two_tables() -> RoomLayout {
    RoomLayout::rectangular(10.0, 10.0)
        .with_agent(AgentBlueprint::furniture("Table_01", 1.0, 1.0))
        .with_agent(AgentBlueprint::furniture("Sofa_01", 1.0, 1.0))
}

fn table_and_chair() -> RoomLayout {
    RoomLayout::rectangular(10.0, 10.0)
        .with_agent(AgentBlueprint::furniture("Table_01", 1.0, 1.0))
        .with_agent(AgentBlueprint::child("Chair_01", 0.5, 0.5, Some("Table_01")))
}

fn id_of(room: &RoomEpisode, name: &str) -> Id {
    room.agent_by_name(name)
        .map(|a| a.id().to_string())
        .unwrap_or_else(|| panic!("no agent named {name}"))
}

fn place(room: &mut RoomEpisode, name: &str, x: f64, z: f64, yaw: f64) -> Id {
    let id = id_of(room, name);
    assert!(room.place_agent(
        &id,
        Pose {
            position: Vec2::new(x, z),
            yaw,
        }
    ));
    id
}

fn idle(room: &RoomEpisode) -> Vec<AgentAction> {
    vec![AgentAction::idle(); room.n_agents()]
}

fn face_wall(room: &RoomEpisode) -> Vec<AgentAction> {
    vec![AgentAction::new(Movement::Idle, Rotation::Wall); room.n_agents()]
}

#[derive(Clone, Default)]
struct SharedCapture(Arc<Mutex<Vec<String>>>);

impl SceneCapture for SharedCapture {
    fn capture_episode(&mut self, label: &str) -> Result<(), CaptureError> {
        if let Ok(mut labels) = self.0.lock() {
            labels.push(label.to_string());
        }
        Ok(())
    }
}

struct BrokenCapture;

impl SceneCapture for BrokenCapture {
    fn capture_episode(&mut self, _label: &str) -> Result<(), CaptureError> {
        Err(CaptureError::Unavailable("no renderer".into()))
    }
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn degenerate_floor_is_rejected() {
    let layout = RoomLayout::open(Aabb::new(Vec2::zero(), Vec2::new(0.0, 4.0)));
    let err = RoomEpisode::new(RoomConfig::default(), layout, 1).err();
    assert!(matches!(err, Some(ConfigError::DegenerateFloor(_))));
}

#[test]
fn invalid_config_is_rejected() {
    let err = RoomEpisode::new(room_config(0), two_tables(), 1).err();
    assert_eq!(err, Some(ConfigError::ZeroStepBudget));
}

#[test]
fn invalid_footprint_is_rejected() {
    let layout = two_tables().with_agent(AgentBlueprint::furniture("Lamp_01", f64::NAN, 1.0));
    let err = RoomEpisode::new(RoomConfig::default(), layout, 1).err();
    assert!(matches!(
        err,
        Some(ConfigError::InvalidFootprint { ref agent, .. }) if agent == "Lamp_01"
    ));

    let layout = two_tables().with_agent(AgentBlueprint::child("Chair_01", 0.5, 0.0, Some("Table_01")));
    let err = RoomEpisode::new(RoomConfig::default(), layout, 1).err();
    assert!(matches!(err, Some(ConfigError::InvalidFootprint { depth, .. }) if depth == 0.0));
}

#[test]
fn start_initializes_on_next_tick() {
    let mut room = RoomEpisode::new(RoomConfig::default(), two_tables(), 1).unwrap();
    assert_eq!(room.state(), EpisodeState::Idle);
    assert_eq!(room.step(&[]).state, EpisodeState::Idle);
    room.start();
    assert_eq!(room.state(), EpisodeState::Initializing);
    let result = room.step(&[]);
    assert_eq!(result.state, EpisodeState::Running);
    assert_eq!(result.observations.len(), 2);
    assert_eq!(room.step_counter(), 0);
}

#[test]
fn reset_registers_and_places_every_agent() {
    let mut room = RoomEpisode::new(RoomConfig::default(), two_tables(), 7).unwrap();
    let obs = room.reset();
    assert_eq!(obs.len(), 2);
    assert!(obs.iter().all(|o| o.len() == ObservationBuilder::FURNITURE_DIM));
    assert_eq!(room.group().members(), room.roster());
    assert_eq!(room.active_count(), room.n_agents());
    assert_eq!(room.overlap_pairs(), 0);
    for id in room.roster() {
        let b = room.agent(id).unwrap().body.bounds();
        assert!(b.min.x >= -5.0 - 1e-9 && b.max.x <= 5.0 + 1e-9);
        assert!(b.min.z >= -5.0 - 1e-9 && b.max.z <= 5.0 + 1e-9);
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn both_agents_aligned_end_with_success_bonus() {
    let mut room = RoomEpisode::new(room_config(1000), two_tables(), 3).unwrap();
    room.reset();
    place(&mut room, "Table_01", -2.5, -3.5, 0.0);
    place(&mut room, "Sofa_01", 2.5, 3.5, 180.0);

    let first = room.step(&idle(&room));
    assert!(first.episode_end.is_none());
    assert!(first.rewards.iter().all(|r| (r - 0.5).abs() < 1e-9));
    for id in room.roster() {
        assert_eq!(room.agent(id).unwrap().status(), AgentStatus::Aligning);
    }

    let second = room.step(&face_wall(&room));
    assert_eq!(second.active_agents, 0);
    assert_eq!(second.time_step, 2);
    let end = second.episode_end.expect("episode should end");
    assert_eq!(end.outcome, EpisodeOutcome::Success);
    assert!(!end.summary.interrupted);
    let expected_group = 100.0 / 1000.0 + 1.0 - 2.0 * 0.5 / 1000.0;
    assert!((end.summary.group_reward - expected_group).abs() < 1e-9);
    assert!(end.summary.group_reward > 0.0);

    // next episode already initialized
    assert_eq!(room.state(), EpisodeState::Running);
    assert_eq!(room.step_counter(), 0);
    assert_eq!(room.total_episodes(), 1);
    assert_eq!(room.active_count(), 2);
}

#[test]
fn unreachable_target_times_out() {
    let layout = RoomLayout::rectangular(10.0, 10.0).with_agent(AgentBlueprint::furniture("Table_01", 1.0, 1.0));
    let mut room = RoomEpisode::new(room_config(50), layout, 5).unwrap();
    room.reset();
    place(&mut room, "Table_01", 0.0, 0.0, 0.0);

    let mut end = None;
    for tick in 1..=50 {
        let r = room.step(&idle(&room));
        if let Some(e) = r.episode_end {
            assert_eq!(tick, 50);
            assert_eq!(r.time_step, 50);
            end = Some(e);
        }
    }
    let end = end.expect("episode should time out");
    assert_eq!(end.outcome, EpisodeOutcome::Timeout);
    assert!(end.summary.interrupted);
    assert_eq!(end.summary.steps, 50);
    // hurry-up 50 * 0.5 / 50 plus the timeout penalty, no success bonus
    assert!((end.summary.group_reward + 1.0).abs() < 1e-9);
    assert!((end.summary.agent_reward + 1.0).abs() < 1e-9);
    let signals = room.group_mut().drain_signals();
    assert!(signals
        .iter()
        .any(|s| matches!(s, GroupSignal::EpisodeInterrupted(_))));
}

#[test]
fn stuck_agent_escapes_after_frustration_threshold() {
    let layout = RoomLayout::rectangular(10.0, 10.0).with_agent(AgentBlueprint::furniture("Table_01", 1.0, 1.0));
    let mut room = RoomEpisode::new(room_config(1000), layout, 9).unwrap();
    room.reset();
    let id = place(&mut room, "Table_01", 0.0, 0.0, 0.0);

    let threshold = room.config().furniture.frustration_threshold;
    let mut escaped_at = None;
    for tick in 1..=(threshold + 10) {
        let r = room.step(&idle(&room));
        if r.rewards[0] < -0.4 {
            escaped_at = Some(tick);
            break;
        }
    }
    let tick = escaped_at.expect("agent should escape");
    assert!(tick > threshold);

    let agent = room.agent(&id).unwrap();
    let f = agent.as_furniture().unwrap();
    assert_eq!(f.frustration, 0);
    assert!(f.target_wall.is_none());
    assert!((agent.body.yaw - 180.0).abs() < 1e-9);
    assert_eq!(agent.status(), AgentStatus::Positioning);
}

#[test]
fn child_completion_ends_episode_at_quota() {
    let mut room = RoomEpisode::new(room_config(1000), table_and_chair(), 11).unwrap();
    room.reset();
    place(&mut room, "Table_01", 0.0, 0.0, 0.0);
    let chair = place(&mut room, "Chair_01", 0.0, -1.1, 0.0);

    let r = room.step(&idle(&room));
    let end = r.episode_end.expect("quota should end the episode");
    assert_eq!(end.outcome, EpisodeOutcome::QuotaReached);
    assert!(!end.summary.interrupted);
    // the table never froze
    assert_eq!(r.active_agents, 1);
    let chair_reward = room
        .roster()
        .iter()
        .position(|id| *id == chair)
        .map(|i| r.rewards[i])
        .unwrap();
    assert!((chair_reward - 1.8).abs() < 1e-9);
    assert_eq!(room.completed_children(), 0);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn frozen_agent_stays_frozen_without_contact() {
    let mut room = RoomEpisode::new(room_config(1000), two_tables(), 13).unwrap();
    room.reset();
    let table = place(&mut room, "Table_01", -2.5, -3.5, 0.0);
    place(&mut room, "Sofa_01", 2.5, 0.0, 0.0);

    room.step(&idle(&room));
    room.step(&face_wall(&room));
    assert!(room.agent(&table).unwrap().is_frozen());
    for _ in 0..20 {
        let r = room.step(&idle(&room));
        assert!(r.episode_end.is_none());
        assert!(room.agent(&table).unwrap().is_frozen());
    }
}

#[test]
fn bumping_frozen_agent_unfreezes_it() {
    let mut room = RoomEpisode::new(room_config(1000), two_tables(), 17).unwrap();
    room.reset();
    let table = place(&mut room, "Table_01", 0.0, 0.0, 0.0);
    let sofa = place(&mut room, "Sofa_01", 0.0, -1.01, 0.0);
    room.agent_mut(&table).unwrap().freeze();

    let mut actions = idle(&room);
    let sofa_index = room.roster().iter().position(|id| *id == sofa).unwrap();
    actions[sofa_index] = AgentAction::new(Movement::Forward, Rotation::Wall);
    let r = room.step(&actions);

    assert!(r.rewards[sofa_index] < -0.7);
    let sofa_agent = room.agent(&sofa).unwrap();
    assert!((sofa_agent.body.yaw - 180.0).abs() < 1e-9);
    assert!((sofa_agent.body.position.z + 1.01).abs() < 1e-12);
    let table_agent = room.agent(&table).unwrap();
    assert!(!table_agent.is_frozen());
    assert_eq!(table_agent.status(), AgentStatus::Positioning);
}

#[test]
fn group_reward_matches_sum_of_step_rewards() {
    let mut room = RoomEpisode::new(room_config(30), table_and_chair(), 21).unwrap();
    room.reset();
    let mut policy = RandomPolicy::new(99);
    let mut running = 0.0;
    let mut ends = 0;
    let mut obs = room.observations();
    for _ in 0..200 {
        let actions = policy.select_actions(&obs);
        let r = room.step(&actions);
        running += r.rewards.iter().sum::<f64>() + r.group_reward_delta;
        if let Some(end) = r.episode_end {
            assert!((end.summary.total() - running).abs() < 1e-9);
            running = 0.0;
            ends += 1;
        }
        obs = r.observations;
    }
    assert!(ends > 0);
}

#[test]
fn room_without_walls_disables_furniture() {
    let layout = RoomLayout::open(Aabb::new(Vec2::new(-5.0, -5.0), Vec2::new(5.0, 5.0)))
        .with_agent(AgentBlueprint::furniture("Table_01", 1.0, 1.0))
        .with_agent(AgentBlueprint::child("Chair_01", 0.5, 0.5, Some("Table_01")));
    let mut room = RoomEpisode::new(RoomConfig::default(), layout, 2).unwrap();
    room.reset();
    let table = place(&mut room, "Table_01", -3.0, -3.0, 0.0);
    place(&mut room, "Chair_01", 4.0, 4.0, 0.0);
    assert_eq!(room.agent(&table).unwrap().status(), AgentStatus::Disabled);
    // disabled agents never freeze, so they still count
    assert_eq!(room.active_count(), 2);
    assert!(room.step(&idle(&room)).episode_end.is_none());
}

#[test]
fn disabled_roster_runs_until_timeout() {
    let layout = RoomLayout::open(Aabb::new(Vec2::new(-5.0, -5.0), Vec2::new(5.0, 5.0)))
        .with_agent(AgentBlueprint::furniture("Table_01", 1.0, 1.0));
    let mut room = RoomEpisode::new(room_config(3), layout, 4).unwrap();
    room.reset();
    for _ in 0..2 {
        let r = room.step(&idle(&room));
        assert!(r.episode_end.is_none());
        assert_eq!(r.active_agents, 1);
    }
    let end = room.step(&idle(&room)).episode_end.unwrap();
    assert_eq!(end.outcome, EpisodeOutcome::Timeout);
    assert_eq!(room.total_episodes(), 1);
}

#[test]
fn empty_roster_never_ends() {
    let mut room = RoomEpisode::new(RoomConfig::default(), RoomLayout::rectangular(6.0, 6.0), 5).unwrap();
    room.reset();
    for _ in 0..3 {
        let r = room.step(&[]);
        assert!(r.episode_end.is_none());
        assert_eq!(r.group_reward_delta, 0.0);
        assert!(r.observations.is_empty());
    }
    assert_eq!(room.step_counter(), 0);
    assert_eq!(room.total_episodes(), 0);
}

#[test]
fn child_is_bound_to_parent_on_reset() {
    let mut room = RoomEpisode::new(RoomConfig::default(), table_and_chair(), 4).unwrap();
    room.reset();
    let table = id_of(&room, "Table_01");
    let chair = room.agent_by_name("Chair_01").unwrap();
    assert_eq!(chair.as_child().unwrap().parent.as_deref(), Some(table.as_str()));
    assert_eq!(room.relations().parent_prefix_for("Chair_01"), Some("Table"));
}

#[test]
fn replacement_rebinds_child_to_new_parent() {
    let config = RoomConfig {
        max_environment_steps: 3,
        replace_between_episodes: true,
        ..RoomConfig::default()
    };
    let catalog = PrefabCatalog::new()
        .with_variant(AgentBlueprint::furniture("Table_Glass", 1.2, 0.8))
        .with_variant(AgentBlueprint::child("Chair_Wood", 0.5, 0.5, None));
    let mut room = RoomEpisode::new(config, table_and_chair(), 8)
        .unwrap()
        .with_replacer(Box::new(catalog));
    room.reset();
    let old_roster = room.roster().to_vec();
    place(&mut room, "Table_01", 0.0, 0.0, 0.0);
    place(&mut room, "Chair_01", 3.0, 3.0, 90.0);

    let mut end = None;
    for _ in 0..3 {
        end = room.step(&idle(&room)).episode_end.or(end);
    }
    assert_eq!(end.map(|e| e.outcome), Some(EpisodeOutcome::Timeout));
    assert_eq!(
        room.state(),
        EpisodeState::ReplacementPending(ReplacementStage::Settling)
    );
    // destroyed agents linger until the next tick
    assert!(old_roster.iter().all(|id| room.store().contains(id)));

    let settled = room.step(&[]);
    assert_eq!(
        settled.state,
        EpisodeState::ReplacementPending(ReplacementStage::Reconnecting)
    );
    assert!(old_roster.iter().all(|id| !room.store().contains(id)));
    assert_eq!(room.n_agents(), 2);
    assert_eq!(room.group().members(), room.roster());

    let reconnected = room.step(&[]);
    assert_eq!(reconnected.state, EpisodeState::Running);
    let table = id_of(&room, "Table_Glass");
    let chair = room.agent_by_name("Chair_Wood").unwrap();
    assert_eq!(chair.as_child().unwrap().parent.as_deref(), Some(table.as_str()));
    assert_eq!(room.active_count(), room.n_agents());
}

#[test]
fn purge_stale_unregisters_missing_agents() {
    let mut room = RoomEpisode::new(RoomConfig::default(), two_tables(), 6).unwrap();
    room.reset();
    let table = id_of(&room, "Table_01");
    room.store.destroy(&table);
    assert_eq!(room.purge_stale(), 1);
    assert_eq!(room.n_agents(), 1);
    assert!(!room.group().is_registered(&table));
    assert_eq!(room.group().members(), room.roster());
}

#[test]
fn successful_episode_is_captured() {
    let labels = SharedCapture::default();
    let config = RoomConfig {
        max_environment_steps: 1000,
        capture_episodes: true,
        room_number: 3,
        ..RoomConfig::default()
    };
    let layout = RoomLayout::rectangular(10.0, 10.0).with_agent(AgentBlueprint::furniture("Table_01", 1.0, 1.0));
    let mut room = RoomEpisode::new(config, layout, 1)
        .unwrap()
        .with_capture(Box::new(labels.clone()));
    room.reset();
    place(&mut room, "Table_01", 0.0, -3.5, 0.0);
    room.step(&idle(&room));
    let r = room.step(&face_wall(&room));
    assert_eq!(r.episode_end.map(|e| e.outcome), Some(EpisodeOutcome::Success));
    assert_eq!(*labels.0.lock().unwrap(), vec!["Scene_Episode_3_0".to_string()]);
}

#[test]
fn capture_failure_is_not_fatal() {
    let config = RoomConfig {
        capture_episodes: true,
        ..RoomConfig::default()
    };
    let layout = RoomLayout::rectangular(10.0, 10.0).with_agent(AgentBlueprint::furniture("Table_01", 1.0, 1.0));
    let mut room = RoomEpisode::new(config, layout, 1)
        .unwrap()
        .with_capture(Box::new(BrokenCapture));
    room.reset();
    place(&mut room, "Table_01", 0.0, -3.5, 0.0);
    room.step(&idle(&room));
    let r = room.step(&face_wall(&room));
    assert_eq!(r.episode_end.map(|e| e.outcome), Some(EpisodeOutcome::Success));
    assert_eq!(room.state(), EpisodeState::Running);
}

#[test]
fn overlapping_agents_are_penalised_at_end() {
    let mut room = RoomEpisode::new(room_config(1), two_tables(), 1).unwrap();
    room.reset();
    place(&mut room, "Table_01", 0.0, 0.0, 0.0);
    place(&mut room, "Sofa_01", 0.5, 0.0, 0.0);
    assert_eq!(room.overlap_pairs(), 1);
    let end = room.step(&idle(&room)).episode_end.unwrap();
    assert_eq!(end.overlap_pairs, 1);
    let expected = -0.5 - 0.5 - 0.2;
    assert!((end.summary.group_reward - expected).abs() < 1e-9);
}
