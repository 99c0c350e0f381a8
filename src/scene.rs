//! Object hierarchy holding the room's agents.
//!
//! Agents live in two ordered groups (furniture and child). Destruction is
//! deferred: a destroyed agent stays in the store, marked, until
//! [`AgentStore::flush_destroyed`] runs on a later tick.

use std::collections::{HashMap, HashSet};

use crate::agent::Agent;
use crate::config::{RewardSpec, RoomConfig};
use crate::types::Footprint;
use crate::Id;

/// Which controller an agent object carries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlueprintRole {
    Furniture,
    /// Child agent, optionally naming its parent object.
    Child { parent: Option<String> },
}

/// Description of an agent object that can be instantiated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentBlueprint {
    pub name: String,
    pub footprint: Footprint,
    pub role: BlueprintRole,
    /// Overrides the room's default reward spec for this role.
    pub reward: Option<RewardSpec>,
}

impl AgentBlueprint {
    pub fn furniture(name: impl Into<String>, width: f64, depth: f64) -> Self {
        Self {
            name: name.into(),
            footprint: Footprint::new(width, depth),
            role: BlueprintRole::Furniture,
            reward: None,
        }
    }

    pub fn child(name: impl Into<String>, width: f64, depth: f64, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            footprint: Footprint::new(width, depth),
            role: BlueprintRole::Child {
                parent: parent.map(str::to_string),
            },
            reward: None,
        }
    }

    pub fn with_reward(mut self, reward: RewardSpec) -> Self {
        self.reward = Some(reward);
        self
    }

    pub fn group(&self) -> Group {
        match self.role {
            BlueprintRole::Furniture => Group::Furniture,
            BlueprintRole::Child { .. } => Group::Child,
        }
    }

    /// Builds a fresh agent using `config` for every unset parameter.
    pub fn instantiate(&self, config: &RoomConfig) -> Agent {
        match &self.role {
            BlueprintRole::Furniture => Agent::furniture(
                self.name.clone(),
                self.footprint,
                self.reward.unwrap_or(config.furniture_reward),
                config.furniture,
            ),
            BlueprintRole::Child { parent } => Agent::child(
                self.name.clone(),
                self.footprint,
                self.reward.unwrap_or(config.child_reward),
                config.child,
                parent.clone(),
            ),
        }
    }
}

/// Parent grouping an agent object lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Furniture,
    Child,
}

#[derive(Debug, Default)]
pub struct AgentStore {
    agents: HashMap<Id, Agent>,
    furniture: Vec<Id>,
    children: Vec<Id>,
    pending_destroy: HashSet<Id>,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an agent under the group matching its kind and returns its id.
    pub fn insert(&mut self, agent: Agent) -> Id {
        let id = agent.id().to_string();
        if agent.is_furniture() {
            self.furniture.push(id.clone());
        } else {
            self.children.push(id.clone());
        }
        self.agents.insert(id.clone(), agent);
        id
    }

    pub fn instantiate(&mut self, blueprint: &AgentBlueprint, config: &RoomConfig) -> Id {
        self.insert(blueprint.instantiate(config))
    }

    /// Marks an agent for destruction. It stays visible until the next flush.
    pub fn destroy(&mut self, id: &str) -> bool {
        if !self.agents.contains_key(id) {
            return false;
        }
        self.pending_destroy.insert(id.to_string())
    }

    pub fn is_pending_destroy(&self, id: &str) -> bool {
        self.pending_destroy.contains(id)
    }

    /// Removes every agent marked for destruction and returns their ids.
    pub fn flush_destroyed(&mut self) -> Vec<Id> {
        if self.pending_destroy.is_empty() {
            return Vec::new();
        }
        let doomed = std::mem::take(&mut self.pending_destroy);
        self.furniture.retain(|id| !doomed.contains(id));
        self.children.retain(|id| !doomed.contains(id));
        let mut removed: Vec<Id> = doomed
            .into_iter()
            .filter(|id| self.agents.remove(id).is_some())
            .collect();
        removed.sort();
        removed
    }

    /// Current members of a group, in insertion order.
    pub fn members(&self, group: Group) -> &[Id] {
        match group {
            Group::Furniture => &self.furniture,
            Group::Child => &self.children,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// Present and not awaiting destruction.
    pub fn is_live(&self, id: &str) -> bool {
        self.contains(id) && !self.is_pending_destroy(id)
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Agent> {
        self.furniture
            .iter()
            .chain(&self.children)
            .filter_map(|id| self.agents.get(id))
            .find(|a| a.name() == name)
    }

    /// `(id, name)` of live agents in a group.
    pub fn live_names(&self, group: Group) -> Vec<(&str, &str)> {
        self.members(group)
            .iter()
            .filter(|id| !self.is_pending_destroy(id))
            .filter_map(|id| self.agents.get(id))
            .map(|a| (a.id(), a.name()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_two() -> (AgentStore, Id, Id) {
        let config = RoomConfig::default();
        let mut s = AgentStore::new();
        let t = s.instantiate(&AgentBlueprint::furniture("Table_01", 1.0, 1.0), &config);
        let c = s.instantiate(&AgentBlueprint::child("Chair_01", 0.5, 0.5, Some("Table_01")), &config);
        (s, t, c)
    }

    #[test]
    fn instantiate_groups_by_role() {
        let (s, t, c) = store_with_two();
        assert_eq!(s.members(Group::Furniture), &[t]);
        assert_eq!(s.members(Group::Child), &[c]);
        assert_eq!(s.find_by_name("Chair_01").map(|a| a.is_furniture()), Some(false));
    }

    #[test]
    fn destroy_is_deferred_until_flush() {
        let (mut s, t, _) = store_with_two();
        assert!(s.destroy(&t));
        assert!(s.contains(&t));
        assert!(!s.is_live(&t));
        assert!(s.live_names(Group::Furniture).is_empty());
        assert_eq!(s.flush_destroyed(), vec![t.clone()]);
        assert!(!s.contains(&t));
        assert!(s.members(Group::Furniture).is_empty());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn destroying_unknown_id_is_noop() {
        let (mut s, _, _) = store_with_two();
        assert!(!s.destroy("missing"));
        assert!(s.flush_destroyed().is_empty());
    }

    #[test]
    fn blueprint_reward_override() {
        let config = RoomConfig::default();
        let spec = RewardSpec {
            target_distance: 2.0,
            ..RewardSpec::furniture()
        };
        let agent = AgentBlueprint::furniture("Sofa_01", 2.0, 1.0)
            .with_reward(spec)
            .instantiate(&config);
        assert_eq!(agent.spec.target_distance, 2.0);
    }
}
