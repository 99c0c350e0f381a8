//! Optional collaborators called between episodes: scene capture and agent
//! replacement.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::agent::Pose;
use crate::config::RoomConfig;
use crate::error::CaptureError;
use crate::relation::name_prefix;
use crate::scene::{AgentBlueprint, AgentStore, Group};
use crate::Id;

/// Captures the finished scene of an episode.
pub trait SceneCapture: Send {
    fn capture_episode(&mut self, label: &str) -> Result<(), CaptureError>;
}

/// Keeps capture labels in memory.
#[derive(Debug, Clone, Default)]
pub struct CaptureLog {
    pub labels: Vec<String>,
}

impl SceneCapture for CaptureLog {
    fn capture_episode(&mut self, label: &str) -> Result<(), CaptureError> {
        self.labels.push(label.to_string());
        Ok(())
    }
}

/// Appends one line per captured episode to a manifest file.
#[derive(Debug, Clone)]
pub struct ManifestCapture {
    path: PathBuf,
}

impl ManifestCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SceneCapture for ManifestCapture {
    fn capture_episode(&mut self, label: &str) -> Result<(), CaptureError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{label}")?;
        Ok(())
    }
}

/// Agents touched by one replacement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacement {
    /// Marked for destruction; still present until the store is flushed.
    pub destroyed: Vec<Id>,
    pub spawned: Vec<Id>,
}

impl Replacement {
    pub fn is_empty(&self) -> bool {
        self.destroyed.is_empty() && self.spawned.is_empty()
    }
}

/// Swaps agents for other variants between episodes.
pub trait AgentReplacer: Send {
    fn replace_agents(
        &mut self,
        store: &mut AgentStore,
        config: &RoomConfig,
        rng: &mut StdRng,
    ) -> Replacement;
}

/// Replacement pool keyed by name prefix.
///
/// Every live agent whose prefix has registered variants is destroyed and a
/// randomly chosen variant is spawned at the same pose.
#[derive(Debug, Clone, Default)]
pub struct PrefabCatalog {
    variants: BTreeMap<String, Vec<AgentBlueprint>>,
}

impl PrefabCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variant under its own name prefix.
    pub fn add_variant(&mut self, blueprint: AgentBlueprint) {
        self.variants
            .entry(name_prefix(&blueprint.name).to_string())
            .or_default()
            .push(blueprint);
    }

    pub fn with_variant(mut self, blueprint: AgentBlueprint) -> Self {
        self.add_variant(blueprint);
        self
    }

    pub fn variants_for(&self, prefix: &str) -> &[AgentBlueprint] {
        self.variants.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl AgentReplacer for PrefabCatalog {
    fn replace_agents(
        &mut self,
        store: &mut AgentStore,
        config: &RoomConfig,
        rng: &mut StdRng,
    ) -> Replacement {
        let mut out = Replacement::default();
        for group in [Group::Furniture, Group::Child] {
            let targets: Vec<(Id, String)> = store
                .live_names(group)
                .into_iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect();
            for (id, name) in targets {
                let prefix = name_prefix(&name);
                let Some(blueprint) = self.variants_for(prefix).choose(rng) else {
                    warn!(agent = %name, prefix, "no replacement variants");
                    continue;
                };
                let Some(old) = store.get(&id) else {
                    continue;
                };
                let pose = Pose {
                    position: old.body.position,
                    yaw: old.body.yaw,
                };
                let mut fresh = blueprint.instantiate(config);
                fresh.set_pose(pose);
                debug!(old = %name, new = %fresh.name(), "replacing agent");
                store.destroy(&id);
                out.destroyed.push(id);
                out.spawned.push(store.insert(fresh));
            }
        }
        out
    }
}
