//! Shared reward and episode-signal sink for all agents of one room.
//!
//! The external learner observes the emitted [`GroupSignal`]s as episode
//! boundaries and reads cumulative rewards from [`EpisodeSummary`].

use tracing::warn;

use crate::Id;

/// Signal emitted to the learner.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupSignal {
    Registered(Id),
    Unregistered(Id),
    /// Episode completed normally.
    EpisodeEnded(EpisodeSummary),
    /// Episode cut short by the step budget.
    EpisodeInterrupted(EpisodeSummary),
}

/// Rewards accumulated over one episode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeSummary {
    /// Steps recorded for the episode.
    pub steps: u32,
    /// Rewards added directly to the group (hurry-up, terminal, overlap).
    pub group_reward: f64,
    /// Sum of every per-agent reward routed through the group.
    pub agent_reward: f64,
    pub interrupted: bool,
}

impl EpisodeSummary {
    pub fn total(&self) -> f64 {
        self.group_reward + self.agent_reward
    }
}

/// Registration set plus reward accumulators.
#[derive(Debug, Clone, Default)]
pub struct MultiAgentGroup {
    members: Vec<Id>,
    group_reward: f64,
    agent_reward: f64,
    steps: u32,
    signals: Vec<GroupSignal>,
}

impl MultiAgentGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent. Returns `false` if it was already registered.
    pub fn register_agent(&mut self, id: &str) -> bool {
        if self.is_registered(id) {
            return false;
        }
        self.members.push(id.to_string());
        self.signals.push(GroupSignal::Registered(id.to_string()));
        true
    }

    /// Unregisters an agent. Returns `false` if it was not registered.
    pub fn unregister_agent(&mut self, id: &str) -> bool {
        let Some(index) = self.members.iter().position(|m| m == id) else {
            return false;
        };
        self.members.remove(index);
        self.signals.push(GroupSignal::Unregistered(id.to_string()));
        true
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.members.iter().any(|m| m == id)
    }

    /// Registered agents, in registration order.
    pub fn members(&self) -> &[Id] {
        &self.members
    }

    pub fn add_group_reward(&mut self, delta: f64) {
        self.group_reward += delta;
    }

    /// Routes one agent's reward into the episode total.
    pub fn add_agent_reward(&mut self, id: &str, delta: f64) {
        if !self.is_registered(id) {
            warn!(agent = id, delta, "reward from unregistered agent");
        }
        self.agent_reward += delta;
    }

    /// Counts one simulation step.
    pub fn record_step(&mut self) {
        self.steps += 1;
    }

    /// Running totals for the current episode.
    pub fn summary(&self) -> EpisodeSummary {
        EpisodeSummary {
            steps: self.steps,
            group_reward: self.group_reward,
            agent_reward: self.agent_reward,
            interrupted: false,
        }
    }

    pub fn end_group_episode(&mut self) -> EpisodeSummary {
        let summary = self.finish(false);
        self.signals.push(GroupSignal::EpisodeEnded(summary));
        summary
    }

    pub fn interrupt_group_episode(&mut self) -> EpisodeSummary {
        let summary = self.finish(true);
        self.signals.push(GroupSignal::EpisodeInterrupted(summary));
        summary
    }

    fn finish(&mut self, interrupted: bool) -> EpisodeSummary {
        let summary = EpisodeSummary {
            interrupted,
            ..self.summary()
        };
        self.group_reward = 0.0;
        self.agent_reward = 0.0;
        self.steps = 0;
        summary
    }

    /// Takes every signal emitted since the last drain.
    pub fn drain_signals(&mut self) -> Vec<GroupSignal> {
        std::mem::take(&mut self.signals)
    }
}
