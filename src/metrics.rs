//! Evaluation metrics for the room environment.
//!
//! Drives a [`RoomEpisode`] with a policy and aggregates per-episode
//! outcomes and rewards.

use std::fmt;

use crate::policy::Policy;
use crate::room::{EpisodeEnd, EpisodeOutcome, RoomEpisode};

/// Aggregated evaluation metrics over multiple episodes.
#[derive(Debug, Clone, Default)]
pub struct EvaluationMetrics {
    /// Fraction of episodes where every agent froze.
    pub success_rate: f64,
    /// Fraction of episodes cut by the step budget.
    pub timeout_rate: f64,
    /// Fraction of episodes ended by the child completion quota.
    pub quota_rate: f64,
    /// Mean episode length in steps.
    pub mean_episode_length: f64,
    /// Mean group-level reward (hurry-up, terminal, overlap).
    pub mean_group_reward: f64,
    /// Mean sum of per-agent rewards.
    pub mean_agent_reward: f64,
    /// Mean total reward.
    pub mean_total_reward: f64,
    /// Mean overlapping pairs at episode end.
    pub mean_overlap_pairs: f64,
    /// Number of episodes evaluated.
    pub n_episodes: usize,
}

impl EvaluationMetrics {
    /// Evaluates a policy until `n_episodes` episodes have finished.
    ///
    /// # Arguments
    ///
    /// * `room` - The room to evaluate in; it is reset first
    /// * `policy` - The policy to evaluate
    /// * `n_episodes` - Number of episodes to run
    pub fn evaluate(room: &mut RoomEpisode, policy: &mut dyn Policy, n_episodes: usize) -> Self {
        let mut ends: Vec<EpisodeEnd> = Vec::with_capacity(n_episodes);
        let mut obs = room.reset();
        while ends.len() < n_episodes {
            let actions = policy.select_actions(&obs);
            let result = room.step(&actions);
            if let Some(end) = result.episode_end {
                ends.push(end);
            }
            obs = result.observations;
        }
        Self::from_ends(&ends)
    }

    /// Aggregates already collected episode reports.
    pub fn from_ends(ends: &[EpisodeEnd]) -> Self {
        if ends.is_empty() {
            return Self::default();
        }
        let n = ends.len() as f64;
        let rate = |o: EpisodeOutcome| ends.iter().filter(|e| e.outcome == o).count() as f64 / n;
        let mean = |f: fn(&EpisodeEnd) -> f64| ends.iter().map(f).sum::<f64>() / n;

        Self {
            success_rate: rate(EpisodeOutcome::Success),
            timeout_rate: rate(EpisodeOutcome::Timeout),
            quota_rate: rate(EpisodeOutcome::QuotaReached),
            mean_episode_length: mean(|e| f64::from(e.summary.steps)),
            mean_group_reward: mean(|e| e.summary.group_reward),
            mean_agent_reward: mean(|e| e.summary.agent_reward),
            mean_total_reward: mean(|e| e.summary.total()),
            mean_overlap_pairs: mean(|e| e.overlap_pairs as f64),
            n_episodes: ends.len(),
        }
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Evaluation Metrics ({} episodes) ===",
            self.n_episodes
        )?;
        writeln!(f, "  Success rate:          {:.1}%", self.success_rate * 100.0)?;
        writeln!(f, "  Timeout rate:          {:.1}%", self.timeout_rate * 100.0)?;
        writeln!(f, "  Quota rate:            {:.1}%", self.quota_rate * 100.0)?;
        writeln!(f, "  Mean episode length:   {:.1}", self.mean_episode_length)?;
        writeln!(f, "  Mean group reward:     {:.3}", self.mean_group_reward)?;
        writeln!(f, "  Mean agent reward:     {:.3}", self.mean_agent_reward)?;
        writeln!(f, "  Mean total reward:     {:.3}", self.mean_total_reward)?;
        writeln!(f, "  Mean overlap pairs:    {:.2}", self.mean_overlap_pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::policy::RandomPolicy;
    use crate::room::RoomLayout;
    use crate::scene::AgentBlueprint;

    #[test]
    fn evaluate_completes() {
        let config = RoomConfig {
            max_environment_steps: 10,
            ..RoomConfig::default()
        };
        let layout = RoomLayout::rectangular(8.0, 6.0)
            .with_agent(AgentBlueprint::furniture("Table_01", 1.0, 1.0))
            .with_agent(AgentBlueprint::furniture("Shelf_01", 1.5, 0.4));
        let mut room = RoomEpisode::new(config, layout, 42).unwrap();
        let mut policy = RandomPolicy::new(42);
        let metrics = EvaluationMetrics::evaluate(&mut room, &mut policy, 3);
        assert_eq!(metrics.n_episodes, 3);
        let rates = metrics.success_rate + metrics.timeout_rate + metrics.quota_rate;
        assert!((rates - 1.0).abs() < 1e-12);
        assert!(metrics.mean_episode_length <= 10.0);
    }

    #[test]
    fn empty_report_is_zeroed() {
        let m = EvaluationMetrics::from_ends(&[]);
        assert_eq!(m.n_episodes, 0);
        assert_eq!(m.mean_total_reward, 0.0);
        assert!(m.to_string().contains("0 episodes"));
    }
}
