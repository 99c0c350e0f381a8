//! Random policy for testing and baselines.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::trait_::Policy;
use crate::agent::{AgentAction, Movement, Rotation};

/// Uniformly random action selection.
///
/// Each agent independently draws both action branches. Used for sanity
/// checks and as a lower-bound baseline.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    /// Creates a new random policy with a reproducible seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn select_actions(&mut self, observations: &[Vec<f64>]) -> Vec<AgentAction> {
        (0..observations.len())
            .map(|_| {
                AgentAction::from_discrete(
                    self.rng.gen_range(0..Movement::COUNT),
                    self.rng.gen_range(0..Rotation::COUNT),
                )
            })
            .collect()
    }

    fn name(&self) -> &str {
        "random"
    }
}
