//! Policy trait for the room environment.

use crate::agent::AgentAction;

/// A policy that selects actions for agents based on observations.
///
/// Each action carries one value per discrete branch: a movement and a
/// rotation relative to the agent's locked wall.
pub trait Policy: Send {
    /// Selects one action per agent given their observations.
    ///
    /// # Arguments
    ///
    /// * `observations` - Per-agent observation vectors (from [`ObservationBuilder`](crate::observation::ObservationBuilder))
    ///
    /// # Returns
    ///
    /// A vector of actions, one per agent.
    fn select_actions(&mut self, observations: &[Vec<f64>]) -> Vec<AgentAction>;

    /// Returns a human-readable name for this policy.
    fn name(&self) -> &str;
}
