//! Configuration for the room environment and its agents.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-agent reward targets and weights.
///
/// Read-only for the duration of an episode; only the agent's live state
/// changes while stepping.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RewardSpec {
    /// Ideal distance to the target (wall gap or parent centre distance).
    pub target_distance: f64,
    /// Accepted deviation from `target_distance`.
    pub freeze_tolerance: f64,
    /// Alignment succeeds when the forward dot product exceeds this value.
    pub angle_threshold_cos: f64,
    /// Distance reward weight. Only child agents read it; furniture
    /// positioning uses the fixed penalties in [`FurnitureSettings`].
    pub w_dist: f64,
    /// Angle reward weight.
    pub w_angle: f64,
    /// One-time bonus granted on success.
    pub success_bonus: f64,
}

impl RewardSpec {
    /// Defaults for wall-targeting furniture.
    pub fn furniture() -> Self {
        Self {
            target_distance: 1.0,
            freeze_tolerance: 0.2,
            angle_threshold_cos: 0.9,
            w_dist: 1.0,
            w_angle: 0.1,
            success_bonus: 0.5,
        }
    }

    /// Defaults for child agents placed relative to a parent.
    pub fn child() -> Self {
        Self {
            target_distance: 1.0,
            freeze_tolerance: 0.2,
            angle_threshold_cos: 0.9,
            w_dist: 0.5,
            w_angle: 0.3,
            success_bonus: 1.0,
        }
    }

    fn validate(&self, fields: [&'static str; 6]) -> Result<(), ConfigError> {
        let values = [
            self.target_distance,
            self.freeze_tolerance,
            self.angle_threshold_cos,
            self.w_dist,
            self.w_angle,
            self.success_bonus,
        ];
        for (field, value) in fields.into_iter().zip(values) {
            if !value.is_finite() {
                return Err(ConfigError::InvalidParameter { field, value });
            }
        }
        if self.freeze_tolerance < 0.0 {
            return Err(ConfigError::InvalidParameter {
                field: fields[1],
                value: self.freeze_tolerance,
            });
        }
        if !(-1.0..=1.0).contains(&self.angle_threshold_cos) {
            return Err(ConfigError::InvalidParameter {
                field: fields[2],
                value: self.angle_threshold_cos,
            });
        }
        Ok(())
    }
}

impl Default for RewardSpec {
    fn default() -> Self {
        Self::furniture()
    }
}

/// Shaping knobs specific to wall-targeting furniture agents.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FurnitureSettings {
    /// Gap below which the agent is considered too close to its wall.
    pub min_clearance: f64,
    /// Per-step penalty while closer than `min_clearance`.
    pub clearance_penalty: f64,
    /// Bonus for entering the Aligning phase.
    pub aligning_bonus: f64,
    /// Displacement below which a step counts as stuck.
    pub stuck_epsilon: f64,
    /// Stuck steps tolerated before the escape manoeuvre.
    pub frustration_threshold: u32,
    /// Penalty applied by the escape manoeuvre.
    pub frustration_penalty: f64,
    /// Radius inside which other furniture repels.
    pub social_distance: f64,
    /// Repulsion penalty at zero distance.
    pub repulsion_penalty: f64,
    /// Penalty for bumping into a frozen agent.
    pub blocking_penalty: f64,
    /// Penalty for a frozen agent that yields its place.
    pub yield_penalty: f64,
}

impl Default for FurnitureSettings {
    fn default() -> Self {
        Self {
            min_clearance: 0.5,
            clearance_penalty: 0.05,
            aligning_bonus: 0.5,
            stuck_epsilon: 0.01,
            frustration_threshold: 50,
            frustration_penalty: 0.5,
            social_distance: 2.0,
            repulsion_penalty: 0.5,
            blocking_penalty: 0.7,
            yield_penalty: 0.1,
        }
    }
}

/// Shaping knobs specific to child agents.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChildSettings {
    /// Orientation weight applied when facing away from the parent.
    pub w_angle_away: f64,
}

impl Default for ChildSettings {
    fn default() -> Self {
        Self { w_angle_away: 0.1 }
    }
}

/// Configuration for a room episode coordinator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoomConfig {
    // --- Episode ---
    /// Step budget per episode. Also the per-agent MaxStep for time costs.
    pub max_environment_steps: u32,
    /// Hurry-up group penalty, applied as `-hurry_up_penalty / max_steps` per step.
    pub hurry_up_penalty: f64,
    /// Success group bonus numerator (`scale / max_steps`).
    pub completion_bonus_scale: f64,
    /// Fixed group reward on success.
    pub completion_reward: f64,
    /// Fixed group penalty on timeout.
    pub timeout_penalty: f64,
    /// Group penalty per overlapping agent pair at episode end.
    pub overlap_penalty: f64,
    /// Child completions that force the episode to end.
    pub child_completion_quota: u32,

    // --- Placement ---
    /// Rejection sampling retry budget.
    pub placement_attempts: usize,

    // --- Motion ---
    /// Translation speed (units per second).
    pub move_speed: f64,
    /// Duration of one simulation step (seconds).
    pub delta_t: f64,

    // --- Between episodes ---
    /// Swap agents for same-prefix variants between episodes.
    pub replace_between_episodes: bool,
    /// Capture a scene image after successful episodes.
    pub capture_episodes: bool,
    /// Room index used in capture labels.
    pub room_number: u32,

    // --- Agents ---
    pub furniture_reward: RewardSpec,
    pub child_reward: RewardSpec,
    pub furniture: FurnitureSettings,
    pub child: ChildSettings,
}

impl RoomConfig {
    /// Per-step time cost for agents (`1 / MaxStep`).
    pub fn time_cost(&self) -> f64 {
        1.0 / self.max_environment_steps.max(1) as f64
    }

    /// Distance an agent translates in one step.
    pub fn step_length(&self) -> f64 {
        self.move_speed * self.delta_t
    }

    /// Checks that every parameter is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_environment_steps == 0 {
            return Err(ConfigError::ZeroStepBudget);
        }
        if self.placement_attempts == 0 {
            return Err(ConfigError::ZeroPlacementAttempts);
        }
        let positive = [
            ("move_speed", self.move_speed),
            ("delta_t", self.delta_t),
            ("furniture.social_distance", self.furniture.social_distance),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidParameter { field, value });
            }
        }
        let non_negative = [
            ("hurry_up_penalty", self.hurry_up_penalty),
            ("completion_bonus_scale", self.completion_bonus_scale),
            ("completion_reward", self.completion_reward),
            ("timeout_penalty", self.timeout_penalty),
            ("overlap_penalty", self.overlap_penalty),
            ("furniture.min_clearance", self.furniture.min_clearance),
            ("furniture.stuck_epsilon", self.furniture.stuck_epsilon),
            ("furniture.repulsion_penalty", self.furniture.repulsion_penalty),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidParameter { field, value });
            }
        }
        self.furniture_reward.validate([
            "furniture_reward.target_distance",
            "furniture_reward.freeze_tolerance",
            "furniture_reward.angle_threshold_cos",
            "furniture_reward.w_dist",
            "furniture_reward.w_angle",
            "furniture_reward.success_bonus",
        ])?;
        self.child_reward.validate([
            "child_reward.target_distance",
            "child_reward.freeze_tolerance",
            "child_reward.angle_threshold_cos",
            "child_reward.w_dist",
            "child_reward.w_angle",
            "child_reward.success_bonus",
        ])?;
        Ok(())
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_environment_steps: 25_000,
            hurry_up_penalty: 0.5,
            completion_bonus_scale: 100.0,
            completion_reward: 1.0,
            timeout_penalty: 0.5,
            overlap_penalty: 0.2,
            child_completion_quota: 1,
            placement_attempts: 50,
            move_speed: 2.0,
            delta_t: 0.02,
            replace_between_episodes: false,
            capture_episodes: false,
            room_number: 0,
            furniture_reward: RewardSpec::furniture(),
            child_reward: RewardSpec::child(),
            furniture: FurnitureSettings::default(),
            child: ChildSettings::default(),
        }
    }
}
