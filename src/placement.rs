//! Collision-free spawn poses by bounded rejection sampling.

use rand::Rng;
use tracing::warn;

use crate::spatial::SpatialQuery;
use crate::types::{Aabb, Footprint, Vec2};

/// A sampled spawn pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec2,
    /// Yaw in degrees, a multiple of 90.
    pub yaw: f64,
    /// The retry budget ran out and `position` may overlap existing shapes.
    pub overlap_risk: bool,
    /// Samples drawn, including the returned one.
    pub attempts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementSampler {
    pub max_attempts: usize,
}

impl Default for PlacementSampler {
    fn default() -> Self {
        Self { max_attempts: 50 }
    }
}

impl PlacementSampler {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Samples a pose for `footprint` inside `floor`.
    ///
    /// Each attempt draws a quarter-turn yaw and a centre uniformly inside
    /// the floor shrunk by the rotated half extents, so the box stays on the
    /// floor. The first pose whose box overlaps no shape (other than
    /// `ignore`) wins; otherwise the last sample is returned with
    /// `overlap_risk` set.
    pub fn sample<R: Rng>(
        &self,
        rng: &mut R,
        floor: &Aabb,
        footprint: &Footprint,
        world: &dyn SpatialQuery,
        ignore: Option<&str>,
    ) -> Placement {
        let attempts = self.max_attempts.max(1);
        let mut last = Placement {
            position: floor.center(),
            yaw: 0.0,
            overlap_risk: true,
            attempts,
        };
        for attempt in 1..=attempts {
            let yaw = 90.0 * rng.gen_range(0..4u32) as f64;
            let half = footprint.half_extents(yaw);
            let area = floor.shrunk(half).unwrap_or(Aabb {
                min: floor.center(),
                max: floor.center(),
            });
            let position = Vec2::new(
                rng.gen_range(area.min.x..=area.max.x),
                rng.gen_range(area.min.z..=area.max.z),
            );
            let blocked = world
                .overlap_box(position, half)
                .iter()
                .any(|id| Some(id.as_str()) != ignore);
            if !blocked {
                return Placement {
                    position,
                    yaw,
                    overlap_risk: false,
                    attempts: attempt,
                };
            }
            last.position = position;
            last.yaw = yaw;
        }
        warn!(
            attempts,
            position = %last.position,
            "no collision-free placement found, using last sample"
        );
        last
    }
}
