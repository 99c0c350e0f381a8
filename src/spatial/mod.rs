//! Spatial queries consumed by the agents and the room coordinator.
//!
//! The physics/collision engine is an external collaborator; the core only
//! talks to it through [`SpatialQuery`]. [`BoxWorld`] is an exact,
//! deterministic backend over axis-aligned boxes.

mod world;

pub use world::BoxWorld;

use crate::types::{Aabb, Vec2};
use crate::Id;

/// Collision layer of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Wall,
    Furniture,
    Child,
}

/// A shape registered with the spatial backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub bounds: Aabb,
    /// Facing direction of the shape on the floor plane.
    pub forward: Vec2,
    pub layer: Layer,
}

/// Result of a nearest-wall query. Recomputed whenever needed and never
/// carried across episodes.
#[derive(Debug, Clone, PartialEq)]
pub struct WallInfo {
    /// Gap between the agent's shape and the wall's shape.
    pub distance: f64,
    /// Wall facing direction (points into the room).
    pub normal: Vec2,
    pub wall: Id,
}

/// Read/write access to the collision world.
///
/// Implementations must be exact and deterministic for a fixed world state.
pub trait SpatialQuery: Send {
    /// Closest point on `shape` to `point`.
    fn nearest_point(&self, shape: &str, point: Vec2) -> Option<Vec2>;

    /// Bounding volume of `shape`.
    fn bounds_of(&self, shape: &str) -> Option<Aabb>;

    /// Facing direction of `shape`.
    fn forward_of(&self, shape: &str) -> Option<Vec2>;

    fn layer_of(&self, shape: &str) -> Option<Layer>;

    /// Shapes whose bounds strictly overlap the box at `center`.
    fn overlap_box(&self, center: Vec2, half_extents: Vec2) -> Vec<Id>;

    /// Shapes of `layer` whose centre lies within `radius` of `center`.
    fn overlap_circle(&self, center: Vec2, radius: f64, layer: Layer) -> Vec<Id>;

    /// All shapes of `layer`, in a stable order.
    fn shapes_in_layer(&self, layer: Layer) -> Vec<Id>;

    /// Inserts or moves a shape.
    fn upsert(&mut self, shape: &str, collider: Collider);

    fn remove(&mut self, shape: &str) -> Option<Collider>;
}

/// Gap between two shapes: the nearest point on `target` to the centre of
/// `agent`, then the nearest point on `agent` to that point.
pub fn shape_distance<W: SpatialQuery + ?Sized>(world: &W, agent: &str, target: &str) -> Option<f64> {
    let center = world.bounds_of(agent)?.center();
    let on_target = world.nearest_point(target, center)?;
    let on_agent = world.nearest_point(agent, on_target)?;
    Some(on_agent.distance_to(&on_target))
}

/// Finds the wall nearest to `agent`.
pub fn nearest_wall<W: SpatialQuery + ?Sized>(world: &W, agent: &str) -> Option<WallInfo> {
    let mut best: Option<WallInfo> = None;
    for wall in world.shapes_in_layer(Layer::Wall) {
        let Some(distance) = shape_distance(world, agent, &wall) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| distance < b.distance) {
            best = Some(WallInfo {
                distance,
                normal: world.forward_of(&wall).unwrap_or_default(),
                wall,
            });
        }
    }
    best
}
