use std::collections::BTreeMap;

use super::{Collider, Layer, SpatialQuery};
use crate::types::{Aabb, Vec2};
use crate::Id;

/// In-memory collision world over axis-aligned boxes.
///
/// Shapes are kept in a `BTreeMap` so every query returns ids in a stable
/// order.
#[derive(Debug, Clone, Default)]
pub struct BoxWorld {
    shapes: BTreeMap<Id, Collider>,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn get(&self, shape: &str) -> Option<&Collider> {
        self.shapes.get(shape)
    }
}

impl SpatialQuery for BoxWorld {
    fn nearest_point(&self, shape: &str, point: Vec2) -> Option<Vec2> {
        self.shapes.get(shape).map(|c| c.bounds.closest_point(point))
    }

    fn bounds_of(&self, shape: &str) -> Option<Aabb> {
        self.shapes.get(shape).map(|c| c.bounds)
    }

    fn forward_of(&self, shape: &str) -> Option<Vec2> {
        self.shapes.get(shape).map(|c| c.forward)
    }

    fn layer_of(&self, shape: &str) -> Option<Layer> {
        self.shapes.get(shape).map(|c| c.layer)
    }

    fn overlap_box(&self, center: Vec2, half_extents: Vec2) -> Vec<Id> {
        let probe = Aabb::from_center(center, half_extents);
        self.shapes
            .iter()
            .filter(|(_, c)| c.bounds.intersects(&probe))
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn overlap_circle(&self, center: Vec2, radius: f64, layer: Layer) -> Vec<Id> {
        self.shapes
            .iter()
            .filter(|(_, c)| c.layer == layer)
            .filter(|(_, c)| c.bounds.center().distance_to(&center) <= radius)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn shapes_in_layer(&self, layer: Layer) -> Vec<Id> {
        self.shapes
            .iter()
            .filter(|(_, c)| c.layer == layer)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn upsert(&mut self, shape: &str, collider: Collider) {
        self.shapes.insert(shape.to_string(), collider);
    }

    fn remove(&mut self, shape: &str) -> Option<Collider> {
        self.shapes.remove(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(center: Vec2, layer: Layer) -> Collider {
        Collider {
            bounds: Aabb::from_center(center, Vec2::new(0.5, 0.5)),
            forward: Vec2::new(0.0, 1.0),
            layer,
        }
    }

    #[test]
    fn overlap_box_finds_intersecting_shapes() {
        let mut w = BoxWorld::new();
        w.upsert("a", boxed(Vec2::new(0.0, 0.0), Layer::Furniture));
        w.upsert("b", boxed(Vec2::new(3.0, 0.0), Layer::Furniture));
        let hits = w.overlap_box(Vec2::new(0.6, 0.0), Vec2::new(0.5, 0.5));
        assert_eq!(hits, vec!["a".to_string()]);
    }

    #[test]
    fn overlap_circle_filters_by_layer() {
        let mut w = BoxWorld::new();
        w.upsert("a", boxed(Vec2::new(1.0, 0.0), Layer::Furniture));
        w.upsert("c", boxed(Vec2::new(1.0, 0.0), Layer::Child));
        let hits = w.overlap_circle(Vec2::zero(), 2.0, Layer::Furniture);
        assert_eq!(hits, vec!["a".to_string()]);
    }

    #[test]
    fn upsert_moves_and_remove_deletes() {
        let mut w = BoxWorld::new();
        w.upsert("a", boxed(Vec2::zero(), Layer::Furniture));
        w.upsert("a", boxed(Vec2::new(2.0, 2.0), Layer::Furniture));
        assert_eq!(w.len(), 1);
        assert_eq!(w.bounds_of("a").unwrap().center(), Vec2::new(2.0, 2.0));
        assert!(w.remove("a").is_some());
        assert!(w.is_empty());
    }
}
