//! Core geometric types for the room simulation.
//!
//! Everything lives on the horizontal floor plane: positions are `(x, z)`
//! pairs, orientation is a yaw angle in degrees and every shape is an
//! axis-aligned bounding box.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point or direction on the floor plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec2 {
    pub x: f64,
    pub z: f64,
}

impl Vec2 {
    /// Creates a new vector.
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self { x: 0.0, z: 0.0 }
    }

    /// Unit forward vector for a yaw angle in degrees.
    ///
    /// Yaw 0 faces `+z`, yaw 90 faces `+x`.
    pub fn from_yaw(yaw_deg: f64) -> Self {
        let r = yaw_deg.to_radians();
        Self::new(r.sin(), r.cos())
    }

    /// Yaw angle (degrees, in `[0, 360)`) of this direction.
    pub fn yaw(&self) -> f64 {
        normalize_yaw(self.x.atan2(self.z).to_degrees())
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Vec2) -> f64 {
        (*self - *other).length()
    }

    pub fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.z * other.z
    }

    /// Returns the unit vector in this direction, or zero if degenerate.
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len < 1e-12 {
            Self::zero()
        } else {
            Self::new(self.x / len, self.z / len)
        }
    }

    /// Component-wise clamp into `[min, max]`.
    pub fn clamped(&self, min: Vec2, max: Vec2) -> Self {
        Self::new(self.x.clamp(min.x, max.x), self.z.clamp(min.z, max.z))
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.z * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.z)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.z)
    }
}

/// Wraps a yaw angle into `[0, 360)`.
pub fn normalize_yaw(yaw_deg: f64) -> f64 {
    let y = yaw_deg % 360.0;
    if y < 0.0 {
        y + 360.0
    } else {
        y
    }
}

/// Axis-aligned bounding box on the floor plane.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Creates a box from its corners. Corners are reordered if needed.
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: Vec2::new(a.x.min(b.x), a.z.min(b.z)),
            max: Vec2::new(a.x.max(b.x), a.z.max(b.z)),
        }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(
            (self.max.x - self.min.x) * 0.5,
            (self.max.z - self.min.z) * 0.5,
        )
    }

    pub fn size(&self) -> Vec2 {
        self.half_extents() * 2.0
    }

    /// True if the box has positive, finite area.
    pub fn is_valid(&self) -> bool {
        let s = self.size();
        s.x.is_finite() && s.z.is_finite() && s.x > 0.0 && s.z > 0.0
    }

    /// Strict overlap test: boxes that only share an edge do not overlap.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.z < other.max.z
            && other.min.z < self.max.z
    }

    /// Closest point inside (or on) this box to `p`.
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamped(self.min, self.max)
    }

    /// Returns the box shrunk by `margin` on every side, or `None` if it
    /// would collapse.
    pub fn shrunk(&self, margin: Vec2) -> Option<Aabb> {
        let min = self.min + margin;
        let max = self.max - margin;
        if min.x > max.x || min.z > max.z {
            None
        } else {
            Some(Aabb { min, max })
        }
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.min, self.max)
    }
}

/// Local footprint of an agent (half width along local x, half depth along
/// local z).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Footprint {
    pub half_width: f64,
    pub half_depth: f64,
}

impl Footprint {
    pub fn new(width: f64, depth: f64) -> Self {
        Self {
            half_width: width * 0.5,
            half_depth: depth * 0.5,
        }
    }

    /// Both extents are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        [self.half_width, self.half_depth]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    /// World-space half extents of the footprint rotated by `yaw_deg`.
    pub fn half_extents(&self, yaw_deg: f64) -> Vec2 {
        let r = yaw_deg.to_radians();
        let (s, c) = (r.sin().abs(), r.cos().abs());
        Vec2::new(
            c * self.half_width + s * self.half_depth,
            s * self.half_width + c * self.half_depth,
        )
    }

    /// World-space bounding box at a pose.
    pub fn bounds_at(&self, center: Vec2, yaw_deg: f64) -> Aabb {
        Aabb::from_center(center, self.half_extents(yaw_deg))
    }

    /// Local size `(width, depth)`, independent of orientation.
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.half_width * 2.0, self.half_depth * 2.0)
    }
}
