// terrarium_core/src/types.rs

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

// =========================================================================
// == Poses ==
// =========================================================================

/// A 2D rigid-body pose: position plus heading angle (radians, CCW).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2 {
    pub position: Point2<f64>,
    pub heading: f64,
}

impl Pose2 {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            heading,
        }
    }

    /// Unit vector pointing along the heading.
    pub fn forward(&self) -> Vector2<f64> {
        Vector2::new(self.heading.cos(), self.heading.sin())
    }
}

// =========================================================================
// == Identity Handles ==
// =========================================================================

// Entities and agents live in disjoint identity spaces. The scene adapter
// assigns these handles; the core only ever compares them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

/// Opaque handle for one collider shape in the physics scene. A single
/// entity may own several shapes (visible body, interaction halo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(pub u64);

/// Handle for a rigid body a sensor can be anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// What a sensor hit resolves to. Entities and agents stay distinct, but
/// occlusion and duplicate resolution treat both uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionTarget {
    Entity(EntityId),
    Agent(AgentId),
}

// =========================================================================
// == Collision Categories ==
// =========================================================================

/// Closed set of collision categories shared between the physics adapter
/// and the sensor layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionCategory {
    /// Solid, sensor-detectable geometry.
    Visible,
    /// Non-solid interaction halos (still detectable by rays).
    Interaction,
    /// Probe shapes belonging to sensors themselves. Never detectable.
    SensorOnly,
}

impl CollisionCategory {
    pub const fn bit(self) -> u32 {
        match self {
            CollisionCategory::Visible => 1 << 0,
            CollisionCategory::Interaction => 1 << 1,
            CollisionCategory::SensorOnly => 1 << 2,
        }
    }
}

/// Bitmask over [`CollisionCategory`] used when issuing segment queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryFilter {
    mask: u32,
}

impl CategoryFilter {
    /// The filter every sensor query uses: everything except the reserved
    /// sensor-only category, so sensors never detect each other.
    pub const fn sensing() -> Self {
        Self {
            mask: CollisionCategory::Visible.bit() | CollisionCategory::Interaction.bit(),
        }
    }

    pub const fn contains(self, category: CollisionCategory) -> bool {
        self.mask & category.bit() != 0
    }

    pub const fn mask(self) -> u32 {
        self.mask
    }
}

// =========================================================================
// == Tests ==
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn forward_follows_heading() {
        let pose = Pose2::new(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let fwd = pose.forward();
        assert_relative_eq!(fwd.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(fwd.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn sensing_filter_excludes_sensor_category() {
        let filter = CategoryFilter::sensing();
        assert!(filter.contains(CollisionCategory::Visible));
        assert!(filter.contains(CollisionCategory::Interaction));
        assert!(!filter.contains(CollisionCategory::SensorOnly));
    }

    #[test]
    fn identity_spaces_are_disjoint() {
        // Same raw id, different spaces: must never compare equal.
        let a = DetectionTarget::Entity(EntityId(7));
        let b = DetectionTarget::Agent(AgentId(7));
        assert_ne!(a, b);
    }
}
