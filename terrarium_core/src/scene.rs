// terrarium_core/src/scene.rs

//! The contract between the sensor layer and the physics/scene collaborator.
//!
//! The core never talks to a physics engine directly. Everything it needs
//! from the scene — segment queries, shape-to-entity resolution, poses and
//! surface textures — goes through [`SceneView`], so the concrete engine
//! (rapier2d in `terrarium_sim`, mocks in tests) can be swapped freely.

use nalgebra::Point2;

use crate::types::{BodyId, CategoryFilter, DetectionTarget, Pose2, ShapeId};

/// One raw collision returned by a segment query.
///
/// `alpha` is the path fraction along the cast segment: 0 at the origin,
/// 1 at maximum range. No ordering guarantee is assumed from the scene;
/// resolvers sort explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub shape: ShapeId,
    pub alpha: f64,
    /// Exact collision point in world coordinates.
    pub point: Point2<f64>,
}

/// Read-only view of the physics scene during one sensor update.
///
/// Implementations must be consistent within a single simulation step: the
/// scene is mutated only by the stepping phase that precedes sensor updates.
pub trait SceneView {
    /// Casts a segment from `origin` to `end` and returns every collision
    /// along it whose collision category passes `filter`. Unordered.
    fn segment_query(
        &self,
        origin: Point2<f64>,
        end: Point2<f64>,
        filter: CategoryFilter,
    ) -> Vec<SegmentHit>;

    /// Resolves a collider shape to the entity or agent owning it.
    /// `None` for shapes that belong to neither (e.g. scene decoration).
    fn target_of(&self, shape: ShapeId) -> Option<DetectionTarget>;

    /// Current pose of an anchor body.
    fn body_pose(&self, body: BodyId) -> Option<Pose2>;

    /// Current pose of a detected entity or agent.
    fn target_pose(&self, target: DetectionTarget) -> Option<Pose2>;

    /// Dimensions (width, height) of the target's surface texture.
    fn texture_size(&self, target: DetectionTarget) -> Option<(u32, u32)>;

    /// Samples the target's surface texture at pixel `(x, y)`.
    fn texture_pixel(&self, target: DetectionTarget, x: u32, y: u32) -> Option<[u8; 3]>;
}
