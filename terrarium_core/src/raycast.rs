// terrarium_core/src/raycast.rs

//! The shared ray-cast pipeline: collision querying per ray, occlusion
//! filtering and duplicate resolution across angular buckets.
//!
//! Every ray-based sensor (lidar, touch, cameras, semantic rays and cones)
//! is a thin projection layer over this module: each sensor owns a
//! [`RayPipeline`] parameterized by policy flags and projects the resolved
//! buckets its own way.

use std::collections::HashSet;

use nalgebra::Point2;

use crate::error::SensorError;
use crate::geometry::nearest_angle_index;
use crate::scene::{SceneView, SegmentHit};
use crate::types::{BodyId, CategoryFilter, DetectionTarget, Pose2, ShapeId};

// =========================================================================
// == Hit Records ==
// =========================================================================

/// Raw hits gathered for one ray angle. Ephemeral, rebuilt every update.
#[derive(Debug, Clone)]
pub struct RayBucket {
    /// Angle offset of this ray relative to the anchor heading.
    pub angle: f64,
    pub hits: Vec<SegmentHit>,
}

/// A resolved semantic hit: which entity or agent was seen, how far away,
/// and under which ray/cone angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub target: DetectionTarget,
    /// Distance along the ray, in world units. Always within `[0, range]`.
    pub distance: f64,
    pub angle: f64,
}

/// Detections grouped under one angular bucket (a ray or a cone).
#[derive(Debug, Clone)]
pub struct DetectionBucket {
    pub angle: f64,
    pub detections: Vec<Detection>,
}

impl DetectionBucket {
    pub fn empty(angle: f64) -> Self {
        Self {
            angle,
            detections: Vec::new(),
        }
    }
}

// =========================================================================
// == Occlusion Resolvers ==
// =========================================================================

/// Nearest unoccluded hit of a ray: minimum path fraction, first found on
/// ties (coincident hits are degenerate, the tie-break is arbitrary).
pub fn nearest_by_alpha(hits: &[SegmentHit]) -> Option<&SegmentHit> {
    let mut best: Option<&SegmentHit> = None;
    for hit in hits {
        match best {
            Some(b) if hit.alpha >= b.alpha => {}
            _ => best = Some(hit),
        }
    }
    best
}

/// Cone-level occlusion: keep only the detection with the smallest world
/// distance. Same ordering as [`nearest_by_alpha`], different numeric
/// domain — cone hits are pooled from many rays sharing one range scale.
pub fn resolve_cone_occlusion(detections: &mut Vec<Detection>) {
    let mut best: Option<Detection> = None;
    for det in detections.iter() {
        match best {
            Some(b) if det.distance >= b.distance => {}
            _ => best = Some(*det),
        }
    }
    detections.clear();
    if let Some(b) = best {
        detections.push(b);
    }
}

// =========================================================================
// == Duplicate Resolver ==
// =========================================================================

/// Ensures each entity or agent contributes at most one detection across
/// all buckets of one sensor update.
///
/// Pool everything, keep the closest detection per target, then re-bucket
/// that survivor into the bucket angularly closest to its recorded angle.
/// Re-bucketing replaces any previous occupant of the chosen bucket.
pub fn resolve_duplicates(buckets: &mut [DetectionBucket]) {
    if buckets.is_empty() {
        return;
    }

    let pooled: Vec<Detection> = buckets
        .iter()
        .flat_map(|b| b.detections.iter().copied())
        .collect();

    let angles: Vec<f64> = buckets.iter().map(|b| b.angle).collect();

    for bucket in buckets.iter_mut() {
        bucket.detections.clear();
    }

    // Unique targets in first-seen order, so resolution is deterministic.
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for det in &pooled {
        if seen.insert(det.target) {
            targets.push(det.target);
        }
    }

    for target in targets {
        let mut best: Option<Detection> = None;
        for det in pooled.iter().filter(|d| d.target == target) {
            match best {
                Some(b) if det.distance >= b.distance => {}
                _ => best = Some(*det),
            }
        }
        if let Some(best) = best {
            let idx = nearest_angle_index(&angles, best.angle);
            buckets[idx].detections = vec![best];
        }
    }
}

// =========================================================================
// == Ray Pipeline ==
// =========================================================================

/// Per-sensor ray casting state: the scan pattern, range, policy flags and
/// the set of shapes invisible to this sensor (its own anchor included).
#[derive(Debug, Clone)]
pub struct RayPipeline {
    anchor: BodyId,
    angles: Vec<f64>,
    range: f64,
    remove_occluded: bool,
    invisible: HashSet<ShapeId>,
}

impl RayPipeline {
    pub fn new(
        anchor: BodyId,
        angles: Vec<f64>,
        range: f64,
        remove_occluded: bool,
        invisible: impl IntoIterator<Item = ShapeId>,
    ) -> Self {
        Self {
            anchor,
            angles,
            range,
            remove_occluded,
            invisible: invisible.into_iter().collect(),
        }
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    /// Casts every ray of the scan pattern against the scene and returns
    /// one bucket per ray angle. Empty buckets are a normal result.
    pub fn cast(&self, scene: &dyn SceneView) -> Result<Vec<RayBucket>, SensorError> {
        let pose = scene
            .body_pose(self.anchor)
            .ok_or(SensorError::MissingAnchor(self.anchor))?;

        Ok(self
            .angles
            .iter()
            .map(|&angle| RayBucket {
                angle,
                hits: self.cast_one(scene, &pose, angle),
            })
            .collect())
    }

    fn cast_one(&self, scene: &dyn SceneView, pose: &Pose2, angle_offset: f64) -> Vec<SegmentHit> {
        let angle = pose.heading + angle_offset;
        let end = Point2::new(
            pose.position.x + self.range * angle.cos(),
            pose.position.y + self.range * angle.sin(),
        );

        let mut hits = scene.segment_query(pose.position, end, CategoryFilter::sensing());

        // The anchor and any explicitly invisible elements never register.
        hits.retain(|hit| !self.invisible.contains(&hit.shape));

        if self.remove_occluded {
            return nearest_by_alpha(&hits).copied().into_iter().collect();
        }

        hits
    }

    /// Converts raw ray buckets into semantic detection buckets, resolving
    /// shapes to their owning entity or agent. Shapes owned by nothing are
    /// dropped; a target appearing twice within one ray (visible shape plus
    /// interaction halo) keeps only its nearest hit.
    pub fn detections(
        &self,
        scene: &dyn SceneView,
        buckets: &[RayBucket],
    ) -> Vec<DetectionBucket> {
        buckets
            .iter()
            .map(|bucket| {
                let mut out = DetectionBucket::empty(bucket.angle);
                for hit in &bucket.hits {
                    let Some(target) = scene.target_of(hit.shape) else {
                        continue;
                    };
                    let distance = hit.alpha * self.range;
                    match out.detections.iter_mut().find(|d| d.target == target) {
                        Some(existing) => existing.distance = existing.distance.min(distance),
                        None => out.detections.push(Detection {
                            target,
                            distance,
                            angle: bucket.angle,
                        }),
                    }
                }
                out
            })
            .collect()
    }
}

// =========================================================================
// == Tests ==
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentId, EntityId};
    use approx::assert_relative_eq;

    fn det(target: DetectionTarget, distance: f64, angle: f64) -> Detection {
        Detection {
            target,
            distance,
            angle,
        }
    }

    fn hit(shape: u64, alpha: f64) -> SegmentHit {
        SegmentHit {
            shape: ShapeId(shape),
            alpha,
            point: Point2::new(0.0, 0.0),
        }
    }

    #[test]
    fn occlusion_keeps_minimum_alpha() {
        let hits = vec![hit(1, 0.8), hit(2, 0.2)];
        let nearest = nearest_by_alpha(&hits).unwrap();
        assert_eq!(nearest.shape, ShapeId(2));
        assert_relative_eq!(nearest.alpha, 0.2);
    }

    #[test]
    fn occlusion_of_empty_list_is_empty() {
        assert!(nearest_by_alpha(&[]).is_none());
    }

    #[test]
    fn occlusion_tie_break_is_first_found() {
        let hits = vec![hit(1, 0.5), hit(2, 0.5)];
        assert_eq!(nearest_by_alpha(&hits).unwrap().shape, ShapeId(1));
    }

    #[test]
    fn cone_occlusion_compares_world_distance() {
        let e = DetectionTarget::Entity(EntityId(1));
        let a = DetectionTarget::Agent(AgentId(1));
        let mut dets = vec![det(e, 40.0, 0.1), det(a, 12.5, -0.1)];
        resolve_cone_occlusion(&mut dets);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].target, a);
    }

    #[test]
    fn duplicates_keep_closest_hit_in_closest_bucket() {
        // The same entity seen on two adjacent rays, at distances 5 and 3.
        let e = DetectionTarget::Entity(EntityId(9));
        let mut buckets = vec![
            DetectionBucket {
                angle: 0.0,
                detections: vec![det(e, 5.0, 0.0)],
            },
            DetectionBucket {
                angle: 0.4,
                detections: vec![det(e, 3.0, 0.4)],
            },
        ];

        resolve_duplicates(&mut buckets);

        assert!(buckets[0].detections.is_empty());
        assert_eq!(buckets[1].detections.len(), 1);
        assert_relative_eq!(buckets[1].detections[0].distance, 3.0);
        assert_relative_eq!(buckets[1].detections[0].angle, 0.4);
    }

    #[test]
    fn duplicates_do_not_merge_distinct_targets() {
        // Two distinct entities with identical geometry stay distinct:
        // identity is by id, never by content.
        let e1 = DetectionTarget::Entity(EntityId(1));
        let e2 = DetectionTarget::Entity(EntityId(2));
        let mut buckets = vec![
            DetectionBucket {
                angle: -0.2,
                detections: vec![det(e1, 10.0, -0.2)],
            },
            DetectionBucket {
                angle: 0.2,
                detections: vec![det(e2, 10.0, 0.2)],
            },
        ];

        resolve_duplicates(&mut buckets);

        assert_eq!(buckets[0].detections.len(), 1);
        assert_eq!(buckets[1].detections.len(), 1);
    }

    #[test]
    fn rebucketing_replaces_previous_occupant() {
        // Both targets resolve to bucket 0; the later assignment wins the
        // bucket. Re-bucketing overwrites, never appends.
        let e1 = DetectionTarget::Entity(EntityId(1));
        let e2 = DetectionTarget::Entity(EntityId(2));
        let mut buckets = vec![
            DetectionBucket {
                angle: 0.0,
                detections: vec![det(e1, 4.0, 0.01), det(e2, 2.0, 0.02)],
            },
            DetectionBucket {
                angle: 1.0,
                detections: vec![],
            },
        ];

        resolve_duplicates(&mut buckets);

        assert_eq!(buckets[0].detections.len(), 1);
        assert_eq!(buckets[0].detections[0].target, e2);
        assert!(buckets[1].detections.is_empty());
    }

    // --- pipeline against a mock scene ---

    struct MockScene {
        pose: Pose2,
        /// (shape, alpha) pairs returned for every query.
        hits: Vec<(u64, f64)>,
    }

    impl SceneView for MockScene {
        fn segment_query(
            &self,
            origin: Point2<f64>,
            end: Point2<f64>,
            _filter: CategoryFilter,
        ) -> Vec<SegmentHit> {
            self.hits
                .iter()
                .map(|&(shape, alpha)| SegmentHit {
                    shape: ShapeId(shape),
                    alpha,
                    point: origin + (end - origin) * alpha,
                })
                .collect()
        }

        fn target_of(&self, shape: ShapeId) -> Option<DetectionTarget> {
            Some(DetectionTarget::Entity(EntityId(shape.0)))
        }

        fn body_pose(&self, _body: BodyId) -> Option<Pose2> {
            Some(self.pose)
        }

        fn target_pose(&self, _target: DetectionTarget) -> Option<Pose2> {
            None
        }

        fn texture_size(&self, _target: DetectionTarget) -> Option<(u32, u32)> {
            None
        }

        fn texture_pixel(&self, _t: DetectionTarget, _x: u32, _y: u32) -> Option<[u8; 3]> {
            None
        }
    }

    #[test]
    fn pipeline_filters_invisible_shapes() {
        let scene = MockScene {
            pose: Pose2::new(0.0, 0.0, 0.0),
            hits: vec![(1, 0.3), (2, 0.5)],
        };
        let pipeline = RayPipeline::new(BodyId(0), vec![0.0], 100.0, false, [ShapeId(1)]);

        let buckets = pipeline.cast(&scene).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].hits.len(), 1);
        assert_eq!(buckets[0].hits[0].shape, ShapeId(2));
    }

    #[test]
    fn pipeline_occlusion_keeps_one_hit_per_ray() {
        let scene = MockScene {
            pose: Pose2::new(0.0, 0.0, 0.0),
            hits: vec![(1, 0.9), (2, 0.1), (3, 0.4)],
        };
        let pipeline = RayPipeline::new(BodyId(0), vec![-0.5, 0.0, 0.5], 50.0, true, []);

        let buckets = pipeline.cast(&scene).unwrap();
        for bucket in &buckets {
            assert_eq!(bucket.hits.len(), 1);
            assert_eq!(bucket.hits[0].shape, ShapeId(2));
        }
    }

    #[test]
    fn missing_anchor_is_fatal() {
        struct NoAnchor;
        impl SceneView for NoAnchor {
            fn segment_query(
                &self,
                _o: Point2<f64>,
                _e: Point2<f64>,
                _f: CategoryFilter,
            ) -> Vec<SegmentHit> {
                Vec::new()
            }
            fn target_of(&self, _s: ShapeId) -> Option<DetectionTarget> {
                None
            }
            fn body_pose(&self, _b: BodyId) -> Option<Pose2> {
                None
            }
            fn target_pose(&self, _t: DetectionTarget) -> Option<Pose2> {
                None
            }
            fn texture_size(&self, _t: DetectionTarget) -> Option<(u32, u32)> {
                None
            }
            fn texture_pixel(&self, _t: DetectionTarget, _x: u32, _y: u32) -> Option<[u8; 3]> {
                None
            }
        }

        let pipeline = RayPipeline::new(BodyId(7), vec![0.0], 10.0, true, []);
        assert_eq!(
            pipeline.cast(&NoAnchor).unwrap_err(),
            SensorError::MissingAnchor(BodyId(7))
        );
    }

    #[test]
    fn detections_merge_shapes_of_one_target_within_a_ray() {
        struct TwoShapesOneEntity {
            pose: Pose2,
        }
        impl SceneView for TwoShapesOneEntity {
            fn segment_query(
                &self,
                origin: Point2<f64>,
                end: Point2<f64>,
                _f: CategoryFilter,
            ) -> Vec<SegmentHit> {
                // Visible shape and interaction halo of the same entity.
                [(10, 0.5), (11, 0.4)]
                    .iter()
                    .map(|&(shape, alpha)| SegmentHit {
                        shape: ShapeId(shape),
                        alpha,
                        point: origin + (end - origin) * alpha,
                    })
                    .collect()
            }
            fn target_of(&self, _s: ShapeId) -> Option<DetectionTarget> {
                Some(DetectionTarget::Entity(EntityId(3)))
            }
            fn body_pose(&self, _b: BodyId) -> Option<Pose2> {
                Some(self.pose)
            }
            fn target_pose(&self, _t: DetectionTarget) -> Option<Pose2> {
                None
            }
            fn texture_size(&self, _t: DetectionTarget) -> Option<(u32, u32)> {
                None
            }
            fn texture_pixel(&self, _t: DetectionTarget, _x: u32, _y: u32) -> Option<[u8; 3]> {
                None
            }
        }

        let scene = TwoShapesOneEntity {
            pose: Pose2::new(0.0, 0.0, 0.0),
        };
        let pipeline = RayPipeline::new(BodyId(0), vec![0.0], 100.0, false, []);
        let buckets = pipeline.cast(&scene).unwrap();
        let dets = pipeline.detections(&scene, &buckets);

        assert_eq!(dets[0].detections.len(), 1);
        assert_relative_eq!(dets[0].detections[0].distance, 40.0);
    }
}
