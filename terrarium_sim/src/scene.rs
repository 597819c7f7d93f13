// terrarium_sim/src/scene.rs

//! Rapier-backed scene: rigid bodies and colliders for walls, entities and
//! agents, exposed to the sensor layer through the `SceneView` trait.
//!
//! `PhysicsPipeline::step()` requires mutable access to every set
//! simultaneously, so they all live together in [`PhysicsScene`].

use std::collections::HashMap;

use image::{Rgb, RgbImage};
use log::debug;
use rapier2d::prelude::{
    CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase, Group,
    ImpulseJointSet, IntegrationParameters, InteractionGroups, IslandManager, MultibodyJointSet,
    NarrowPhase, PhysicsPipeline, QueryFilter, QueryPipeline, Ray, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet,
};
use nalgebra::{point, vector, Point2};

use terrarium_core::prelude::{
    AgentId, BodyId, CategoryFilter, CollisionCategory, DetectionTarget, EntityId, Pose2,
    SceneView, SegmentHit, ShapeId,
};

// =========================================================================
// == Handle Mapping ==
// =========================================================================

// Rapier arena handles pack into the core's opaque u64 ids: index in the
// high half, generation in the low half.

fn shape_id(handle: ColliderHandle) -> ShapeId {
    let (index, generation) = handle.into_raw_parts();
    ShapeId(((index as u64) << 32) | generation as u64)
}

fn collider_handle(shape: ShapeId) -> ColliderHandle {
    ColliderHandle::from_raw_parts((shape.0 >> 32) as u32, shape.0 as u32)
}

fn body_id(handle: RigidBodyHandle) -> BodyId {
    let (index, generation) = handle.into_raw_parts();
    BodyId(((index as u64) << 32) | generation as u64)
}

pub(crate) fn rigid_body_handle(body: BodyId) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts((body.0 >> 32) as u32, body.0 as u32)
}

fn group_of(category: CollisionCategory) -> Group {
    Group::from_bits_truncate(category.bit())
}

fn mask_group(filter: CategoryFilter) -> Group {
    Group::from_bits_truncate(filter.mask())
}

// =========================================================================
// == PhysicsScene ==
// =========================================================================

/// The assembled world. Build it once from a scenario, then step it and let
/// sensors query it between steps.
pub struct PhysicsScene {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    integration_parameters: IntegrationParameters,

    targets: HashMap<ShapeId, DetectionTarget>,
    target_bodies: HashMap<DetectionTarget, BodyId>,
    textures: HashMap<DetectionTarget, RgbImage>,
    next_entity: u64,
    next_agent: u64,
}

impl PhysicsScene {
    /// Top-down world: no gravity, the given fixed timestep.
    pub fn new(dt: f64) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = dt as f32;

        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters,
            targets: HashMap::new(),
            target_bodies: HashMap::new(),
            textures: HashMap::new(),
            next_entity: 1,
            next_agent: 1,
        }
    }

    fn uniform_texture(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width.max(1), height.max(1), Rgb(color))
    }

    /// A wall segment between two world points. Walls are full entities:
    /// solid, sensor-visible and semantically detectable.
    pub fn add_wall(&mut self, start: Point2<f64>, end: Point2<f64>, color: [u8; 3]) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        let target = DetectionTarget::Entity(id);

        let mid = nalgebra::center(&start, &end);
        let body = RigidBodyBuilder::fixed()
            .translation(vector![mid.x as f32, mid.y as f32])
            .build();
        let body_handle = self.bodies.insert(body);

        let half = end - mid;
        let collider = ColliderBuilder::segment(
            point![-half.x as f32, -half.y as f32],
            point![half.x as f32, half.y as f32],
        )
        .collision_groups(InteractionGroups::new(
            group_of(CollisionCategory::Visible),
            Group::ALL,
        ))
        .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        self.targets.insert(shape_id(collider_handle), target);
        self.target_bodies.insert(target, body_id(body_handle));
        let span = (end - start).norm().ceil() as u32 + 1;
        self.textures
            .insert(target, Self::uniform_texture(span, span, color));

        debug!("wall {:?}: {:?} -> {:?}", id, start, end);
        id
    }

    /// A static circular entity with a uniform surface color.
    pub fn add_circle_entity(
        &mut self,
        position: Point2<f64>,
        radius: f64,
        color: [u8; 3],
    ) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        let target = DetectionTarget::Entity(id);

        let body = RigidBodyBuilder::fixed()
            .translation(vector![position.x as f32, position.y as f32])
            .build();
        let body_handle = self.bodies.insert(body);

        let collider = ColliderBuilder::ball(radius as f32)
            .collision_groups(InteractionGroups::new(
                group_of(CollisionCategory::Visible),
                Group::ALL,
            ))
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        self.targets.insert(shape_id(collider_handle), target);
        self.target_bodies.insert(target, body_id(body_handle));
        let side = (2.0 * radius).ceil() as u32 + 1;
        self.textures
            .insert(target, Self::uniform_texture(side, side, color));

        debug!("entity {:?}: r={} at {:?}", id, radius, position);
        id
    }

    /// A non-solid interaction halo attached to an existing entity body,
    /// detectable by rays but never colliding.
    pub fn add_interaction_halo(&mut self, entity: EntityId, radius: f64) -> Option<ShapeId> {
        let target = DetectionTarget::Entity(entity);
        let body = *self.target_bodies.get(&target)?;

        let collider = ColliderBuilder::ball(radius as f32)
            .sensor(true)
            .collision_groups(InteractionGroups::new(
                group_of(CollisionCategory::Interaction),
                Group::ALL,
            ))
            .build();
        let handle =
            self.colliders
                .insert_with_parent(collider, rigid_body_handle(body), &mut self.bodies);

        let shape = shape_id(handle);
        self.targets.insert(shape, target);
        Some(shape)
    }

    /// A dynamic circular agent body. Returns the handles a sensor rig
    /// needs: identity, anchor body, and the agent's own shape (which its
    /// sensors must treat as invisible).
    pub fn add_agent(&mut self, pose: Pose2, radius: f64, color: [u8; 3]) -> (AgentId, BodyId, ShapeId) {
        let id = AgentId(self.next_agent);
        self.next_agent += 1;
        let target = DetectionTarget::Agent(id);

        let body = RigidBodyBuilder::dynamic()
            .translation(vector![
                pose.position.x as f32,
                pose.position.y as f32
            ])
            .rotation(pose.heading as f32)
            .build();
        let body_handle = self.bodies.insert(body);

        let collider = ColliderBuilder::ball(radius as f32)
            .collision_groups(InteractionGroups::new(
                group_of(CollisionCategory::Visible) | group_of(CollisionCategory::Interaction),
                Group::ALL,
            ))
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        let shape = shape_id(collider_handle);
        self.targets.insert(shape, target);
        self.target_bodies.insert(target, body_id(body_handle));
        let side = (2.0 * radius).ceil() as u32 + 1;
        self.textures
            .insert(target, Self::uniform_texture(side, side, color));

        debug!("agent {:?}: r={} at {:?}", id, radius, pose.position);
        (id, body_id(body_handle), shape)
    }

    /// Rebuilds the query acceleration structure. Call once after assembly;
    /// `step` keeps it current afterwards.
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    /// Advances the physics world by one timestep.
    pub fn step(&mut self) {
        self.pipeline.step(
            &vector![0.0, 0.0],
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    pub(crate) fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    /// The body a shape is attached to, if any.
    pub fn shape_body(&self, shape: ShapeId) -> Option<BodyId> {
        self.colliders
            .get(collider_handle(shape))
            .and_then(|c| c.parent())
            .map(body_id)
    }
}

// =========================================================================
// == SceneView ==
// =========================================================================

impl SceneView for PhysicsScene {
    fn segment_query(
        &self,
        origin: Point2<f64>,
        end: Point2<f64>,
        filter: CategoryFilter,
    ) -> Vec<SegmentHit> {
        let dir = end - origin;
        let length = dir.norm();
        if length <= f64::EPSILON {
            return Vec::new();
        }
        let unit = dir / length;

        let ray = Ray::new(
            point![origin.x as f32, origin.y as f32],
            vector![unit.x as f32, unit.y as f32],
        );
        let query = QueryFilter::new().groups(InteractionGroups::new(
            Group::ALL,
            mask_group(filter),
        ));

        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            length as f32,
            true,
            query,
            |handle, intersection| {
                let distance = intersection.time_of_impact as f64;
                hits.push(SegmentHit {
                    shape: shape_id(handle),
                    alpha: distance / length,
                    point: origin + unit * distance,
                });
                true
            },
        );
        hits
    }

    fn target_of(&self, shape: ShapeId) -> Option<DetectionTarget> {
        self.targets.get(&shape).copied()
    }

    fn body_pose(&self, body: BodyId) -> Option<Pose2> {
        let rb = self.bodies.get(rigid_body_handle(body))?;
        let iso = rb.position();
        Some(Pose2::new(
            iso.translation.x as f64,
            iso.translation.y as f64,
            iso.rotation.angle() as f64,
        ))
    }

    fn target_pose(&self, target: DetectionTarget) -> Option<Pose2> {
        let body = *self.target_bodies.get(&target)?;
        self.body_pose(body)
    }

    fn texture_size(&self, target: DetectionTarget) -> Option<(u32, u32)> {
        self.textures
            .get(&target)
            .map(|img| (img.width(), img.height()))
    }

    fn texture_pixel(&self, target: DetectionTarget, x: u32, y: u32) -> Option<[u8; 3]> {
        let img = self.textures.get(&target)?;
        if x >= img.width() || y >= img.height() {
            return None;
        }
        Some(img.get_pixel(x, y).0)
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
    fn handles_round_trip_through_ids() {
        let mut scene = PhysicsScene::new(1.0 / 60.0);
        let (_, body, shape) = scene.add_agent(Pose2::new(1.0, 2.0, 0.5), 5.0, [40, 40, 40]);

        assert_eq!(scene.shape_body(shape), Some(body));
        let pose = scene.body_pose(body).unwrap();
        assert_relative_eq!(pose.position.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(pose.heading, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn segment_query_hits_a_wall_with_unit_alpha_scale() {
        let mut scene = PhysicsScene::new(1.0 / 60.0);
        scene.add_wall(
            Point2::new(50.0, -100.0),
            Point2::new(50.0, 100.0),
            [120, 120, 120],
        );
        scene.refresh_queries();

        let hits = scene.segment_query(
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            CategoryFilter::sensing(),
        );
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].alpha, 0.5, epsilon = 1e-4);
        assert_relative_eq!(hits[0].point.x, 50.0, epsilon = 1e-2);
    }

    #[test]
    fn walls_resolve_to_entity_targets() {
        let mut scene = PhysicsScene::new(1.0 / 60.0);
        let id = scene.add_wall(
            Point2::new(10.0, -10.0),
            Point2::new(10.0, 10.0),
            [1, 2, 3],
        );
        scene.refresh_queries();

        let hits = scene.segment_query(
            Point2::new(0.0, 0.0),
            Point2::new(20.0, 0.0),
            CategoryFilter::sensing(),
        );
        assert_eq!(
            scene.target_of(hits[0].shape),
            Some(DetectionTarget::Entity(id))
        );
        assert_eq!(
            scene.texture_pixel(DetectionTarget::Entity(id), 0, 0),
            Some([1, 2, 3])
        );
    }

    #[test]
    fn interaction_halo_is_detectable_but_distinct_shape() {
        let mut scene = PhysicsScene::new(1.0 / 60.0);
        let id = scene.add_circle_entity(Point2::new(30.0, 0.0), 5.0, [0, 255, 0]);
        let halo = scene.add_interaction_halo(id, 12.0).unwrap();
        scene.refresh_queries();

        let hits = scene.segment_query(
            Point2::new(0.0, 0.0),
            Point2::new(60.0, 0.0),
            CategoryFilter::sensing(),
        );
        // Ball surface at 25, halo surface at 18: two shapes, one entity.
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().any(|h| h.shape == halo));
        assert!(hits
            .iter()
            .all(|h| scene.target_of(h.shape) == Some(DetectionTarget::Entity(id))));
    }
}
