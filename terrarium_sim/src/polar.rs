// terrarium_sim/src/polar.rs

//! Polar occupancy sampling for visual sensors.
//!
//! The engine walks the raster a visual sensor requested: for every angular
//! column and radial bin it probes one world point and marks the cell
//! occupied when any detectable collider contains it. The sensor itself
//! never touches the physics world.

use nalgebra::point;
use rapier2d::prelude::{Group, InteractionGroups, QueryFilter};

use terrarium_core::geometry::ray_angles;
use terrarium_core::prelude::{BodyId, CategoryFilter, PolarSpec, PolarView, SceneView};
use terrarium_core::error::SensorError;

use crate::scene::PhysicsScene;

/// Samples a polar occupancy raster around `anchor`, oriented along the
/// anchor's heading.
pub fn polar_view(
    scene: &PhysicsScene,
    anchor: BodyId,
    spec: &PolarSpec,
) -> Result<PolarView, SensorError> {
    let pose = scene
        .body_pose(anchor)
        .ok_or(SensorError::MissingAnchor(anchor))?;

    let mut view = PolarView::zeros(spec.n_angles, spec.n_bins);
    if spec.n_angles == 0 || spec.n_bins == 0 {
        return Ok(view);
    }

    let angles = ray_angles(spec.fov, spec.n_angles);
    let bin_width = spec.range / spec.n_bins as f64;
    let filter = QueryFilter::new()
        .exclude_rigid_body(crate::scene::rigid_body_handle(anchor))
        .groups(InteractionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(CategoryFilter::sensing().mask()),
        ));

    for (a, &angle) in angles.iter().enumerate() {
        let world_angle = pose.heading + angle;
        let (sin, cos) = world_angle.sin_cos();
        for bin in 0..spec.n_bins {
            // Probe the center of each radial cell.
            let r = (bin as f64 + 0.5) * bin_width;
            let probe = point![
                (pose.position.x + r * cos) as f32,
                (pose.position.y + r * sin) as f32
            ];

            let mut occupied = false;
            scene.query_pipeline().intersections_with_point(
                &scene.bodies,
                &scene.colliders,
                &probe,
                filter,
                |_| {
                    occupied = true;
                    false
                },
            );
            if occupied {
                view.set(a, bin, 1.0);
            }
        }
    }
    Ok(view)
}

// =========================================================================
// == Tests ==
// =========================================================================
