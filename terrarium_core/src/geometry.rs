// terrarium_core/src/geometry.rs

//! Angle generation for ray and cone scan patterns.
//!
//! All angles are offsets in radians, relative to the anchor's heading.

/// Generates `n` ray angle offsets evenly spaced over `[-fov/2, +fov/2]`,
/// inclusive of both ends. A single ray points straight ahead.
pub fn ray_angles(fov: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![0.0];
    }

    (0..n)
        .map(|i| i as f64 * fov / (n - 1) as f64 - fov / 2.0)
        .collect()
}

/// Generates `n` cone center angles. Cone centers span a field of view
/// slightly narrower than `fov` (spacing `fov - fov/n`) so the outermost
/// cones do not double-count past the sensor edges.
pub fn cone_centers(fov: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![0.0];
    }

    let span = fov - fov / n as f64;
    (0..n)
        .map(|i| i as f64 * span / (n - 1) as f64 - span / 2.0)
        .collect()
}

/// Index of the angle in `centers` closest to `angle` (argmin over the
/// squared difference, first index on ties). `centers` must be non-empty.
pub fn nearest_angle_index(centers: &[f64], angle: f64) -> usize {
    let mut best = 0;
    let mut best_d2 = f64::INFINITY;
    for (i, center) in centers.iter().enumerate() {
        let d2 = (center - angle) * (center - angle);
        if d2 < best_d2 {
            best_d2 = d2;
            best = i;
        }
    }
    best
}

// =========================================================================
// == Tests ==
// =========================================================================
