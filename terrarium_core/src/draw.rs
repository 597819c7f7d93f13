// terrarium_core/src/draw.rs

//! Diagnostic rasterization of sensor observations.
//!
//! One-dimensional observations expand into a `width x height` strip with
//! nearest-neighbor resampling; semantic detections plot radially on a
//! square canvas. All of it is for human eyes only.

use image::{Rgb, RgbImage};

use crate::raycast::Detection;

/// Renders a scalar observation as a greyscale strip. `max_value` is the
/// divisor bringing values into [0, 1] (pass 1.0 for already-normalized
/// observations).
pub fn value_strip(values: &[f64], max_value: f64, width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    if values.is_empty() || max_value <= 0.0 {
        return img;
    }

    for x in 0..width {
        let idx = (x as usize * values.len()) / width as usize;
        let level = (values[idx] / max_value).clamp(0.0, 1.0);
        let grey = (level * 255.0) as u8;
        for y in 0..height {
            img.put_pixel(x, y, Rgb([grey, grey, grey]));
        }
    }
    img
}

/// Renders a color observation as a strip. Channels are stored (B, G, R);
/// the strip is emitted in RGB for viewing.
pub fn color_strip(pixels: &[[f64; 3]], max_value: f64, width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    if pixels.is_empty() || max_value <= 0.0 {
        return img;
    }

    for x in 0..width {
        let idx = (x as usize * pixels.len()) / width as usize;
        let [b, g, r] = pixels[idx];
        let to_u8 = |c: f64| ((c / max_value).clamp(0.0, 1.0) * 255.0) as u8;
        let rgb = Rgb([to_u8(r), to_u8(g), to_u8(b)]);
        for y in 0..height {
            img.put_pixel(x, y, rgb);
        }
    }
    img
}

/// Plots detections radially around the sensor: a ray from the center to
/// each detection, with a dot at the detection point. `denormalize` undoes
/// a normalized distance (pass the sensor range, or 1.0 for raw values).
pub fn detection_map(detections: &[Detection], range: f64, denormalize: f64, size: u32) -> RgbImage {
    let mut img = RgbImage::new(size, size);
    let center = (size as i64 / 2, size as i64 / 2);

    for det in detections {
        let distance = det.distance * denormalize * size as f64 / (2.0 * range);
        let x = center.0 - (distance * det.angle.cos()) as i64;
        let y = center.1 - (distance * det.angle.sin()) as i64;

        line(&mut img, center, (x, y), Rgb([77, 26, 128]));
        dot(&mut img, (x, y), Rgb([255, 130, 25]));
    }
    img
}

/// 3x3 dot, clipped at the borders.
fn dot(img: &mut RgbImage, (cx, cy): (i64, i64), color: Rgb<u8>) {
    for dx in -1..=1 {
        for dy in -1..=1 {
            put_clipped(img, cx + dx, cy + dy, color);
        }
    }
}

/// Bresenham line, clipped at the borders.
fn line(img: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        put_clipped(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn put_clipped(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

// =========================================================================
// == Tests ==
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DetectionTarget, EntityId};

    #[test]
    fn strip_expands_values_across_width() {
        let img = value_strip(&[0.0, 1.0], 1.0, 8, 2);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(7, 0)[0], 255);
        // The left half samples the first value, the right half the second.
        assert_eq!(img.get_pixel(3, 1)[0], 0);
        assert_eq!(img.get_pixel(4, 1)[0], 255);
    }

    #[test]
    fn color_strip_swaps_stored_bgr_back_to_rgb() {
        // Stored (B, G, R) = (10, 20, 30) must display as RGB(30, 20, 10).
        let img = color_strip(&[[10.0, 20.0, 30.0]], 255.0, 2, 1);
        let px = img.get_pixel(0, 0);
        assert_eq!(px[0], 30);
        assert_eq!(px[1], 20);
        assert_eq!(px[2], 10);
    }

    #[test]
    fn detection_map_marks_the_detection_point() {
        let det = Detection {
            target: DetectionTarget::Entity(EntityId(1)),
            distance: 50.0,
            angle: 0.0,
        };
        let img = detection_map(&[det], 100.0, 1.0, 100);
        // distance 50 over range 100 on a 100px canvas: 25px left of center.
        assert_eq!(*img.get_pixel(25, 50), Rgb([255, 130, 25]));
    }
}
