//! Iterative Lucas-Kanade sparse optical flow.
//!
//! Single-level implementation: adequate for the small per-frame
//! displacements of a broadcast camera between consecutive frames.

use nalgebra::{Matrix2, Vector2};

use crate::frame::GrayFrame;
use crate::track::Point;

/// Parameters for Lucas-Kanade point tracking.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Half side of the square integration window.
    pub window_radius: usize,

    /// Maximum refinement iterations per point.
    pub max_iterations: usize,

    /// Stop iterating once the update step is below this norm.
    pub epsilon: f64,

    /// Reject points whose gradient matrix is close to singular.
    pub min_determinant: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            window_radius: 7,
            max_iterations: 10,
            epsilon: 0.03,
            min_determinant: 1e-6,
        }
    }
}

/// Track one point from `prev` to `next`.
///
/// Returns the point's position in `next`, or `None` when the point
/// is untrackable (flat neighborhood, divergence, or out of bounds).
pub fn track_point(
    prev: &GrayFrame,
    next: &GrayFrame,
    point: Point,
    config: &FlowConfig,
) -> Option<Point> {
    let r = config.window_radius as i64;
    let (px, py) = (point.x, point.y);

    // Spatial gradient matrix of the previous frame, fixed per point.
    let mut g: Matrix2<f64> = Matrix2::zeros();
    let mut gradients = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for dy in -r..=r {
        for dx in -r..=r {
            let x = px + dx as f64;
            let y = py + dy as f64;
            let ix = (prev.sample(x + 1.0, y) - prev.sample(x - 1.0, y)) / 2.0;
            let iy = (prev.sample(x, y + 1.0) - prev.sample(x, y - 1.0)) / 2.0;
            g[(0, 0)] += ix * ix;
            g[(0, 1)] += ix * iy;
            g[(1, 0)] += ix * iy;
            g[(1, 1)] += iy * iy;
            gradients.push((x, y, ix, iy));
        }
    }

    if g.determinant().abs() < config.min_determinant {
        return None;
    }
    let g_inv = g.try_inverse()?;

    // Iterative refinement of the displacement.
    let mut d = Vector2::zeros();
    for _ in 0..config.max_iterations {
        let mut b = Vector2::zeros();
        for &(x, y, ix, iy) in &gradients {
            let diff = prev.sample(x, y) - next.sample(x + d.x, y + d.y);
            b.x += diff * ix;
            b.y += diff * iy;
        }

        let step = g_inv * b;
        d += step;
        if step.norm() < config.epsilon {
            break;
        }
    }

    let tracked = Point::new(px + d.x, py + d.y);
    let in_bounds = tracked.x >= 0.0
        && tracked.y >= 0.0
        && tracked.x < next.width() as f64
        && tracked.y < next.height() as f64;
    if !in_bounds || !d.x.is_finite() || !d.y.is_finite() {
        return None;
    }

    Some(tracked)
}

/// Track a set of points; entry i is `None` when point i was lost.
pub fn track_points(
    prev: &GrayFrame,
    next: &GrayFrame,
    points: &[Point],
    config: &FlowConfig,
) -> Vec<Option<Point>> {
    points
        .iter()
        .map(|&p| track_point(prev, next, p, config))
        .collect()
}
