//! Shi-Tomasi corner selection.
//!
//! Scores every masked pixel by the minimum eigenvalue of its local
//! structure tensor, then keeps the strongest corners subject to a
//! minimum pairwise distance.

use crate::frame::{GrayFrame, RegionMask};
use crate::track::Point;

/// Parameters for corner selection.
#[derive(Debug, Clone)]
pub struct CornerConfig {
    /// Maximum number of corners returned.
    pub max_corners: usize,

    /// Fraction of the best corner score below which candidates are rejected.
    pub quality_level: f64,

    /// Minimum Euclidean distance between returned corners.
    pub min_distance: f64,

    /// Side length of the square window the structure tensor is summed over.
    pub block_size: usize,
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.3,
            min_distance: 3.0,
            block_size: 7,
        }
    }
}

/// Select trackable corners inside the masked regions of `frame`.
///
/// Returns corner positions ordered by descending score, at most
/// `config.max_corners` of them.
pub fn good_features_to_track(
    frame: &GrayFrame,
    mask: &RegionMask,
    config: &CornerConfig,
) -> Vec<Point> {
    let w = frame.width();
    let h = frame.height();
    let radius = (config.block_size / 2).max(1) as i64;

    // Score masked pixels by the minimum eigenvalue of the structure
    // tensor summed over the block window.
    let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
    let mut best_score = 0.0_f64;

    for y in 0..h {
        for x in 0..w {
            if !mask.contains(x, y) {
                continue;
            }

            let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let px = x as i64 + dx;
                    let py = y as i64 + dy;
                    let ix = (frame.get(px + 1, py) - frame.get(px - 1, py)) / 2.0;
                    let iy = (frame.get(px, py + 1) - frame.get(px, py - 1)) / 2.0;
                    sxx += ix * ix;
                    sxy += ix * iy;
                    syy += iy * iy;
                }
            }

            let score = min_eigenvalue(sxx, sxy, syy);
            if score > 0.0 {
                if score > best_score {
                    best_score = score;
                }
                candidates.push((score, x, y));
            }
        }
    }

    if candidates.is_empty() {
        return Vec::new();
    }

    // Reject weak candidates, strongest first.
    let threshold = best_score * config.quality_level;
    candidates.retain(|&(score, _, _)| score >= threshold);
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

    // Greedy minimum-distance suppression.
    let min_dist_sq = config.min_distance * config.min_distance;
    let mut corners: Vec<Point> = Vec::new();
    for (_, x, y) in candidates {
        let p = Point::new(x as f64, y as f64);
        let too_close = corners
            .iter()
            .any(|c| (c - p).norm_squared() < min_dist_sq);
        if !too_close {
            corners.push(p);
            if corners.len() >= config.max_corners {
                break;
            }
        }
    }

    corners
}

/// Minimum eigenvalue of the symmetric 2x2 matrix [[a, b], [b, c]].
fn min_eigenvalue(a: f64, b: f64, c: f64) -> f64 {
    let trace_half = (a + c) / 2.0;
    let det_term = ((a - c) / 2.0).powi(2) + b * b;
    trace_half - det_term.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn checkerboard(width: usize, height: usize, square: usize) -> GrayFrame {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let on = ((x / square) + (y / square)) % 2 == 0;
                data.push(if on { 255.0 } else { 0.0 });
            }
        }
        GrayFrame::new(width, height, data)
    }

    #[test]
    fn test_min_eigenvalue_identity() {
        assert_relative_eq!(min_eigenvalue(1.0, 0.0, 1.0), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_min_eigenvalue_rank_one() {
        // Pure edge: gradient in one direction only, min eigenvalue 0
        assert_relative_eq!(min_eigenvalue(4.0, 0.0, 0.0), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_finds_corners_on_checkerboard() {
        let frame = checkerboard(40, 40, 8);
        let mask = RegionMask::vertical_bands(40, 40, &[(0, 40)]);
        let corners = good_features_to_track(&frame, &mask, &CornerConfig::default());

        assert!(!corners.is_empty(), "expected corners on a checkerboard");
    }

    #[test]
    fn test_flat_frame_has_no_corners() {
        let frame = GrayFrame::new(20, 20, vec![128.0; 400]);
        let mask = RegionMask::vertical_bands(20, 20, &[(0, 20)]);
        let corners = good_features_to_track(&frame, &mask, &CornerConfig::default());

        assert!(corners.is_empty());
    }

    #[test]
    fn test_mask_restricts_corner_region() {
        let frame = checkerboard(60, 40, 8);
        let mask = RegionMask::vertical_bands(60, 40, &[(0, 15)]);
        let corners = good_features_to_track(&frame, &mask, &CornerConfig::default());

        for corner in &corners {
            assert!(corner.x < 15.0, "corner {} outside masked band", corner.x);
        }
    }

    #[test]
    fn test_min_distance_respected() {
        let frame = checkerboard(40, 40, 4);
        let mask = RegionMask::vertical_bands(40, 40, &[(0, 40)]);
        let config = CornerConfig {
            min_distance: 6.0,
            ..CornerConfig::default()
        };
        let corners = good_features_to_track(&frame, &mask, &config);

        for i in 0..corners.len() {
            for j in (i + 1)..corners.len() {
                let d = (corners[i] - corners[j]).norm();
                assert!(d >= 6.0, "corners {} and {} too close: {}", i, j, d);
            }
        }
    }
}
