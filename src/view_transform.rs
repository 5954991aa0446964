//! Pixel-to-field projection via a fixed homography.
//!
//! The observed court boundary (a pixel-space quadrilateral) is mapped
//! onto the known field rectangle. Positions outside the calibrated
//! quadrilateral are never extrapolated - their field position stays
//! unset.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use crate::track::{Point, TrackCollection};
use crate::{Error, Result};

/// Corresponding quadrilaterals: the court boundary as observed in
/// pixels, and the same boundary in field meters.
///
/// Vertices correspond pairwise and must be listed in the same winding
/// order.
#[derive(Debug, Clone)]
pub struct ViewCalibration {
    pub pixel_quad: [Point; 4],
    pub field_quad: [Point; 4],
}

impl Default for ViewCalibration {
    /// Calibration for the reference broadcast setup: a 23.32 m deep,
    /// 68 m wide strip of the pitch.
    fn default() -> Self {
        Self {
            pixel_quad: [
                Point::new(110.0, 1035.0),
                Point::new(265.0, 275.0),
                Point::new(910.0, 260.0),
                Point::new(1640.0, 915.0),
            ],
            field_quad: [
                Point::new(0.0, 68.0),
                Point::new(0.0, 0.0),
                Point::new(23.32, 0.0),
                Point::new(23.32, 68.0),
            ],
        }
    }
}

/// Projects camera-compensated pixel positions into field coordinates.
#[derive(Debug, Clone)]
pub struct ViewTransformer {
    pixel_quad: [Point; 4],
    homography: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl ViewTransformer {
    /// Compute the perspective transform once from the calibration.
    ///
    /// Fails with [`Error::InvalidCalibration`] when the quadrilaterals
    /// are degenerate - this is the one configuration error the
    /// pipeline refuses to start with.
    pub fn new(calibration: &ViewCalibration) -> Result<Self> {
        let homography = solve_homography(&calibration.pixel_quad, &calibration.field_quad)?;
        let inverse = homography.try_inverse().ok_or_else(|| {
            Error::InvalidCalibration("homography is not invertible".to_string())
        })?;
        Ok(Self {
            pixel_quad: calibration.pixel_quad,
            homography,
            inverse,
        })
    }

    /// Whether `p` lies inside the calibrated pixel quadrilateral.
    pub fn contains(&self, p: Point) -> bool {
        // Convex quad: p is inside when it sits on the same side of
        // every edge (either winding).
        let mut positive = false;
        let mut negative = false;
        for i in 0..4 {
            let a = self.pixel_quad[i];
            let b = self.pixel_quad[(i + 1) % 4];
            let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
            if cross > 0.0 {
                positive = true;
            } else if cross < 0.0 {
                negative = true;
            }
        }
        !(positive && negative)
    }

    /// Project an adjusted pixel position into field coordinates.
    ///
    /// Returns `None` outside the calibrated quadrilateral.
    pub fn project(&self, p: Point) -> Option<Point> {
        if !self.contains(p) {
            return None;
        }
        Some(apply_homography(&self.homography, p))
    }

    /// Map a field position back to pixels (inverse transform).
    pub fn unproject(&self, p: Point) -> Point {
        apply_homography(&self.inverse, p)
    }

    /// Set `field_position` on every record with an adjusted position.
    pub fn apply_to_tracks(&self, tracks: &mut TrackCollection) {
        tracks.for_each_record_mut(|_, _, _, record| {
            record.field_position = record
                .adjusted_pixel_position
                .and_then(|p| self.project(p));
        });
    }
}

/// Apply a 3x3 homography with perspective division.
fn apply_homography(h: &Matrix3<f64>, p: Point) -> Point {
    let v = h * Vector3::new(p.x, p.y, 1.0);
    let w = if v.z == 0.0 { 1e-7 } else { v.z };
    Point::new(v.x / w, v.y / w)
}

/// Solve the 8-unknown direct linear transform for 4 correspondences.
fn solve_homography(src: &[Point; 4], dst: &[Point; 4]) -> Result<Matrix3<f64>> {
    let mut a = DMatrix::zeros(8, 8);
    let mut b = DVector::zeros(8);

    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let r = i * 2;
        a[(r, 0)] = s.x;
        a[(r, 1)] = s.y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -d.x * s.x;
        a[(r, 7)] = -d.x * s.y;
        b[r] = d.x;

        a[(r + 1, 3)] = s.x;
        a[(r + 1, 4)] = s.y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -d.y * s.x;
        a[(r + 1, 7)] = -d.y * s.y;
        b[r + 1] = d.y;
    }

    let h = a.lu().solve(&b).ok_or_else(|| {
        Error::InvalidCalibration("degenerate calibration quadrilateral".to_string())
    })?;

    Ok(Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{BBox, TrackClass};
    use approx::assert_relative_eq;

    fn unit_to_field() -> ViewCalibration {
        ViewCalibration {
            pixel_quad: [
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0),
                Point::new(0.0, 100.0),
            ],
            field_quad: [
                Point::new(0.0, 0.0),
                Point::new(50.0, 0.0),
                Point::new(50.0, 50.0),
                Point::new(0.0, 50.0),
            ],
        }
    }

    #[test]
    fn test_square_scaling() {
        let transformer = ViewTransformer::new(&unit_to_field()).unwrap();
        let projected = transformer.project(Point::new(50.0, 50.0)).unwrap();
        assert_relative_eq!(projected.x, 25.0, epsilon = 1e-6);
        assert_relative_eq!(projected.y, 25.0, epsilon = 1e-6);
    }

    #[test]
    fn test_corner_roundtrip_default_calibration() {
        let calibration = ViewCalibration::default();
        let transformer = ViewTransformer::new(&calibration).unwrap();

        for (pixel, field) in calibration
            .pixel_quad
            .iter()
            .zip(calibration.field_quad.iter())
        {
            let projected = transformer.project(*pixel).expect("corner is on the quad");
            assert_relative_eq!(projected.x, field.x, epsilon = 1e-6);
            assert_relative_eq!(projected.y, field.y, epsilon = 1e-6);

            let back = transformer.unproject(projected);
            assert_relative_eq!(back.x, pixel.x, epsilon = 1e-4);
            assert_relative_eq!(back.y, pixel.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_outside_quad_is_none() {
        let transformer = ViewTransformer::new(&ViewCalibration::default()).unwrap();
        assert!(transformer.project(Point::new(0.0, 0.0)).is_none());
        assert!(transformer.project(Point::new(1900.0, 1060.0)).is_none());
    }

    #[test]
    fn test_inside_quad_projects() {
        let transformer = ViewTransformer::new(&ViewCalibration::default()).unwrap();
        // Centroid of the pixel quad is inside it.
        let centroid = Point::new(
            (110.0 + 265.0 + 910.0 + 1640.0) / 4.0,
            (1035.0 + 275.0 + 260.0 + 915.0) / 4.0,
        );
        assert!(transformer.project(centroid).is_some());
    }

    #[test]
    fn test_degenerate_calibration_rejected() {
        // All source points on one line.
        let calibration = ViewCalibration {
            pixel_quad: [
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(2.0, 0.0),
                Point::new(3.0, 0.0),
            ],
            field_quad: ViewCalibration::default().field_quad,
        };
        assert!(matches!(
            ViewTransformer::new(&calibration),
            Err(Error::InvalidCalibration(_))
        ));
    }

    #[test]
    fn test_apply_to_tracks_sets_only_inside_positions() {
        let transformer = ViewTransformer::new(&unit_to_field()).unwrap();
        let mut tracks = TrackCollection::new(1);
        tracks.insert(TrackClass::Player, 0, 1, BBox::new(40.0, 40.0, 60.0, 60.0));
        tracks.insert(TrackClass::Player, 0, 2, BBox::new(400.0, 400.0, 420.0, 420.0));

        // Adjusted positions must exist before projection.
        tracks.for_each_record_mut(|_, _, _, record| {
            record.adjusted_pixel_position = Some(record.pixel_position);
        });
        transformer.apply_to_tracks(&mut tracks);

        assert!(tracks.players_at(0)[&1].field_position.is_some());
        assert!(tracks.players_at(0)[&2].field_position.is_none());
    }
}
