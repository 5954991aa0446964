//! Minimal frame representation.
//!
//! The crate does not decode video; callers hand it frames as packed
//! RGB buffers. Grayscale conversion and region masks exist only to
//! feed the camera-motion and team-color stages.

use crate::track::BBox;

/// A video frame as a packed RGB byte buffer (row-major, 3 bytes per pixel).
#[derive(Debug, Clone)]
pub struct RgbFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl RgbFrame {
    /// Wrap an existing RGB buffer.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height * 3`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), width * height * 3, "RGB buffer size mismatch");
        Self { width, height, data }
    }

    /// Create a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> [u8; 3],
    {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// RGB value at (x, y).
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Crop to the intersection of `bbox` and the frame bounds.
    ///
    /// Returns `None` when the intersection is empty.
    pub fn crop(&self, bbox: &BBox) -> Option<RgbFrame> {
        let x1 = bbox.x1.max(0.0) as usize;
        let y1 = bbox.y1.max(0.0) as usize;
        let x2 = (bbox.x2 as usize).min(self.width);
        let y2 = (bbox.y2 as usize).min(self.height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let (w, h) = (x2 - x1, y2 - y1);
        Some(RgbFrame::from_fn(w, h, |x, y| self.pixel(x1 + x, y1 + y)))
    }

    /// Convert to grayscale using the Rec. 601 luma weights.
    pub fn to_gray(&self) -> GrayFrame {
        let mut data = Vec::with_capacity(self.width * self.height);
        for chunk in self.data.chunks_exact(3) {
            let luma =
                0.299 * chunk[0] as f64 + 0.587 * chunk[1] as f64 + 0.114 * chunk[2] as f64;
            data.push(luma);
        }
        GrayFrame {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// A grayscale frame with f64 intensities, as consumed by the optical
/// flow and corner detection primitives.
#[derive(Debug, Clone)]
pub struct GrayFrame {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl GrayFrame {
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), width * height, "gray buffer size mismatch");
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Intensity at integer coordinates, clamped to the frame bounds.
    pub fn get(&self, x: i64, y: i64) -> f64 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[y * self.width + x]
    }

    /// Bilinearly interpolated intensity at subpixel coordinates.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (xi, yi) = (x0 as i64, y0 as i64);

        let v00 = self.get(xi, yi);
        let v10 = self.get(xi + 1, yi);
        let v01 = self.get(xi, yi + 1);
        let v11 = self.get(xi + 1, yi + 1);

        v00 * (1.0 - fx) * (1.0 - fy)
            + v10 * fx * (1.0 - fy)
            + v01 * (1.0 - fx) * fy
            + v11 * fx * fy
    }
}

/// Boolean mask selecting frame regions assumed static.
#[derive(Debug, Clone)]
pub struct RegionMask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl RegionMask {
    /// Mask selecting full-height vertical bands, given as half-open
    /// `(start_column, end_column)` ranges.
    ///
    /// Bands extending past the frame edge are clipped.
    pub fn vertical_bands(width: usize, height: usize, bands: &[(usize, usize)]) -> Self {
        let mut data = vec![false; width * height];
        for &(start, end) in bands {
            let end = end.min(width);
            for y in 0..height {
                for x in start..end {
                    data[y * width + x] = true;
                }
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether (x, y) is inside a masked (static) region.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rgb_pixel_access() {
        let frame = RgbFrame::from_fn(4, 2, |x, y| [x as u8, y as u8, 0]);
        assert_eq!(frame.pixel(3, 1), [3, 1, 0]);
        assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_crop_clips_to_bounds() {
        let frame = RgbFrame::from_fn(10, 10, |x, _| [x as u8, 0, 0]);
        let crop = frame.crop(&BBox::new(5.0, 5.0, 20.0, 20.0)).unwrap();
        assert_eq!(crop.width(), 5);
        assert_eq!(crop.height(), 5);
        assert_eq!(crop.pixel(0, 0), [5, 0, 0]);
    }

    #[test]
    fn test_crop_empty_intersection() {
        let frame = RgbFrame::from_fn(10, 10, |_, _| [0, 0, 0]);
        assert!(frame.crop(&BBox::new(20.0, 20.0, 30.0, 30.0)).is_none());
        assert!(frame.crop(&BBox::new(5.0, 5.0, 5.0, 9.0)).is_none());
    }

    #[test]
    fn test_gray_bilinear_sample() {
        // 2x2 gradient: 0 10 / 20 30
        let gray = GrayFrame::new(2, 2, vec![0.0, 10.0, 20.0, 30.0]);
        assert_relative_eq!(gray.sample(0.0, 0.0), 0.0, epsilon = 1e-10);
        assert_relative_eq!(gray.sample(0.5, 0.5), 15.0, epsilon = 1e-10);
        assert_relative_eq!(gray.sample(1.0, 0.0), 10.0, epsilon = 1e-10);
    }

    #[test]
    fn test_vertical_band_mask() {
        let mask = RegionMask::vertical_bands(100, 10, &[(0, 20), (90, 150)]);
        assert!(mask.contains(5, 3));
        assert!(mask.contains(95, 9));
        assert!(!mask.contains(50, 5));
        assert!(!mask.contains(200, 5));
    }
}
