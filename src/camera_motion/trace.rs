//! Per-video camera motion trace.

use std::fs;
use std::path::Path;

use crate::track::Point;
use crate::Result;

/// One camera displacement vector per frame, with cumulative offsets.
///
/// Entry `t` is the apparent shift of the static background between
/// frame `t - 1` and frame `t` (entry 0 is always zero). Subtracting
/// the cumulative offset from a pixel position pins it to the camera
/// pose of frame 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionTrace {
    per_frame: Vec<[f64; 2]>,
    cumulative: Vec<[f64; 2]>,
}

impl MotionTrace {
    /// Build a trace from per-frame displacement vectors.
    pub fn new(per_frame: Vec<[f64; 2]>) -> Self {
        let mut cumulative = Vec::with_capacity(per_frame.len());
        let mut sum = [0.0, 0.0];
        for d in &per_frame {
            sum[0] += d[0];
            sum[1] += d[1];
            cumulative.push(sum);
        }
        Self { per_frame, cumulative }
    }

    /// Number of frames covered by this trace.
    pub fn len(&self) -> usize {
        self.per_frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_frame.is_empty()
    }

    /// Displacement between `frame - 1` and `frame`.
    pub fn displacement(&self, frame: usize) -> [f64; 2] {
        self.per_frame[frame]
    }

    /// Accumulated camera offset from frame 0 up to and including `frame`.
    ///
    /// Frames past the end of the trace carry the last known offset;
    /// an empty trace yields zero.
    pub fn cumulative_offset(&self, frame: usize) -> Point {
        match self.cumulative.get(frame).or_else(|| self.cumulative.last()) {
            Some(&[x, y]) => Point::new(x, y),
            None => Point::new(0.0, 0.0),
        }
    }

    /// Load a trace previously written with [`MotionTrace::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let per_frame: Vec<[f64; 2]> = serde_json::from_slice(&bytes)?;
        Ok(Self::new(per_frame))
    }

    /// Persist the trace as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(&self.per_frame)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}
