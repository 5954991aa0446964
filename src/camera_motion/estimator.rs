//! Camera motion estimation from background feature flow.

use std::path::Path;

use tracing::{debug, warn};

use crate::frame::{RegionMask, RgbFrame};
use crate::internal::features::{good_features_to_track, CornerConfig};
use crate::internal::optical_flow::{track_points, FlowConfig};
use crate::track::{Point, TrackCollection};

use super::MotionTrace;

/// Parameters for camera motion estimation.
#[derive(Debug, Clone)]
pub struct CameraMotionConfig {
    /// Full-height vertical column bands assumed mostly static
    /// (pitch boundary areas away from the play).
    pub static_bands: Vec<(usize, usize)>,

    /// Corner selection parameters.
    pub corners: CornerConfig,

    /// Optical flow parameters.
    pub flow: FlowConfig,

    /// Displacements below this magnitude (px) are treated as no motion.
    pub min_displacement: f64,

    /// Re-detect corners when fewer than this many remain trackable.
    pub reseed_threshold: usize,
}

impl Default for CameraMotionConfig {
    fn default() -> Self {
        Self {
            static_bands: vec![(0, 20), (900, 1050)],
            corners: CornerConfig::default(),
            flow: FlowConfig::default(),
            min_displacement: 5.0,
            reseed_threshold: 25,
        }
    }
}

/// Estimates per-frame camera translation and compensates track positions.
///
/// The estimator follows sparse corners inside the static bands of the
/// frame. For each consecutive frame pair the dominant (maximum
/// magnitude) feature displacement is taken as the camera motion for
/// that frame; corners are re-seeded after detected motion and
/// whenever too few survive tracking.
pub struct CameraMotionEstimator {
    mask: RegionMask,
    config: CameraMotionConfig,
}

impl CameraMotionEstimator {
    /// Create an estimator; the first frame fixes the static-region mask.
    pub fn new(first_frame: &RgbFrame, config: CameraMotionConfig) -> Self {
        let mask = RegionMask::vertical_bands(
            first_frame.width(),
            first_frame.height(),
            &config.static_bands,
        );
        Self { mask, config }
    }

    /// Estimate one displacement vector per frame.
    ///
    /// Entry 0 is always `[0, 0]`; entry `t` is the motion between
    /// frame `t - 1` and frame `t`.
    pub fn estimate(&self, frames: &[RgbFrame]) -> MotionTrace {
        if frames.is_empty() {
            return MotionTrace::new(Vec::new());
        }

        let mut per_frame = Vec::with_capacity(frames.len());
        per_frame.push([0.0, 0.0]);

        let mut prev_gray = frames[0].to_gray();
        let mut features = good_features_to_track(&prev_gray, &self.mask, &self.config.corners);
        debug!(corners = features.len(), "seeded camera motion features");

        for frame in &frames[1..] {
            let gray = frame.to_gray();
            let tracked = track_points(&prev_gray, &gray, &features, &self.config.flow);

            // Dominant displacement among surviving features.
            let mut survivors: Vec<Point> = Vec::with_capacity(features.len());
            let mut dominant = [0.0, 0.0];
            let mut dominant_mag = 0.0;
            for (old, new) in features.iter().zip(&tracked) {
                if let Some(new) = new {
                    let flow = new - old;
                    let mag = flow.norm();
                    if mag > dominant_mag {
                        dominant_mag = mag;
                        dominant = [flow.x, flow.y];
                    }
                    survivors.push(*new);
                }
            }

            let moved = dominant_mag >= self.config.min_displacement;
            per_frame.push(if moved { dominant } else { [0.0, 0.0] });

            if moved || survivors.len() < self.config.reseed_threshold {
                features = good_features_to_track(&gray, &self.mask, &self.config.corners);
            } else {
                features = survivors;
            }
            prev_gray = gray;
        }

        MotionTrace::new(per_frame)
    }

    /// Estimate with a read-through cache at `path`.
    ///
    /// A cached trace is used only when its frame count matches;
    /// anything stale, missing, or unreadable triggers recomputation.
    /// Failure to write the refreshed cache is never fatal.
    pub fn estimate_cached(&self, frames: &[RgbFrame], path: &Path) -> MotionTrace {
        match MotionTrace::load(path) {
            Ok(trace) if trace.len() == frames.len() => {
                debug!(path = %path.display(), "loaded camera motion trace from cache");
                return trace;
            }
            Ok(trace) => {
                warn!(
                    path = %path.display(),
                    cached = trace.len(),
                    frames = frames.len(),
                    "stale camera motion cache, recomputing"
                );
            }
            Err(err) => {
                if path.exists() {
                    warn!(path = %path.display(), %err, "unreadable camera motion cache, recomputing");
                }
            }
        }

        let trace = self.estimate(frames);
        if let Err(err) = trace.save(path) {
            warn!(path = %path.display(), %err, "failed to write camera motion cache");
        }
        trace
    }

    /// Write camera-compensated positions into every track record.
    ///
    /// `adjusted_pixel_position = pixel_position - cumulative_offset(frame)`.
    pub fn apply_to_tracks(tracks: &mut TrackCollection, trace: &MotionTrace) {
        tracks.for_each_record_mut(|_, frame, _, record| {
            let offset = trace.cumulative_offset(frame);
            record.adjusted_pixel_position = Some(record.pixel_position - offset);
        });
    }
}
