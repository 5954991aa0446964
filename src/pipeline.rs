//! The batch analytics pipeline.
//!
//! Stages run in a fixed dependency order over the whole video, each
//! mutating only the record fields it owns:
//! camera motion -> field projection -> team assignment -> kinematics
//! -> possession.

use std::path::PathBuf;

use tracing::debug;

use crate::camera_motion::{CameraMotionConfig, CameraMotionEstimator};
use crate::clustering::KMeans;
use crate::frame::RgbFrame;
use crate::kinematics::SpeedDistanceEstimator;
use crate::possession::{BallAssigner, PossessionTracker};
use crate::report::MatchReport;
use crate::team::TeamClassifier;
use crate::track::{TrackClass, TrackCollection};
use crate::view_transform::{ViewCalibration, ViewTransformer};
use crate::{Error, Result};

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Homography calibration; the one mandatory piece of configuration.
    pub calibration: ViewCalibration,

    /// Camera motion estimation parameters.
    pub camera_motion: CameraMotionConfig,

    /// Read-through cache file for the camera motion trace, keyed by
    /// video identity by the caller. `None` disables caching.
    pub motion_cache: Option<PathBuf>,

    /// Clustering used for team colors.
    pub clusterer: KMeans,

    /// Frames per speed estimation window.
    pub speed_window: usize,

    /// Video frame rate.
    pub frame_rate: f64,

    /// Ball possession distance threshold.
    pub ball_assigner: BallAssigner,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            calibration: ViewCalibration::default(),
            camera_motion: CameraMotionConfig::default(),
            motion_cache: None,
            clusterer: KMeans::default(),
            speed_window: 5,
            frame_rate: 24.0,
            ball_assigner: BallAssigner::default(),
        }
    }
}

/// Runs the full post-tracking analytics pass over one video.
pub struct AnalysisPipeline {
    config: PipelineConfig,
    transformer: ViewTransformer,
}

impl AnalysisPipeline {
    /// Validate configuration and precompute the homography.
    ///
    /// An unusable calibration fails here, before any frame is touched.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        if config.frame_rate <= 0.0 {
            return Err(Error::InvalidConfig("frame_rate must be positive".to_string()));
        }
        if config.speed_window == 0 {
            return Err(Error::InvalidConfig("speed_window must be positive".to_string()));
        }
        let transformer = ViewTransformer::new(&config.calibration)?;
        Ok(Self { config, transformer })
    }

    /// Run every stage, augmenting `tracks` in place.
    pub fn run(&self, frames: &[RgbFrame], tracks: &mut TrackCollection) -> Result<MatchReport> {
        if frames.len() != tracks.num_frames() {
            return Err(Error::InvalidConfig(format!(
                "{} frames but {} tracked frames",
                frames.len(),
                tracks.num_frames()
            )));
        }

        // Stage 1: camera motion compensation.
        if let Some(first) = frames.first() {
            let estimator = CameraMotionEstimator::new(first, self.config.camera_motion.clone());
            let trace = match &self.config.motion_cache {
                Some(path) => estimator.estimate_cached(frames, path),
                None => estimator.estimate(frames),
            };
            CameraMotionEstimator::apply_to_tracks(tracks, &trace);
            debug!(frames = trace.len(), "camera motion compensated");
        }

        // Stage 2: pixel-to-field projection.
        self.transformer.apply_to_tracks(tracks);
        debug!("field positions projected");

        // Stage 3: team assignment.
        let mut classifier = TeamClassifier::new(self.config.clusterer.clone());
        if !frames.is_empty() {
            classifier.bootstrap(&frames[0], tracks.players_at(0));
            classifier.apply_to_tracks(frames, tracks);
        }
        debug!(bootstrapped = classifier.is_bootstrapped(), "teams assigned");

        // Stage 4: speed and distance.
        let mut kinematics =
            SpeedDistanceEstimator::new(self.config.speed_window, self.config.frame_rate);
        kinematics.apply_to_tracks(tracks);
        debug!("speed and distance estimated");

        // Stage 5: possession and passes.
        let mut possession = PossessionTracker::new(self.config.ball_assigner.clone());
        for frame in 0..tracks.num_frames() {
            let ball_bbox = tracks.ball_bbox_at(frame);
            possession.observe_frame(
                frame,
                &mut tracks.class_mut(TrackClass::Player)[frame],
                ball_bbox.as_ref(),
            );
        }
        let (pass_counts, pass_graph, ball_control) = possession.into_parts();
        debug!(
            passes = pass_counts.iter().sum::<u64>(),
            "possession evaluated"
        );

        Ok(MatchReport {
            pass_counts,
            pass_graph,
            ball_control,
            speed_samples: MatchReport::collect_speed_samples(tracks),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Point;

    #[test]
    fn test_degenerate_calibration_fails_at_startup() {
        let config = PipelineConfig {
            calibration: ViewCalibration {
                pixel_quad: [
                    Point::new(0.0, 0.0),
                    Point::new(1.0, 1.0),
                    Point::new(2.0, 2.0),
                    Point::new(3.0, 3.0),
                ],
                field_quad: ViewCalibration::default().field_quad,
            },
            ..PipelineConfig::default()
        };
        assert!(matches!(
            AnalysisPipeline::new(config),
            Err(Error::InvalidCalibration(_))
        ));
    }

    #[test]
    fn test_invalid_frame_rate_rejected() {
        let config = PipelineConfig {
            frame_rate: 0.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            AnalysisPipeline::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_frame_count_mismatch_rejected() {
        let pipeline = AnalysisPipeline::new(PipelineConfig::default()).unwrap();
        let mut tracks = TrackCollection::new(3);
        assert!(pipeline.run(&[], &mut tracks).is_err());
    }

    #[test]
    fn test_empty_video_produces_empty_report() {
        let pipeline = AnalysisPipeline::new(PipelineConfig::default()).unwrap();
        let mut tracks = TrackCollection::new(0);

        let report = pipeline.run(&[], &mut tracks).unwrap();
        assert_eq!(report.pass_counts, [0, 0]);
        assert!(report.pass_graph.is_empty());
        assert!(report.ball_control.is_empty());
        assert!(report.speed_samples.is_empty());
    }
}
