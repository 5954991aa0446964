//! # Pitchlens - Football Match Analytics
//!
//! Post-tracking analytics over an already-tracked football video.
//!
//! Pitchlens consumes per-frame bounding boxes with stable track
//! identities (players, referees, ball) produced by an external
//! detector/tracker, and turns them into match statistics.
//!
//! ## Features
//!
//! - Camera motion compensation from background feature flow
//! - Pixel-to-field projection via a fixed homography
//! - Two-team color clustering with sticky per-track assignment
//! - Windowed speed and cumulative distance per track
//! - Ball possession, pass and turnover detection, pass graph
//!
//! ## Example
//!
//! ```rust,ignore
//! use pitchlens::{AnalysisPipeline, PipelineConfig, TrackCollection};
//!
//! let config = PipelineConfig::default();
//! let pipeline = AnalysisPipeline::new(config)?;
//!
//! // frames: Vec<RgbFrame>, tracks: TrackCollection from the tracker
//! let report = pipeline.run(&frames, &mut tracks)?;
//! println!("passes: {:?}", report.pass_counts);
//! ```

// Internal modules (hand-ported vision primitives)
pub(crate) mod internal;

// Public modules
pub mod track;
pub mod frame;
pub mod camera_motion;
pub mod view_transform;
pub mod clustering;
pub mod team;
pub mod kinematics;
pub mod possession;
pub mod pipeline;
pub mod report;

// Re-exports for convenience
pub use track::{BBox, Point, TeamId, TrackClass, TrackCollection, TrackId, TrackRecord};
pub use frame::{RegionMask, RgbFrame};
pub use camera_motion::{CameraMotionConfig, CameraMotionEstimator, MotionTrace};
pub use view_transform::{ViewCalibration, ViewTransformer};
pub use clustering::{Clusterer, Clustering, KMeans};
pub use team::TeamClassifier;
pub use kinematics::SpeedDistanceEstimator;
pub use possession::{BallAssigner, PossessionTracker};
pub use pipeline::{AnalysisPipeline, PipelineConfig};
pub use report::{MatchReport, SpeedSample};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur in the pitchlens library
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid calibration: {0}")]
        InvalidCalibration(String),

        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Clustering error: {0}")]
        ClusteringError(String),

        #[error("Serialization error: {0}")]
        SerializationError(#[from] serde_json::Error),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),
    }

    /// Result type for pitchlens operations
    pub type Result<T> = std::result::Result<T, Error>;
}
