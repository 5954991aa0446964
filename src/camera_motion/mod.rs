//! Camera motion compensation module.
//!
//! Estimates per-frame camera translation from the optical flow of
//! background features, and adjusts track positions so they are
//! comparable across frames:
//!
//! - Per-frame displacement estimation with feature re-seeding
//! - A serializable motion trace with cumulative offsets
//! - A read-through file cache keyed by video identity

mod estimator;
mod trace;

pub use estimator::{CameraMotionConfig, CameraMotionEstimator};
pub use trace::MotionTrace;
