//! Internal vision primitives.
//!
//! Hand-written ports of the two OpenCV routines the camera-motion
//! estimator needs:
//! - features: Shi-Tomasi corner selection (goodFeaturesToTrack)
//! - optical_flow: iterative Lucas-Kanade point tracking

pub mod features;
pub mod optical_flow;
