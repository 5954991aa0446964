//! Windowed speed and cumulative distance estimation.
//!
//! Raw per-frame displacement is far too noisy to report as a speed,
//! so the frame range is cut into fixed windows and each window gets
//! one speed value, written to every frame it covers (a staircase
//! series). Cumulative distance persists across the whole video and
//! is never reset.

use std::collections::HashMap;

use crate::track::{TrackClass, TrackCollection, TrackId};

/// Meters-per-second to kilometers-per-hour.
const MS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, Copy, Default)]
struct TrackState {
    speed_kmh: f64,
    distance_m: f64,
}

/// Computes per-track speed and distance from field positions.
#[derive(Debug, Clone)]
pub struct SpeedDistanceEstimator {
    /// Frames per estimation window.
    pub window: usize,

    /// Video frame rate used to convert frames to seconds.
    pub frame_rate: f64,

    state: HashMap<TrackId, TrackState>,
}

impl Default for SpeedDistanceEstimator {
    fn default() -> Self {
        Self::new(5, 24.0)
    }
}

impl SpeedDistanceEstimator {
    pub fn new(window: usize, frame_rate: f64) -> Self {
        Self {
            window: window.max(1),
            frame_rate,
            state: HashMap::new(),
        }
    }

    /// Fill `speed_kmh` and `distance_m` on player records.
    ///
    /// The ball and referees are skipped. A window with a missing
    /// endpoint position contributes nothing and leaves the track's
    /// accumulated distance untouched.
    pub fn apply_to_tracks(&mut self, tracks: &mut TrackCollection) {
        let num_frames = tracks.num_frames();
        if num_frames == 0 {
            return;
        }

        for class in TrackClass::ALL {
            if matches!(class, TrackClass::Ball | TrackClass::Referee) {
                continue;
            }

            for start in (0..num_frames).step_by(self.window) {
                let end = (start + self.window).min(num_frames - 1);

                let ids: Vec<TrackId> = tracks.class(class)[start].keys().copied().collect();
                for id in ids {
                    let entry = self.state.entry(id).or_default();

                    let start_pos = tracks.class(class)[start]
                        .get(&id)
                        .and_then(|r| r.field_position);
                    let end_pos = tracks.class(class)[end]
                        .get(&id)
                        .and_then(|r| r.field_position);

                    if let (Some(start_pos), Some(end_pos)) = (start_pos, end_pos) {
                        if end > start {
                            let displacement = (end_pos - start_pos).norm();
                            let elapsed = (end - start) as f64 / self.frame_rate;
                            entry.speed_kmh = displacement / elapsed * MS_TO_KMH;
                            entry.distance_m += displacement;
                        }
                    }

                    // Plateau: every frame of the window reports the
                    // window's values, whether or not it was updated.
                    let (speed, distance) = (entry.speed_kmh, entry.distance_m);
                    for frame in start..end.max(start + 1) {
                        if let Some(record) = tracks.class_mut(class)[frame].get_mut(&id) {
                            record.speed_kmh = Some(speed);
                            record.distance_m = Some(distance);
                        }
                    }
                }
            }
        }
    }

    /// Accumulated distance of a track, if it was ever measured.
    pub fn total_distance(&self, track_id: TrackId) -> Option<f64> {
        self.state.get(&track_id).map(|s| s.distance_m)
    }
}
