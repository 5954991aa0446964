//! Aggregated match statistics produced by the pipeline.

use std::collections::HashMap;
use std::io::Write;

use crate::track::{TeamId, TrackClass, TrackCollection, TrackId};
use crate::Result;

/// One speed measurement, for external plotting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSample {
    pub frame: usize,
    pub track_id: TrackId,
    pub speed_kmh: f64,
}

/// Everything the pipeline reports besides the augmented tracks.
#[derive(Debug, Clone)]
pub struct MatchReport {
    /// Pass totals per team, indexed by [`TeamId::index`].
    pub pass_counts: [u64; 2],

    /// `(passer, receiver) -> count` for pass-network visualization.
    pub pass_graph: HashMap<(TrackId, TrackId), u64>,

    /// Controlling team per frame; `None` before first possession.
    pub ball_control: Vec<Option<TeamId>>,

    /// Player speed per frame, ordered by (frame, track id).
    pub speed_samples: Vec<SpeedSample>,
}

impl MatchReport {
    /// Passes completed by one team.
    pub fn passes_for(&self, team: TeamId) -> u64 {
        self.pass_counts[team.index()]
    }

    /// Total passes counted across both teams.
    pub fn total_passes(&self) -> u64 {
        self.pass_counts.iter().sum()
    }

    /// Fraction of attributed frames controlled by `team`.
    ///
    /// `None` when no frame has an attributed controlling team.
    pub fn control_share(&self, team: TeamId) -> Option<f64> {
        let attributed = self.ball_control.iter().flatten().count();
        if attributed == 0 {
            return None;
        }
        let owned = self
            .ball_control
            .iter()
            .flatten()
            .filter(|&&t| t == team)
            .count();
        Some(owned as f64 / attributed as f64)
    }

    /// Write the speed samples as `frame,track_id,speed_kmh` CSV.
    pub fn write_speed_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "frame,track_id,speed_kmh")?;
        for sample in &self.speed_samples {
            writeln!(
                writer,
                "{},{},{:.3}",
                sample.frame, sample.track_id, sample.speed_kmh
            )?;
        }
        Ok(())
    }

    /// Collect per-frame player speeds from an augmented collection.
    pub(crate) fn collect_speed_samples(tracks: &TrackCollection) -> Vec<SpeedSample> {
        let mut samples = Vec::new();
        for (frame, records) in tracks.class(TrackClass::Player).iter().enumerate() {
            for (&track_id, record) in records {
                if let Some(speed_kmh) = record.speed_kmh {
                    samples.push(SpeedSample {
                        frame,
                        track_id,
                        speed_kmh,
                    });
                }
            }
        }
        samples.sort_by_key(|s| (s.frame, s.track_id));
        samples
    }
}
