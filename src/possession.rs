//! Ball possession tracking and pass detection.
//!
//! A per-frame state machine: the ball is assigned to the nearest
//! player within a threshold, and possessor changes become pass events
//! (same team) or turnovers (different team). The per-frame team
//! ball-control series deliberately carries the last known team
//! forward through possessor-less frames so the reported series never
//! has gaps.

use std::collections::HashMap;

use tracing::warn;

use crate::track::{BBox, Point, TeamId, TrackId, TrackRecord};

/// Assigns the ball to the nearest player under a distance threshold.
#[derive(Debug, Clone)]
pub struct BallAssigner {
    /// Maximum foot-to-ball distance (px) for possession.
    pub max_distance: f64,
}

impl Default for BallAssigner {
    fn default() -> Self {
        Self { max_distance: 70.0 }
    }
}

impl BallAssigner {
    /// Nearest player to the ball center, measured from the closer of
    /// the player's two bottom bbox corners. `None` when nobody is
    /// within the threshold.
    ///
    /// Ties break toward the lower track id, keeping the result
    /// independent of map iteration order.
    pub fn assign(
        &self,
        players: &HashMap<TrackId, TrackRecord>,
        ball_bbox: &BBox,
    ) -> Option<TrackId> {
        let ball = ball_bbox.center();

        let mut best: Option<(f64, TrackId)> = None;
        for (&id, record) in players {
            let left = Point::new(record.bbox.x1, record.bbox.y2);
            let right = Point::new(record.bbox.x2, record.bbox.y2);
            let distance = (left - ball).norm().min((right - ball).norm());
            if distance > self.max_distance {
                continue;
            }

            let closer = match best {
                None => true,
                Some((best_dist, best_id)) => {
                    distance < best_dist || (distance == best_dist && id < best_id)
                }
            };
            if closer {
                best = Some((distance, id));
            }
        }

        best.map(|(_, id)| id)
    }
}

/// Per-frame possession state machine with pass/turnover accounting.
#[derive(Debug, Clone, Default)]
pub struct PossessionTracker {
    assigner: BallAssigner,
    previous_possessor: Option<TrackId>,
    previous_team: Option<TeamId>,
    pass_counts: [u64; 2],
    pass_graph: HashMap<(TrackId, TrackId), u64>,
    ball_control: Vec<Option<TeamId>>,
    last_control: Option<TeamId>,
}

impl PossessionTracker {
    pub fn new(assigner: BallAssigner) -> Self {
        Self {
            assigner,
            ..Self::default()
        }
    }

    /// Evaluate one frame.
    ///
    /// Marks the possessor's record with `has_ball`, counts pass and
    /// turnover events, and appends one entry to the ball-control
    /// series. A possessor without a team assignment is a data defect:
    /// the frame is logged and excluded from accounting, but the
    /// geometric `has_ball` flag is still set.
    pub fn observe_frame(
        &mut self,
        frame_num: usize,
        players: &mut HashMap<TrackId, TrackRecord>,
        ball_bbox: Option<&BBox>,
    ) {
        let possessor = ball_bbox.and_then(|bbox| self.assigner.assign(players, bbox));

        let Some(current) = possessor else {
            // No possessor: repeat the last known team, update nothing.
            self.ball_control.push(self.last_control);
            return;
        };

        if let Some(record) = players.get_mut(&current) {
            record.has_ball = true;
        }

        let team = players.get(&current).and_then(|r| r.team_id);
        let Some(team) = team else {
            warn!(
                frame_num,
                track_id = current,
                "possessor has no team assignment, frame excluded from possession accounting"
            );
            self.ball_control.push(self.last_control);
            return;
        };

        if let (Some(previous), Some(previous_team)) = (self.previous_possessor, self.previous_team)
        {
            if previous != current {
                if previous_team == team {
                    // Pass: same team, new player.
                    self.pass_counts[team.index()] += 1;
                    *self.pass_graph.entry((previous, current)).or_insert(0) += 1;
                }
                // Different team: turnover - nothing is counted, the
                // control series below switches attribution.
            }
        }

        self.previous_possessor = Some(current);
        self.previous_team = Some(team);
        self.last_control = Some(team);
        self.ball_control.push(Some(team));
    }

    /// Pass totals per team, indexed by [`TeamId::index`].
    pub fn pass_counts(&self) -> [u64; 2] {
        self.pass_counts
    }

    /// Passes completed by one team.
    pub fn passes_for(&self, team: TeamId) -> u64 {
        self.pass_counts[team.index()]
    }

    /// `(passer, receiver) -> count` over all counted passes.
    pub fn pass_graph(&self) -> &HashMap<(TrackId, TrackId), u64> {
        &self.pass_graph
    }

    /// One entry per observed frame; `None` until a team first takes
    /// possession, then always the last known controlling team.
    pub fn ball_control(&self) -> &[Option<TeamId>] {
        &self.ball_control
    }

    /// Last accounted possessor, if any.
    pub fn previous_possessor(&self) -> Option<TrackId> {
        self.previous_possessor
    }

    /// Consume the tracker, returning (pass_counts, pass_graph, ball_control).
    pub fn into_parts(self) -> ([u64; 2], HashMap<(TrackId, TrackId), u64>, Vec<Option<TeamId>>) {
        (self.pass_counts, self.pass_graph, self.ball_control)
    }
}
