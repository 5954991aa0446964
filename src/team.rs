//! Two-team appearance classification.
//!
//! Players are assigned to one of exactly two teams by shirt color.
//! A bootstrap frame fixes the two team centroids; afterwards every
//! track gets a sticky assignment - classified once, never revisited,
//! so frame-to-frame appearance noise cannot flicker a player between
//! teams.

use std::collections::HashMap;

use nalgebra::DMatrix;
use tracing::warn;

use crate::clustering::{Clusterer, Clustering, KMeans};
use crate::frame::RgbFrame;
use crate::track::{BBox, TeamId, TrackClass, TrackCollection, TrackId, TrackRecord};

/// Crops smaller than this on either side carry too little shirt to cluster.
const MIN_CROP_SIDE: usize = 5;

/// Sticky two-team classifier over shirt colors.
pub struct TeamClassifier<C: Clusterer = KMeans> {
    clusterer: C,
    teams: Option<Clustering>,
    assignments: HashMap<TrackId, TeamId>,
}

impl Default for TeamClassifier<KMeans> {
    fn default() -> Self {
        Self::new(KMeans::default())
    }
}

impl<C: Clusterer> TeamClassifier<C> {
    pub fn new(clusterer: C) -> Self {
        Self {
            clusterer,
            teams: None,
            assignments: HashMap::new(),
        }
    }

    /// Representative shirt color for a player crop.
    ///
    /// Takes the top half of the bounding box (avoids shorts and
    /// ground), clusters its pixels into two groups, and discards the
    /// group dominating the crop corners - corners are assumed
    /// background. Returns `None` when the crop is too small.
    pub fn shirt_color(&self, frame: &RgbFrame, bbox: &BBox) -> Option<[f64; 3]> {
        let crop = frame.crop(bbox)?;
        if crop.width() < MIN_CROP_SIDE || crop.height() < MIN_CROP_SIDE {
            return None;
        }

        let w = crop.width();
        let h = crop.height() / 2;
        let mut pixels = DMatrix::zeros(w * h, 3);
        for y in 0..h {
            for x in 0..w {
                let [r, g, b] = crop.pixel(x, y);
                let i = y * w + x;
                pixels[(i, 0)] = r as f64;
                pixels[(i, 1)] = g as f64;
                pixels[(i, 2)] = b as f64;
            }
        }

        let clustering = self.clusterer.cluster(&pixels, 2).ok()?;

        // Majority label among the four crop corners is background.
        let corners = [
            clustering.labels[0],
            clustering.labels[w - 1],
            clustering.labels[(h - 1) * w],
            clustering.labels[(h - 1) * w + w - 1],
        ];
        let background = if corners.iter().filter(|&&l| l == 0).count() >= 2 {
            0
        } else {
            1
        };
        let shirt = 1 - background;

        Some([
            clustering.centroids[(shirt, 0)],
            clustering.centroids[(shirt, 1)],
            clustering.centroids[(shirt, 2)],
        ])
    }

    /// Fix the two team centroids from the players of one frame and
    /// assign each of them a sticky team id.
    ///
    /// With fewer than two measurable players the classifier stays
    /// unbootstrapped: a warning is logged and nothing is assigned.
    pub fn bootstrap(&mut self, frame: &RgbFrame, players: &HashMap<TrackId, TrackRecord>) {
        // Fixed id order keeps the cluster labels reproducible.
        let mut ids: Vec<TrackId> = players.keys().copied().collect();
        ids.sort_unstable();

        let mut colors: Vec<(TrackId, [f64; 3])> = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(color) = self.shirt_color(frame, &players[&id].bbox) {
                colors.push((id, color));
            }
        }

        if colors.len() < 2 {
            warn!(
                players = colors.len(),
                "not enough players to cluster teams, bootstrap skipped"
            );
            return;
        }

        let mut points = DMatrix::zeros(colors.len(), 3);
        for (i, (_, color)) in colors.iter().enumerate() {
            for j in 0..3 {
                points[(i, j)] = color[j];
            }
        }

        let clustering = match self.clusterer.cluster(&points, 2) {
            Ok(c) => c,
            Err(err) => {
                warn!(%err, "team color clustering failed, bootstrap skipped");
                return;
            }
        };

        for (i, (id, _)) in colors.iter().enumerate() {
            self.assignments
                .entry(*id)
                .or_insert(TeamId::from_cluster(clustering.labels[i]));
        }
        self.teams = Some(clustering);
    }

    /// Team of `track_id`, classifying and caching it on first sight.
    ///
    /// Returns `None` (with a warning) when the classifier was never
    /// bootstrapped, or when no shirt color can be measured for an
    /// unseen track.
    pub fn assign(&mut self, frame: &RgbFrame, bbox: &BBox, track_id: TrackId) -> Option<TeamId> {
        if let Some(&team) = self.assignments.get(&track_id) {
            return Some(team);
        }

        let Some(teams) = &self.teams else {
            warn!(track_id, "team centroids not bootstrapped, cannot assign");
            return None;
        };

        let color = self.shirt_color(frame, bbox)?;
        let team = TeamId::from_cluster(teams.predict(&color));
        self.assignments.insert(track_id, team);
        Some(team)
    }

    /// Representative color of a team, when bootstrapped.
    pub fn team_color(&self, team: TeamId) -> Option<[f64; 3]> {
        let teams = self.teams.as_ref()?;
        let row = team.index();
        Some([
            teams.centroids[(row, 0)],
            teams.centroids[(row, 1)],
            teams.centroids[(row, 2)],
        ])
    }

    /// Whether the bootstrap has fixed the team centroids.
    pub fn is_bootstrapped(&self) -> bool {
        self.teams.is_some()
    }

    /// Classify every player record of every frame.
    ///
    /// `frames` and `tracks` must cover the same video.
    pub fn apply_to_tracks(&mut self, frames: &[RgbFrame], tracks: &mut TrackCollection) {
        for frame_num in 0..tracks.num_frames().min(frames.len()) {
            let frame = &frames[frame_num];

            let ids: Vec<(TrackId, BBox)> = tracks
                .players_at(frame_num)
                .iter()
                .map(|(&id, record)| (id, record.bbox))
                .collect();

            for (id, bbox) in ids {
                let team = self.assign(frame, &bbox, id);
                if let Some(record) = tracks.class_mut(TrackClass::Player)[frame_num].get_mut(&id) {
                    record.team_id = team;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackClass;

    const GREEN: [u8; 3] = [20, 120, 30];
    const RED: [u8; 3] = [200, 30, 30];
    const BLUE: [u8; 3] = [30, 30, 200];

    /// Green pitch with solid shirt rectangles inset into each bbox,
    /// leaving background at the crop corners.
    fn pitch_frame(width: usize, height: usize, shirts: &[(BBox, [u8; 3])]) -> RgbFrame {
        RgbFrame::from_fn(width, height, |x, y| {
            for (bbox, color) in shirts {
                let x1 = bbox.x1 as usize + 3;
                let x2 = bbox.x2 as usize - 3;
                let y1 = bbox.y1 as usize + 3;
                let y2 = bbox.y1 as usize + (bbox.height() as usize) / 2 - 1;
                if x >= x1 && x < x2 && y >= y1 && y < y2 {
                    return *color;
                }
            }
            GREEN
        })
    }

    fn players(bboxes: &[(TrackId, BBox)]) -> HashMap<TrackId, TrackRecord> {
        bboxes
            .iter()
            .map(|&(id, bbox)| (id, TrackRecord::new(TrackClass::Player, bbox)))
            .collect()
    }

    #[test]
    fn test_shirt_color_ignores_background() {
        let bbox = BBox::new(10.0, 10.0, 40.0, 70.0);
        let frame = pitch_frame(100, 100, &[(bbox, RED)]);
        let classifier = TeamClassifier::default();

        let color = classifier.shirt_color(&frame, &bbox).unwrap();
        assert!(color[0] > 150.0, "red channel should dominate: {:?}", color);
        assert!(color[2] < 100.0, "blue channel should be low: {:?}", color);
    }

    #[test]
    fn test_shirt_color_tiny_crop_is_none() {
        let frame = pitch_frame(100, 100, &[]);
        let classifier = TeamClassifier::default();
        assert!(classifier
            .shirt_color(&frame, &BBox::new(10.0, 10.0, 13.0, 13.0))
            .is_none());
    }

    #[test]
    fn test_bootstrap_splits_two_teams() {
        let a = BBox::new(5.0, 10.0, 35.0, 70.0);
        let b = BBox::new(60.0, 10.0, 90.0, 70.0);
        let frame = pitch_frame(120, 100, &[(a, RED), (b, BLUE)]);

        let mut classifier = TeamClassifier::default();
        classifier.bootstrap(&frame, &players(&[(1, a), (2, b)]));

        assert!(classifier.is_bootstrapped());
        let team_a = classifier.assign(&frame, &a, 1).unwrap();
        let team_b = classifier.assign(&frame, &b, 2).unwrap();
        assert_ne!(team_a, team_b);
    }

    #[test]
    fn test_bootstrap_single_player_warns_and_skips() {
        let a = BBox::new(5.0, 10.0, 35.0, 70.0);
        let frame = pitch_frame(120, 100, &[(a, RED)]);

        let mut classifier = TeamClassifier::default();
        classifier.bootstrap(&frame, &players(&[(1, a)]));

        assert!(!classifier.is_bootstrapped());
        assert!(classifier.assign(&frame, &a, 1).is_none());
    }

    #[test]
    fn test_assign_without_bootstrap_is_none() {
        let a = BBox::new(5.0, 10.0, 35.0, 70.0);
        let frame = pitch_frame(120, 100, &[(a, RED)]);

        let mut classifier = TeamClassifier::default();
        assert!(classifier.assign(&frame, &a, 9).is_none());
    }

    #[test]
    fn test_assignment_is_sticky() {
        let a = BBox::new(5.0, 10.0, 35.0, 70.0);
        let b = BBox::new(60.0, 10.0, 90.0, 70.0);
        let frame = pitch_frame(120, 100, &[(a, RED), (b, BLUE)]);

        let mut classifier = TeamClassifier::default();
        classifier.bootstrap(&frame, &players(&[(1, a), (2, b)]));
        let first = classifier.assign(&frame, &a, 1).unwrap();

        // Same track presented with the other team's appearance keeps its id.
        let swapped = pitch_frame(120, 100, &[(a, BLUE), (b, RED)]);
        let second = classifier.assign(&swapped, &a, 1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unseen_track_classified_against_centroids() {
        let a = BBox::new(5.0, 10.0, 35.0, 70.0);
        let b = BBox::new(60.0, 10.0, 90.0, 70.0);
        let frame = pitch_frame(120, 100, &[(a, RED), (b, BLUE)]);

        let mut classifier = TeamClassifier::default();
        classifier.bootstrap(&frame, &players(&[(1, a), (2, b)]));
        let red_team = classifier.assign(&frame, &a, 1).unwrap();

        // A new red-shirted player appears later at b's location.
        let late_frame = pitch_frame(120, 100, &[(b, RED)]);
        let late = classifier.assign(&late_frame, &b, 30).unwrap();
        assert_eq!(late, red_team);
    }
}
