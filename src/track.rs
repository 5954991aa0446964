//! Track collection data model.
//!
//! The external detector/tracker hands this crate a [`TrackCollection`]:
//! for each object class, one map of track id to [`TrackRecord`] per
//! frame. Records start with just a bounding box; each pipeline stage
//! fills in the fields it owns.

use std::collections::HashMap;
use std::fmt;

use nalgebra::Vector2;

/// 2D point in pixel or field coordinates.
pub type Point = Vector2<f64>;

/// Stable track identity assigned by the external tracker.
pub type TrackId = i64;

/// Object class of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackClass {
    Player,
    Referee,
    Ball,
}

impl TrackClass {
    /// All classes, in a fixed iteration order.
    pub const ALL: [TrackClass; 3] = [TrackClass::Player, TrackClass::Referee, TrackClass::Ball];
}

/// Team identity - a closed, two-member enumeration.
///
/// Exactly two teams exist; any other value is unrepresentable.
/// Displayed as `1` and `2` in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TeamId {
    One,
    Two,
}

impl TeamId {
    /// Zero-based index, for indexing two-element arrays.
    pub fn index(self) -> usize {
        match self {
            TeamId::One => 0,
            TeamId::Two => 1,
        }
    }

    /// One-based team number as reported externally.
    pub fn number(self) -> u8 {
        match self {
            TeamId::One => 1,
            TeamId::Two => 2,
        }
    }

    /// Map a binary cluster label (0 or 1) to a team id.
    pub fn from_cluster(label: usize) -> TeamId {
        if label == 0 {
            TeamId::One
        } else {
            TeamId::Two
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Axis-aligned pixel-space bounding box.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box center.
    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Bottom-center of the box - where a player touches the ground.
    pub fn foot_position(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, self.y2)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// Per-frame record of one track.
///
/// `bbox` and `pixel_position` are set at construction; the remaining
/// fields are filled by the pipeline stage that owns them and stay
/// `None`/default until that stage runs.
#[derive(Debug, Clone)]
pub struct TrackRecord {
    /// Raw bounding box from the tracker.
    pub bbox: BBox,

    /// Reference point: foot position for players/referees, center for the ball.
    pub pixel_position: Point,

    /// Pixel position after camera motion compensation.
    pub adjusted_pixel_position: Option<Point>,

    /// Real-world field position; unset outside the calibrated region.
    pub field_position: Option<Point>,

    /// Team membership, sticky once assigned.
    pub team_id: Option<TeamId>,

    /// Windowed speed in km/h.
    pub speed_kmh: Option<f64>,

    /// Cumulative distance covered in meters.
    pub distance_m: Option<f64>,

    /// Whether this track possesses the ball in this frame.
    pub has_ball: bool,
}

impl TrackRecord {
    /// Create a record for the given class, seeding the reference point.
    pub fn new(class: TrackClass, bbox: BBox) -> Self {
        let pixel_position = match class {
            TrackClass::Ball => bbox.center(),
            TrackClass::Player | TrackClass::Referee => bbox.foot_position(),
        };
        Self {
            bbox,
            pixel_position,
            adjusted_pixel_position: None,
            field_position: None,
            team_id: None,
            speed_kmh: None,
            distance_m: None,
            has_ball: false,
        }
    }
}

/// Frame-ordered tracks for one video, grouped by object class.
///
/// All three class sequences have the same length (one entry per
/// frame); a track absent from a frame is simply missing from that
/// frame's map.
#[derive(Debug, Clone, Default)]
pub struct TrackCollection {
    players: Vec<HashMap<TrackId, TrackRecord>>,
    referees: Vec<HashMap<TrackId, TrackRecord>>,
    ball: Vec<HashMap<TrackId, TrackRecord>>,
}

impl TrackCollection {
    /// Create an empty collection spanning `num_frames` frames.
    pub fn new(num_frames: usize) -> Self {
        Self {
            players: vec![HashMap::new(); num_frames],
            referees: vec![HashMap::new(); num_frames],
            ball: vec![HashMap::new(); num_frames],
        }
    }

    /// Number of frames in the video.
    pub fn num_frames(&self) -> usize {
        self.players.len()
    }

    /// Insert a raw detection for `track_id` at `frame`.
    ///
    /// # Panics
    /// Panics if `frame` is out of range.
    pub fn insert(&mut self, class: TrackClass, frame: usize, track_id: TrackId, bbox: BBox) {
        self.class_mut(class)[frame].insert(track_id, TrackRecord::new(class, bbox));
    }

    /// Frame-ordered records for one class.
    pub fn class(&self, class: TrackClass) -> &[HashMap<TrackId, TrackRecord>] {
        match class {
            TrackClass::Player => &self.players,
            TrackClass::Referee => &self.referees,
            TrackClass::Ball => &self.ball,
        }
    }

    /// Mutable frame-ordered records for one class.
    pub fn class_mut(&mut self, class: TrackClass) -> &mut Vec<HashMap<TrackId, TrackRecord>> {
        match class {
            TrackClass::Player => &mut self.players,
            TrackClass::Referee => &mut self.referees,
            TrackClass::Ball => &mut self.ball,
        }
    }

    /// Players present at `frame`.
    pub fn players_at(&self, frame: usize) -> &HashMap<TrackId, TrackRecord> {
        &self.players[frame]
    }

    /// Ball bounding box at `frame`, if the ball was tracked there.
    ///
    /// The tracker keys the ball under a single id; any entry counts.
    pub fn ball_bbox_at(&self, frame: usize) -> Option<BBox> {
        self.ball[frame].values().next().map(|r| r.bbox)
    }

    /// Apply `f` to every record of every class, with its frame index.
    pub fn for_each_record_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(TrackClass, usize, TrackId, &mut TrackRecord),
    {
        for class in TrackClass::ALL {
            for (frame, records) in self.class_mut(class).iter_mut().enumerate() {
                for (&id, record) in records.iter_mut() {
                    f(class, frame, id, record);
                }
            }
        }
    }
}
