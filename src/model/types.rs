use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A position or offset in canvas space.
///
/// Serialized as a two-element `[x, y]` array so saved projects stay readable
/// by hosts that store points the same way.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

entity_id!(
    /// Identity of an exploratory-cycle node.
    NodeId
);
entity_id!(
    /// Identity of a milestone.
    MilestoneId
);
entity_id!(
    /// Identity of a directed connection between two nodes.
    ConnectionId
);
entity_id!(CycleId);
entity_id!(ProjectId);

/// Curriculum phase a milestone belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Engage,
    Investigate,
    Act,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Engage, Phase::Investigate, Phase::Act];

    /// Raw label, as written in saved projects and tabular exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Engage => "Engage",
            Phase::Investigate => "Investigate",
            Phase::Act => "Act",
        }
    }

    /// Look up a phase by its exact raw label.
    pub fn from_label(label: &str) -> Option<Phase> {
        Phase::ALL.into_iter().find(|p| p.as_str() == label)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Phase::Engage => "Define the problem and start exploring",
            Phase::Investigate => "In-depth research and learning",
            Phase::Act => "Execute and produce deliverables",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four compass points a connection attaches to on a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorDirection {
    Top,
    Bottom,
    Left,
    Right,
}

impl AnchorDirection {
    pub const ALL: [AnchorDirection; 4] = [
        AnchorDirection::Top,
        AnchorDirection::Bottom,
        AnchorDirection::Left,
        AnchorDirection::Right,
    ];

    /// Offset from a node center to this anchor, `distance` units out.
    pub fn offset(&self, distance: f64) -> Point {
        match self {
            AnchorDirection::Top => Point::new(0.0, -distance),
            AnchorDirection::Bottom => Point::new(0.0, distance),
            AnchorDirection::Left => Point::new(-distance, 0.0),
            AnchorDirection::Right => Point::new(distance, 0.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorDirection::Top => "top",
            AnchorDirection::Bottom => "bottom",
            AnchorDirection::Left => "left",
            AnchorDirection::Right => "right",
        }
    }
}
