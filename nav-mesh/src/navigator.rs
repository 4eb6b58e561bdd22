use nav_core::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A shortest taut path: turn points from source to destination, every
/// consecutive pair mutually visible, plus the total Euclidean length.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavPath {
    pub points: Vec<Vec2>,
    pub distance: f64,
}

impl NavPath {
    pub fn new(points: Vec<Vec2>, distance: f64) -> Self {
        Self { points, distance }
    }
}

/// Backend-agnostic path query seam.
pub trait Navigator {
    /// Shortest obstacle-respecting path, or `None` when the goal is
    /// unreachable from the start.
    fn find_path(&self, start: Vec2, goal: Vec2) -> Option<NavPath>;
}
