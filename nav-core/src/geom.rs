//! Orientation and intersection predicates.
//!
//! Every function here is a pure, deterministic function of its inputs and
//! never fails open: parallel lines yield `None`, degenerate triples yield
//! an exact zero sign.

use crate::math::Vec2;

/// Nudge distance used by callers that tolerate query points lying exactly
/// on a shared face boundary.
pub const EPSILON: f64 = 1e-9;

/// Signed double-area of the triangle `a -> b -> c`.
///
/// Positive when the triple turns counter-clockwise, negative when it turns
/// clockwise, exactly zero when collinear. This sign convention is the sole
/// way the mesh and search code reason about "which side" something lies on.
pub fn orient2d(a: Vec2, b: Vec2, c: Vec2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Intersection of the infinite lines through `a1-a2` and `b1-b2`.
///
/// Returns `None` when the lines are parallel or coincident.
pub fn line_intersection(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    let denom = (a1.x - a2.x) * (b1.y - b2.y) - (a1.y - a2.y) * (b1.x - b2.x);
    if denom == 0.0 {
        return None;
    }
    let a_cross = a1.x * a2.y - a1.y * a2.x;
    let b_cross = b1.x * b2.y - b1.y * b2.x;
    let x = (a_cross * (b1.x - b2.x) - (a1.x - a2.x) * b_cross) / denom;
    let y = (a_cross * (b1.y - b2.y) - (a1.y - a2.y) * b_cross) / denom;
    Some(Vec2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_signs() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 0.0);
        assert!(orient2d(a, b, Vec2::new(0.0, 1.0)) > 0.0);
        assert!(orient2d(a, b, Vec2::new(0.0, -1.0)) < 0.0);
        assert_eq!(orient2d(a, b, Vec2::new(7.0, 0.0)), 0.0);
    }

    #[test]
    fn orientation_is_antisymmetric() {
        let a = Vec2::new(2.0, 3.0);
        let b = Vec2::new(-1.0, 4.0);
        let c = Vec2::new(0.5, -2.0);
        assert_eq!(orient2d(a, b, c), -orient2d(b, a, c));
    }

    #[test]
    fn intersection_of_crossing_lines() {
        let p = line_intersection(
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(0.0, 1.0),
        )
        .unwrap();
        assert_eq!(p, Vec2::ZERO);
    }

    #[test]
    fn intersection_extends_beyond_segments() {
        // The lines intersect outside both input segments; the infinite-line
        // intersection is still returned.
        let p = line_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 1.0),
        )
        .unwrap();
        assert_eq!(p, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn parallel_lines_do_not_intersect() {
        assert!(line_intersection(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
        )
        .is_none());
    }
}
