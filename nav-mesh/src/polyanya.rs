//! Any-angle shortest paths by interval propagation (the Polyanya family).
//!
//! The unit of work is a taut interval on a face boundary edge together
//! with an apex from which the whole interval is visible. Expanding a node
//! projects its interval through the neighboring face onto that face's
//! other edges, optionally pivoting around reflex corners. The search is
//! best-first over an admissible estimate, so the first completed path can
//! only be displaced by a strictly shorter one.

use core::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap};

use nav_core::{line_intersection, orient2d, Vec2, VertexKey};

use crate::mesh::{EdgeId, FaceId, NavMesh, PointId};
use crate::navigator::{NavPath, Navigator};

/// Safety valve against pathological meshes; exceeding it degrades to "best
/// path found so far" rather than failing.
const MAX_ITERATIONS: usize = 500_000;

/// Optional query bounds for [`NavMesh::shortest_path_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Prune any route longer than this; `None` searches unbounded.
    pub max_distance: Option<f64>,
    /// Require the goal to classify inside or on a face exactly, instead of
    /// accepting the epsilon-nudged classification used for the start.
    pub strict_goal: bool,
}

/// An interval endpoint. Mesh vertices carry their corner flag; points cut
/// by ray clipping are interior and never corners.
#[derive(Debug, Clone, Copy)]
struct IntervalPoint {
    p: Vec2,
    corner: bool,
}

impl IntervalPoint {
    fn interior(p: Vec2) -> Self {
        Self { p, corner: false }
    }
}

fn interval_point(mesh: &NavMesh, point: PointId) -> IntervalPoint {
    IntervalPoint {
        p: mesh.position(point),
        corner: mesh.is_corner(point),
    }
}

/// Frontier node: a taut interval `[start, end]` on `edge`, visible from
/// `root`, reached at cost `g`. Immutable once constructed.
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    start: IntervalPoint,
    end: IntervalPoint,
    edge: EdgeId,
    root: Vec2,
    g: f64,
    /// `g` plus the admissible remaining estimate; fixed at construction.
    f: f64,
    prev: Option<usize>,
    /// Corner the path bends around between the previous root and `root`.
    via: Option<Vec2>,
}

/// Admissible estimate of the remaining distance from `root` through the
/// interval to `dst`.
///
/// Collinear intervals degenerate to "reach the nearer endpoint, then go
/// straight". Otherwise the estimate is the direct distance, raised to the
/// detour through an interval corner whenever the straight line to `dst`
/// would pass that corner on the wrong side: the path provably must round
/// it, so the larger value still never overestimates.
fn estimate(root: Vec2, start: IntervalPoint, end: IntervalPoint, dst: Vec2) -> f64 {
    if orient2d(root, start.p, end.p) == 0.0 {
        let closer = if root.distance(start.p) < root.distance(end.p) {
            start.p
        } else {
            end.p
        };
        return root.distance(closer) + closer.distance(dst);
    }
    let mut h = root.distance(dst);
    if start.corner && orient2d(root, start.p, dst) <= 0.0 {
        h = h.max(root.distance(start.p) + start.p.distance(dst));
    }
    if end.corner && orient2d(root, end.p, dst) >= 0.0 {
        h = h.max(root.distance(end.p) + end.p.distance(dst));
    }
    h
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    f: f64,
    node: usize,
    tie: u64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap behave like a min-heap.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.tie.cmp(&self.tie))
    }
}

/// How a successor was produced. The case split is explicit so each branch
/// of the propagation rules can be exercised in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SuccessorKind {
    /// The current root still sees the clipped sub-interval directly.
    Direct,
    /// The path pivots around the interval's start corner.
    RoundStart,
    /// The path pivots around the interval's end corner.
    RoundEnd,
    /// The candidate edge is collinear with the root; propagation continues
    /// through the endpoint shared with the interval's line.
    Collinear,
    /// The node's own root lies on its interval line.
    Degenerate,
}

#[derive(Debug, Clone, Copy)]
struct Successor {
    kind: SuccessorKind,
    start: IntervalPoint,
    end: IntervalPoint,
    edge: EdgeId,
    root: Vec2,
    g: f64,
    via: Option<Vec2>,
}

/// Which side of the ray `root -> pivot` survives a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Ccw,
    Cw,
}

/// Clip the edge `a-b` to its sub-segment lying past the ray `root -> pivot`
/// on the given side, or `None` when nothing of the edge is past it.
///
/// Endpoints introduced by the cut are interior points, never corners.
fn clip_past_ray(
    root: Vec2,
    pivot: Vec2,
    a: IntervalPoint,
    b: IntervalPoint,
    side: Side,
) -> Option<(IntervalPoint, IntervalPoint)> {
    let sa = orient2d(root, pivot, a.p);
    let sb = orient2d(root, pivot, b.p);
    // When the root is not CCW-oriented toward the edge, the edge is kept or
    // dropped whole.
    if orient2d(root, a.p, b.p) <= 0.0 {
        return match side {
            Side::Ccw if sa > 0.0 && sb >= 0.0 => Some((a, b)),
            Side::Cw if sb < 0.0 && sa <= 0.0 => Some((a, b)),
            _ => None,
        };
    }
    match side {
        Side::Ccw => {
            if sb > 0.0 && sa >= 0.0 {
                return Some((a, b));
            }
            if sb > 0.0 && sa < 0.0 {
                let cut = line_intersection(root, pivot, a.p, b.p)?;
                return Some((IntervalPoint::interior(cut), b));
            }
            if sb == 0.0 && sa < 0.0 {
                return Some((b, b));
            }
            None
        }
        Side::Cw => {
            if sa < 0.0 && sb <= 0.0 {
                return Some((a, b));
            }
            if sa < 0.0 && sb > 0.0 {
                let cut = line_intersection(root, pivot, a.p, b.p)?;
                return Some((a, IntervalPoint::interior(cut)));
            }
            if sa == 0.0 && sb > 0.0 {
                return Some((a, a));
            }
            None
        }
    }
}

struct Search<'m> {
    mesh: &'m NavMesh,
    dst: Vec2,
    dst_face: FaceId,
    max_distance: Option<f64>,
    nodes: Vec<SearchNode>,
    open: BinaryHeap<OpenNode>,
    /// Lowest `g` seen per root vertex; dominated nodes are skipped lazily
    /// on pop instead of being deleted from the heap.
    root_g: HashMap<VertexKey, f64>,
    best: Option<NavPath>,
    tie: u64,
}

impl Search<'_> {
    fn make_node(&self, prev: Option<usize>, s: Successor) -> SearchNode {
        SearchNode {
            start: s.start,
            end: s.end,
            edge: s.edge,
            root: s.root,
            g: s.g,
            f: s.g + estimate(s.root, s.start, s.end, self.dst),
            prev,
            via: s.via,
        }
    }

    /// A node is worth keeping only if its edge can be expanded further and
    /// it is not already past the distance bound.
    fn viable(&self, node: &SearchNode) -> bool {
        self.mesh.twin(node.edge).is_some() && !self.max_distance.is_some_and(|m| node.f > m)
    }

    /// Store a node in the arena without queueing it. Returns its index.
    fn admit(&mut self, prev: Option<usize>, s: Successor) -> Option<usize> {
        let node = self.make_node(prev, s);
        if !self.viable(&node) {
            return None;
        }
        self.nodes.push(node);
        Some(self.nodes.len() - 1)
    }

    fn enqueue(&mut self, index: usize) {
        self.open.push(OpenNode {
            f: self.nodes[index].f,
            node: index,
            tie: self.tie,
        });
        self.tie += 1;
    }

    fn run(&mut self) {
        let mut iterations = 0usize;
        let mut pending: Option<usize> = None;
        let mut successors: Vec<Successor> = Vec::new();

        loop {
            let index = match pending.take() {
                Some(index) => index,
                None => match self.open.pop() {
                    Some(open) => open.node,
                    None => break,
                },
            };
            if iterations == MAX_ITERATIONS {
                tracing::warn!(
                    iterations,
                    "iteration cap reached, returning best path found so far"
                );
                break;
            }
            iterations += 1;
            let node = self.nodes[index];

            // Root dominance: only the cheapest way to reuse an apex needs
            // further exploration.
            match self.root_g.entry(node.root.key()) {
                Entry::Occupied(mut entry) => {
                    if node.g > *entry.get() {
                        continue;
                    }
                    entry.insert(node.g);
                }
                Entry::Vacant(entry) => {
                    entry.insert(node.g);
                }
            }
            if self.best.as_ref().is_some_and(|b| node.f >= b.distance) {
                continue;
            }
            if self.max_distance.is_some_and(|m| node.f > m) {
                continue;
            }

            let twin = match self.mesh.twin(node.edge) {
                Some(twin) => twin,
                None => continue,
            };
            if self.mesh.edge_face(twin) == self.dst_face {
                self.close_path(index, &node);
                continue;
            }

            successors.clear();
            self.expand(&node, &mut successors);
            if successors.len() == 1 {
                // No ordering decision to make: continue straight into the
                // lone successor without a heap round-trip.
                pending = self.admit(Some(index), successors[0]);
            } else {
                for &s in &successors {
                    if let Some(i) = self.admit(Some(index), s) {
                        self.enqueue(i);
                    }
                }
            }
        }
    }

    /// The node's far face is the goal face: try to finish the path, either
    /// straight from the root or pivoting once around an interval corner,
    /// and keep it if it beats the best complete path so far.
    fn close_path(&mut self, index: usize, node: &SearchNode) {
        let start_sign = orient2d(node.root, node.start.p, self.dst);
        let end_sign = orient2d(node.root, node.end.p, self.dst);

        let mut close: Option<(f64, Option<Vec2>)> = None;
        if start_sign >= 0.0 && end_sign <= 0.0 {
            close = Some((node.g + node.root.distance(self.dst), None));
        }
        if node.end.corner && end_sign > 0.0 {
            let cost =
                node.g + node.root.distance(node.end.p) + node.end.p.distance(self.dst);
            if close.is_none_or(|(c, _)| cost < c) {
                close = Some((cost, Some(node.end.p)));
            }
        }
        if node.start.corner && start_sign < 0.0 {
            let cost =
                node.g + node.root.distance(node.start.p) + node.start.p.distance(self.dst);
            if close.is_none_or(|(c, _)| cost < c) {
                close = Some((cost, Some(node.start.p)));
            }
        }

        let Some((distance, corner)) = close else {
            return;
        };
        if self.max_distance.is_some_and(|m| distance > m) {
            return;
        }
        if self.best.as_ref().is_some_and(|b| distance >= b.distance) {
            return;
        }

        // Walk the parent chain backwards, recording each new apex and any
        // corner bent around between apexes, then flip into path order.
        let mut points = vec![self.dst];
        if let Some(corner) = corner {
            points.push(corner);
        }
        let mut cur = Some(index);
        while let Some(i) = cur {
            let n = &self.nodes[i];
            if points.last().copied() != Some(n.root) {
                points.push(n.root);
            }
            if let Some(via) = n.via {
                points.push(via);
            }
            cur = n.prev;
        }
        points.reverse();
        self.best = Some(NavPath::new(points, distance));
    }

    /// Project `node`'s interval through the far face onto each of its other
    /// edges, producing up to three successors per edge.
    fn expand(&self, node: &SearchNode, out: &mut Vec<Successor>) {
        let mesh = self.mesh;
        let twin = match mesh.twin(node.edge) {
            Some(twin) => twin,
            None => return,
        };
        let face = mesh.edge_face(twin);
        let degenerate = orient2d(node.root, node.start.p, node.end.p) == 0.0;

        for edge in mesh.face_edges(face) {
            // The twin is the interval's own edge; nothing to project there.
            if mesh.twin(edge) == Some(node.edge) {
                continue;
            }
            let a = interval_point(mesh, mesh.origin(edge));
            let b = interval_point(mesh, mesh.target(edge));

            if degenerate {
                self.expand_degenerate(node, edge, a, b, out);
                continue;
            }

            if orient2d(node.root, a.p, b.p) == 0.0 {
                // Candidate edge collinear with the root: keep sliding along
                // whichever endpoint continues the interval's line.
                if orient2d(node.start.p, a.p, b.p) == 0.0 {
                    out.push(Successor {
                        kind: SuccessorKind::Collinear,
                        start: a,
                        end: a,
                        edge,
                        root: a.p,
                        g: node.g + node.root.distance(a.p),
                        via: None,
                    });
                } else if orient2d(node.end.p, a.p, b.p) == 0.0 {
                    out.push(Successor {
                        kind: SuccessorKind::Collinear,
                        start: b,
                        end: b,
                        edge,
                        root: b.p,
                        g: node.g + node.root.distance(b.p),
                        via: None,
                    });
                }
                continue;
            }

            // Rounding past the end corner (counter-clockwise of the cone).
            if node.end.corner
                && (orient2d(node.root, node.end.p, a.p) > 0.0
                    || orient2d(node.root, node.end.p, b.p) > 0.0)
            {
                if let Some((ca, cb)) = clip_past_ray(node.root, node.end.p, a, b, Side::Ccw) {
                    // If the clipped edge continues the pivot line, the taut
                    // path runs through to its far vertex.
                    let root = if orient2d(node.end.p, ca.p, cb.p) == 0.0 {
                        cb.p
                    } else {
                        node.end.p
                    };
                    let g = node.g + node.root.distance(node.end.p) + node.end.p.distance(root);
                    let via = (root.key() != node.end.p.key()).then_some(node.end.p);
                    out.push(Successor {
                        kind: SuccessorKind::RoundEnd,
                        start: ca,
                        end: cb,
                        edge,
                        root,
                        g,
                        via,
                    });
                }
            }
            // Rounding past the start corner (clockwise of the cone).
            if node.start.corner
                && (orient2d(node.root, node.start.p, a.p) < 0.0
                    || orient2d(node.root, node.start.p, b.p) < 0.0)
            {
                if let Some((ca, cb)) = clip_past_ray(node.root, node.start.p, a, b, Side::Cw) {
                    let root = if orient2d(node.start.p, ca.p, cb.p) == 0.0 {
                        ca.p
                    } else {
                        node.start.p
                    };
                    let g =
                        node.g + node.root.distance(node.start.p) + node.start.p.distance(root);
                    let via = (root.key() != node.start.p.key()).then_some(node.start.p);
                    out.push(Successor {
                        kind: SuccessorKind::RoundStart,
                        start: ca,
                        end: cb,
                        edge,
                        root,
                        g,
                        via,
                    });
                }
            }

            // Direct continuation: the sub-interval of the candidate edge
            // visible from the root through the current interval.
            let from_start = clip_past_ray(node.root, node.start.p, a, b, Side::Ccw);
            let from_end = clip_past_ray(node.root, node.end.p, a, b, Side::Cw);
            if let (Some((start, _)), Some((_, end))) = (from_start, from_end) {
                out.push(Successor {
                    kind: SuccessorKind::Direct,
                    start,
                    end,
                    edge,
                    root: node.root,
                    g: node.g,
                    via: None,
                });
            }
        }
    }

    /// Successors of a node whose root lies on its own interval line.
    fn expand_degenerate(
        &self,
        node: &SearchNode,
        edge: EdgeId,
        a: IntervalPoint,
        b: IntervalPoint,
        out: &mut Vec<Successor>,
    ) {
        if orient2d(node.root, a.p, b.p) == 0.0 {
            // Still collinear: slide to the nearer vertex of the candidate
            // edge, which only matters if it is a corner.
            let near = if node.root.distance(a.p) < node.root.distance(b.p) {
                a
            } else {
                b
            };
            if near.corner {
                out.push(Successor {
                    kind: SuccessorKind::Degenerate,
                    start: a,
                    end: b,
                    edge,
                    root: near.p,
                    g: node.g + node.root.distance(near.p),
                    via: None,
                });
            }
            return;
        }

        // The candidate edge opens the cone back up. The root carries over
        // when it lies on the interval itself; a root beyond an endpoint
        // re-roots at that endpoint (a corner) and pays the along-line
        // detour.
        let on_endpoint =
            node.root.key() == node.start.p.key() || node.root.key() == node.end.p.key();
        let (root, g) = if on_endpoint {
            (Some(node.root), node.g)
        } else {
            let dir = node.end.p - node.start.p;
            let along = (node.root - node.start.p).dot(dir);
            if dir.length_squared() > 0.0 && along >= 0.0 && along <= dir.length_squared() {
                (Some(node.root), node.g)
            } else {
                let near = if node.root.distance(node.start.p) <= node.root.distance(node.end.p)
                {
                    node.start
                } else {
                    node.end
                };
                if near.corner {
                    (Some(near.p), node.g + node.root.distance(near.p))
                } else {
                    (None, node.g)
                }
            }
        };
        if let Some(root) = root {
            out.push(Successor {
                kind: SuccessorKind::Degenerate,
                start: a,
                end: b,
                edge,
                root,
                g,
                via: None,
            });
        }
    }
}

impl NavMesh {
    /// Shortest taut path from `src` to `dst`, or `None` when either point
    /// is outside every navigable face or no route exists.
    ///
    /// The mesh must be simplified, corner-marked, and valid. Queries are
    /// read-only and deterministic: the same mesh and endpoints always
    /// yield the same path.
    pub fn shortest_path(&self, src: Vec2, dst: Vec2) -> Option<NavPath> {
        self.shortest_path_with(src, dst, QueryOptions::default())
    }

    /// [`NavMesh::shortest_path`] with a distance bound and goal strictness.
    pub fn shortest_path_with(
        &self,
        src: Vec2,
        dst: Vec2,
        options: QueryOptions,
    ) -> Option<NavPath> {
        let src_face = self.find_face(src)?;
        let dst_face = if options.strict_goal {
            self.find_face_strict(dst)?
        } else {
            self.find_face(dst)?
        };

        // Within one convex face the straight segment is the answer.
        if src_face == dst_face {
            let distance = src.distance(dst);
            if options.max_distance.is_some_and(|m| distance > m) {
                return None;
            }
            return Some(NavPath::new(vec![src, dst], distance));
        }

        let mut search = Search {
            mesh: self,
            dst,
            dst_face,
            max_distance: options.max_distance,
            nodes: Vec::new(),
            open: BinaryHeap::new(),
            root_g: HashMap::new(),
            best: None,
            tie: 0,
        };

        // One node per expandable boundary edge of the start face.
        for edge in self.face_edges(src_face) {
            let seed = Successor {
                kind: SuccessorKind::Direct,
                start: interval_point(self, self.origin(edge)),
                end: interval_point(self, self.target(edge)),
                edge,
                root: src,
                g: 0.0,
                via: None,
            };
            if let Some(i) = search.admit(None, seed) {
                search.enqueue(i);
            }
        }

        search.run();
        search.best
    }
}

impl Navigator for NavMesh {
    fn find_path(&self, start: Vec2, goal: Vec2) -> Option<NavPath> {
        self.shortest_path(start, goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_node(mesh: &NavMesh, edge: EdgeId, root: Vec2) -> SearchNode {
        let start = interval_point(mesh, mesh.origin(edge));
        let end = interval_point(mesh, mesh.target(edge));
        SearchNode {
            start,
            end,
            edge,
            root,
            g: 0.0,
            f: 0.0,
            prev: None,
            via: None,
        }
    }

    fn search_for<'m>(mesh: &'m NavMesh, dst: Vec2, dst_face: FaceId) -> Search<'m> {
        Search {
            mesh,
            dst,
            dst_face,
            max_distance: None,
            nodes: Vec::new(),
            open: BinaryHeap::new(),
            root_g: HashMap::new(),
            best: None,
            tie: 0,
        }
    }

    fn shared_edge(mesh: &NavMesh, face: FaceId) -> EdgeId {
        mesh.face_edges(face)
            .find(|&e| mesh.twin(e).is_some())
            .expect("twinned edge")
    }

    #[test]
    fn fully_visible_edges_yield_direct_successors() {
        let mesh = NavMesh::from_grid(&[".."]);
        let face = mesh.faces().next().unwrap();
        let edge = shared_edge(&mesh, face);
        let node = seed_node(&mesh, edge, Vec2::new(0.5, 0.5));

        let search = search_for(&mesh, Vec2::new(10.0, 10.0), FaceId(u32::MAX));
        let mut out = Vec::new();
        search.expand(&node, &mut out);

        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|s| s.kind == SuccessorKind::Direct));
        // The root never changes on a direct continuation.
        assert!(out.iter().all(|s| s.root == node.root && s.g == 0.0));
    }

    #[test]
    fn reflex_corner_produces_rounding_successor() {
        // L-shaped free space with its reflex corner at (1, 1).
        let mut mesh = NavMesh::from_grid(&[".#", ".."]);
        mesh.simplify();
        mesh.mark_corners();

        // Expand from the tall left face across the shared edge.
        let face = mesh
            .faces()
            .find(|&f| mesh.face_area(f) == 2.0)
            .expect("left face");
        let edge = shared_edge(&mesh, face);
        let node = seed_node(&mesh, edge, Vec2::new(0.5, 0.5));

        let search = search_for(&mesh, Vec2::new(10.0, 10.0), FaceId(u32::MAX));
        let mut out = Vec::new();
        search.expand(&node, &mut out);

        assert!(out.iter().any(|s| s.kind == SuccessorKind::RoundStart
            || s.kind == SuccessorKind::RoundEnd));
        // Every rounding successor pivots exactly at the marked corner.
        for s in out {
            match s.kind {
                SuccessorKind::RoundStart | SuccessorKind::RoundEnd => {
                    assert!(s.g > 0.0);
                }
                SuccessorKind::Direct => assert_eq!(s.g, 0.0),
                _ => {}
            }
        }
    }

    #[test]
    fn degenerate_root_keeps_propagating() {
        let mesh = NavMesh::from_grid(&[".."]);
        let face = mesh.faces().next().unwrap();
        let edge = shared_edge(&mesh, face);
        // Root exactly on the interval: the degenerate branch must fire and
        // carry the root through unchanged.
        let root = mesh.position(mesh.origin(edge));
        let node = seed_node(&mesh, edge, root);

        let search = search_for(&mesh, Vec2::new(10.0, 10.0), FaceId(u32::MAX));
        let mut out = Vec::new();
        search.expand(&node, &mut out);

        assert!(!out.is_empty());
        assert!(out.iter().all(|s| s.kind == SuccessorKind::Degenerate));
        assert!(out.iter().any(|s| s.root == root && s.g == 0.0));
    }

    #[test]
    fn estimate_is_at_least_the_straight_line() {
        let start = IntervalPoint {
            p: Vec2::new(1.0, 0.0),
            corner: true,
        };
        let end = IntervalPoint {
            p: Vec2::new(1.0, 1.0),
            corner: false,
        };
        let root = Vec2::new(0.0, 0.5);
        let dst = Vec2::new(3.0, -2.0);
        let h = estimate(root, start, end, dst);
        assert!(h >= root.distance(dst));
        // The straight line passes the start corner on its wrong side, so
        // the estimate must include the detour.
        assert_eq!(h, root.distance(start.p) + start.p.distance(dst));
    }

    #[test]
    fn collinear_interval_estimate_goes_through_nearer_endpoint() {
        let start = IntervalPoint {
            p: Vec2::new(1.0, 0.0),
            corner: false,
        };
        let end = IntervalPoint {
            p: Vec2::new(2.0, 0.0),
            corner: false,
        };
        let root = Vec2::ZERO;
        let dst = Vec2::new(5.0, 0.0);
        assert_eq!(estimate(root, start, end, dst), 5.0);
    }
}
