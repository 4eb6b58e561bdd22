//! Mesh simplification: greedy convex face merging plus collinear cleanup.
//!
//! Search cost scales with the number of navmesh edges crossed, so the goal
//! is the smallest number of convex faces. Candidate merges are processed
//! largest-combined-area first from a max-heap; a per-face generation
//! counter lets stale heap entries be discarded on pop instead of being
//! eagerly removed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nav_core::orient2d;

use crate::mesh::{EdgeId, FaceId, NavMesh};

#[derive(Debug, Clone, Copy)]
struct MergeCandidate {
    area: f64,
    face: FaceId,
    edge: EdgeId,
    generation: u32,
    tie: u64,
}

impl PartialEq for MergeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCandidate {}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Largest combined area first; earlier pushes win ties.
        self.area
            .total_cmp(&other.area)
            .then_with(|| other.tie.cmp(&self.tie))
    }
}

impl NavMesh {
    /// Merge adjacent convex faces into maximal convex polygons and remove
    /// the redundant collinear boundary vertices merging leaves behind.
    ///
    /// Mutates in place and is idempotent: re-running on an already
    /// simplified mesh performs no merges. Must complete before any search
    /// query runs.
    pub fn simplify(&mut self) {
        self.merge_all_faces();
        self.merge_collinear_edges();
    }

    fn merge_all_faces(&mut self) {
        let mut heap: BinaryHeap<MergeCandidate> = BinaryHeap::new();
        let mut tie = 0u64;

        for face in self.faces().collect::<Vec<_>>() {
            if self.is_navigable(face) {
                self.push_candidate(&mut heap, &mut tie, face);
            }
        }

        while let Some(top) = heap.pop() {
            let rec = self.faces[top.face.index()];
            if !rec.alive || rec.generation != top.generation {
                continue;
            }
            if merge_faces(self, top.face, top.edge).is_none() {
                continue;
            }

            // The merge changed the survivor's boundary: re-score it and
            // every face now adjacent to it.
            let edges: Vec<EdgeId> = self.face_edges(top.face).collect();
            let n = edges.len();
            for i in 0..n {
                let other_now = self.twin(edges[(i + 1) % n]).map(|t| self.edge_face(t));
                let other_prev = self.twin(edges[i]).map(|t| self.edge_face(t));
                if other_now != other_prev {
                    if let Some(neighbor) = other_now {
                        self.push_candidate(&mut heap, &mut tie, neighbor);
                    }
                }
            }
            self.push_candidate(&mut heap, &mut tie, top.face);
        }
    }

    /// Re-score `face` and queue its best available merge, invalidating any
    /// older queue entries by bumping the face's generation.
    fn push_candidate(
        &mut self,
        heap: &mut BinaryHeap<MergeCandidate>,
        tie: &mut u64,
        face: FaceId,
    ) {
        let generation = {
            let rec = &mut self.faces[face.index()];
            rec.generation += 1;
            rec.generation
        };
        if let Some((area, edge)) = best_merge(self, face) {
            heap.push(MergeCandidate {
                area,
                face,
                edge,
                generation,
                tie: *tie,
            });
            *tie += 1;
        }
    }

    /// Re-link around boundary vertices whose two incident edges are
    /// collinear and border the same neighbor, re-twinning across the
    /// removed vertex when the opposite side drops it too.
    fn merge_collinear_edges(&mut self) {
        for face in self.faces().collect::<Vec<_>>() {
            loop {
                let mut merged = false;
                for e1 in self.face_edges(face).collect::<Vec<_>>() {
                    let e2 = self.next(e1);
                    let e3 = self.next(e2);
                    let t1 = self.twin(e1);
                    let t2 = self.twin(e2);
                    let share_neighbor = match (t1, t2) {
                        (None, None) => true,
                        (Some(a), Some(b)) => self.edge_face(a) == self.edge_face(b),
                        _ => false,
                    };
                    if !share_neighbor {
                        continue;
                    }
                    let p1 = self.position(self.origin(e1));
                    let p2 = self.position(self.origin(e2));
                    let p3 = self.position(self.origin(e3));
                    if orient2d(p1, p2, p3) != 0.0 {
                        continue;
                    }

                    // Drop the middle vertex on our side.
                    self.edges[e1.index()].next = e3;
                    self.faces[face.index()].root = e1;
                    if let Some(their_e3) = t2 {
                        // Drop it on the neighbor's side and re-twin.
                        let their_skip = self.next(self.next(their_e3));
                        self.edges[their_e3.index()].next = their_skip;
                        let their_face = self.edge_face(their_e3);
                        self.faces[their_face.index()].root = their_e3;
                        self.edges[e1.index()].twin = Some(their_e3);
                        self.edges[their_e3.index()].twin = Some(e1);
                    }
                    merged = true;
                    break;
                }
                if !merged {
                    break;
                }
            }
        }
    }
}

/// Best single merge available to `face`: the boundary edge whose merge
/// yields the largest combined area while keeping both seam corners convex.
fn best_merge(mesh: &NavMesh, face: FaceId) -> Option<(f64, EdgeId)> {
    let current_area = mesh.face_area(face);
    let edges: Vec<EdgeId> = mesh.face_edges(face).collect();
    let n = edges.len();
    let mut best: Option<(f64, EdgeId)> = None;

    for i in 0..n {
        let candidate = edges[(i + 1) % n];
        // Only consider the first edge of each shared chain.
        let other_now = mesh.twin(candidate).map(|t| mesh.edge_face(t));
        let other_prev = mesh.twin(edges[i]).map(|t| mesh.edge_face(t));
        if other_now == other_prev || !can_merge(mesh, candidate) {
            continue;
        }
        let Some(neighbor) = other_now else {
            continue;
        };
        let area = current_area + mesh.face_area(neighbor);
        if best.is_none_or(|(best_area, _)| area > best_area) {
            best = Some((area, candidate));
        }
    }
    best
}

fn find_prev(mesh: &NavMesh, edge: EdgeId) -> EdgeId {
    let mut cur = edge;
    while mesh.next(cur) != edge {
        cur = mesh.next(cur);
    }
    cur
}

/// The span of the shared edge chain starting at `a`: returns `(b, their_b)`
/// where the chain runs from `a` up to (not including) `b` on our side and
/// `their_b` is the neighbor's half-edge opposite the chain's last edge.
fn merge_span(mesh: &NavMesh, a: EdgeId, a_twin: EdgeId) -> (EdgeId, EdgeId) {
    let mut b = mesh.next(a);
    let mut their_b = a_twin;
    while let Some(bt) = mesh.twin(b) {
        if mesh.edge_face(bt) != mesh.edge_face(a_twin) {
            break;
        }
        their_b = bt;
        b = mesh.next(b);
    }
    (b, their_b)
}

/// Whether merging `face` with its neighbor across `a` keeps both seam
/// corners convex, checked by orientation at the four adjacent vertices.
fn can_merge(mesh: &NavMesh, a: EdgeId) -> bool {
    let Some(a_twin) = mesh.twin(a) else {
        return false;
    };
    let (b, their_b) = merge_span(mesh, a, a_twin);
    let their_a = mesh.next(a_twin);

    let our_a_adj = find_prev(mesh, a);
    let our_b_adj = mesh.next(b);
    let their_a_adj = mesh.next(their_a);
    let their_b_adj = find_prev(mesh, their_b);

    let pos = |e: EdgeId| mesh.position(mesh.origin(e));
    orient2d(pos(their_b_adj), pos(b), pos(our_b_adj)) >= 0.0
        && orient2d(pos(our_a_adj), pos(a), pos(their_a_adj)) >= 0.0
}

/// Splice the neighbor across `a` into `face`, retiring the absorbed face.
/// Returns the removed face, or `None` when the merge would break convexity.
fn merge_faces(mesh: &mut NavMesh, face: FaceId, a: EdgeId) -> Option<FaceId> {
    if !can_merge(mesh, a) {
        return None;
    }
    let a_twin = mesh.twin(a)?;
    let (b, their_b) = merge_span(mesh, a, a_twin);
    let their_a = mesh.next(a_twin);
    let removed = mesh.edge_face(their_b);

    // `a` takes over the neighbor's edge after the seam.
    mesh.edges[a.index()].next = mesh.next(their_a);
    mesh.edges[a.index()].twin = mesh.twin(their_a);
    if let Some(t) = mesh.twin(a) {
        mesh.edges[t.index()].twin = Some(a);
    }
    // The neighbor's seam end takes over our edge after the seam.
    mesh.edges[their_b.index()].next = mesh.next(b);
    mesh.edges[their_b.index()].twin = mesh.twin(b);
    if let Some(t) = mesh.twin(their_b) {
        mesh.edges[t.index()].twin = Some(their_b);
    }

    // Absorbed edges now belong to `face`.
    let stop = mesh.next(b);
    let mut cur = mesh.next(a);
    while cur != stop {
        mesh.edges[cur.index()].face = face;
        cur = mesh.next(cur);
    }

    // The old root may be one of the retired seam edges.
    mesh.faces[face.index()].root = a;
    mesh.faces[removed.index()].alive = false;

    Some(removed)
}
