//! Corner marking: flags vertices where a taut path may need to pivot.

use nav_core::orient2d;

use crate::mesh::NavMesh;

impl NavMesh {
    /// Mark every vertex that is reflex with respect to traversable space.
    ///
    /// For each boundary half-edge with no twin, the far side of the obstacle
    /// polygon meeting at the edge's target vertex is found by twin-and-next
    /// hops; the vertex is a corner exactly when the obstacle boundary turns
    /// away from the traversable side there. Must run after
    /// [`NavMesh::simplify`], since merging changes which vertices remain on
    /// navigable boundaries.
    pub fn mark_corners(&mut self) {
        for point in &mut self.points {
            point.corner = false;
        }

        for face in self.faces().collect::<Vec<_>>() {
            for edge in self.face_edges(face).collect::<Vec<_>>() {
                if self.twin(edge).is_some() {
                    continue;
                }
                let next = self.next(edge);
                let candidate = self.origin(next);
                // Hop around the obstacle at `candidate` to the far obstacle edge.
                let mut other = self.target(next);
                let mut around = self.twin(next);
                while let Some(e) = around {
                    let e = self.next(e);
                    other = self.target(e);
                    around = self.twin(e);
                }
                let a = self.position(self.origin(edge));
                let b = self.position(candidate);
                let c = self.position(other);
                if orient2d(a, b, c) < 0.0 {
                    self.points[candidate.index()].corner = true;
                }
            }
        }
    }
}
