//! Structural sanity checks run between mesh preparation and search.

use thiserror::Error;

use crate::mesh::{FaceId, NavMesh};

/// Cap on boundary-cycle length; a cycle that does not close within this
/// many edges is treated as broken rather than walked forever.
pub const MAX_BOUNDARY_EDGES: usize = 10_000;

/// A precondition violation by mesh construction or simplification.
///
/// These are unrecoverable: the mesh must be rebuilt, not repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("boundary cycle of face {0:?} did not close within {MAX_BOUNDARY_EDGES} edges")]
    OpenBoundary(FaceId),
    #[error("asymmetric twin link on the boundary of face {0:?}")]
    AsymmetricTwin(FaceId),
}

impl MeshError {
    /// The offending face.
    pub fn face(&self) -> FaceId {
        match *self {
            MeshError::OpenBoundary(face) | MeshError::AsymmetricTwin(face) => face,
        }
    }
}

impl NavMesh {
    /// Check every live face for a non-closing `next` chain or a stale twin
    /// link, failing fast on the first offender.
    pub fn validate(&self) -> Result<(), MeshError> {
        for face in self.faces() {
            let root = self.face_root(face);
            let mut edge = root;
            let mut steps = 0usize;
            loop {
                steps += 1;
                if steps > MAX_BOUNDARY_EDGES {
                    return Err(MeshError::OpenBoundary(face));
                }
                if let Some(twin) = self.twin(edge) {
                    if self.twin(twin) != Some(edge) {
                        return Err(MeshError::AsymmetricTwin(face));
                    }
                }
                edge = self.next(edge);
                if edge == root {
                    break;
                }
            }
        }
        Ok(())
    }

    /// First structurally invalid face, or `None` when the mesh is sound.
    pub fn find_bad_face(&self) -> Option<FaceId> {
        self.validate().err().map(|e| e.face())
    }
}

#[cfg(test)]
mod tests {
    use nav_core::Vec2;

    use super::*;
    use crate::mesh::EdgeId;

    fn quad_strip() -> NavMesh {
        NavMesh::from_grid(&["..."])
    }

    #[test]
    fn well_formed_mesh_validates() {
        let mesh = quad_strip();
        assert_eq!(mesh.validate(), Ok(()));
        assert_eq!(mesh.find_bad_face(), None);
    }

    #[test]
    fn asymmetric_twin_is_detected() {
        let mut mesh = quad_strip();
        // Redirect one twin link so twin(twin(e)) != e.
        let bad = mesh
            .faces()
            .flat_map(|f| mesh.face_edges(f).collect::<Vec<_>>())
            .find(|&e| mesh.twin(e).is_some())
            .unwrap();
        let twin = mesh.twin(bad).unwrap();
        let unrelated = (0..mesh.edges.len() as u32)
            .map(EdgeId)
            .find(|&e| e != bad && mesh.twin(e).is_none())
            .unwrap();
        mesh.edges[twin.index()].twin = Some(unrelated);

        let err = mesh.validate().unwrap_err();
        assert!(matches!(err, MeshError::AsymmetricTwin(_)));
        assert_eq!(mesh.find_bad_face(), Some(err.face()));
    }

    #[test]
    fn open_boundary_cycle_is_detected() {
        let mut mesh = NavMesh::from_polygons(&[vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
        ]]);
        // Break the cycle: make an edge its own successor.
        let root = mesh.face_root(crate::mesh::FaceId(0));
        let second = mesh.next(root);
        mesh.edges[second.index()].next = second;

        assert_eq!(
            mesh.validate(),
            Err(MeshError::OpenBoundary(crate::mesh::FaceId(0)))
        );
    }
}
