//! Arena-indexed half-edge planar subdivision.
//!
//! Faces, half-edges, and vertices live in flat arenas addressed by stable
//! index newtypes, so face merges are index updates rather than pointer
//! lifetime hazards. Edges bordering non-traversable space or the mesh
//! exterior simply have no twin.

use std::collections::BTreeMap;

use nav_core::{orient2d, Vec2, VertexKey, EPSILON};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Index of a mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointId(pub u32);

/// Index of a directed half-edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u32);

/// Index of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId(pub u32);

impl PointId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FaceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PointRec {
    pub(crate) position: Vec2,
    pub(crate) corner: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeRec {
    pub(crate) origin: PointId,
    pub(crate) next: EdgeId,
    pub(crate) twin: Option<EdgeId>,
    pub(crate) face: FaceId,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FaceRec {
    pub(crate) root: EdgeId,
    pub(crate) navigable: bool,
    pub(crate) alive: bool,
    /// Bumped whenever the face's boundary changes; lets the merge queue
    /// discard stale entries on pop instead of eagerly invalidating.
    pub(crate) generation: u32,
}

/// Classification of a point against one convex face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Boundary,
    Outside,
}

/// A planar subdivision of traversable space into convex polygonal faces.
#[derive(Debug, Clone)]
pub struct NavMesh {
    pub(crate) points: Vec<PointRec>,
    pub(crate) edges: Vec<EdgeRec>,
    pub(crate) faces: Vec<FaceRec>,
}

impl NavMesh {
    /// Build a mesh from convex polygon soup.
    ///
    /// Every polygon must be simple, convex, and wound counter-clockwise.
    /// Vertices are unified by exact coordinate bit pattern, and half-edges
    /// shared between two polygons are twinned automatically; edges with no
    /// opposite polygon border non-traversable space.
    pub fn from_polygons(polygons: &[Vec<Vec2>]) -> Self {
        let mut mesh = Self {
            points: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
        };
        let mut point_ids: BTreeMap<VertexKey, PointId> = BTreeMap::new();
        let mut edge_ids: BTreeMap<(VertexKey, VertexKey), EdgeId> = BTreeMap::new();

        for polygon in polygons {
            debug_assert!(polygon.len() >= 3, "degenerate polygon");
            let base = mesh.edges.len();
            let n = polygon.len();
            let face = FaceId(mesh.faces.len() as u32);

            let mut keys = Vec::with_capacity(n);
            for &p in polygon {
                let key = p.key();
                let id = *point_ids.entry(key).or_insert_with(|| {
                    let id = PointId(mesh.points.len() as u32);
                    mesh.points.push(PointRec {
                        position: p,
                        corner: false,
                    });
                    id
                });
                keys.push((key, id));
            }

            for i in 0..n {
                mesh.edges.push(EdgeRec {
                    origin: keys[i].1,
                    next: EdgeId((base + (i + 1) % n) as u32),
                    twin: None,
                    face,
                });
            }
            for i in 0..n {
                let edge = EdgeId((base + i) as u32);
                let from = keys[i].0;
                let to = keys[(i + 1) % n].0;
                if let Some(&opposite) = edge_ids.get(&(to, from)) {
                    mesh.edges[edge.index()].twin = Some(opposite);
                    mesh.edges[opposite.index()].twin = Some(edge);
                }
                edge_ids.insert((from, to), edge);
            }

            mesh.faces.push(FaceRec {
                root: EdgeId(base as u32),
                navigable: true,
                alive: true,
                generation: 0,
            });
        }

        mesh
    }

    /// Build a mesh of unit-square faces from rows of cells.
    ///
    /// `.` marks an open cell, anything else is blocked. Cell `(col, row)`
    /// becomes the square with corners `(col, row)` and `(col + 1, row + 1)`.
    pub fn from_grid(rows: &[&str]) -> Self {
        let mut polygons = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.chars().enumerate() {
                if cell == '.' {
                    let x = c as f64;
                    let y = r as f64;
                    polygons.push(vec![
                        Vec2::new(x, y),
                        Vec2::new(x + 1.0, y),
                        Vec2::new(x + 1.0, y + 1.0),
                        Vec2::new(x, y + 1.0),
                    ]);
                }
            }
        }
        Self::from_polygons(&polygons)
    }

    /// Number of live faces.
    pub fn face_count(&self) -> usize {
        self.faces().count()
    }

    /// All live faces.
    pub fn faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.alive)
            .map(|(i, _)| FaceId(i as u32))
    }

    pub fn is_navigable(&self, face: FaceId) -> bool {
        self.faces[face.index()].navigable
    }

    pub fn face_root(&self, face: FaceId) -> EdgeId {
        self.faces[face.index()].root
    }

    /// Walk a face's boundary cycle starting at its root edge.
    pub fn face_edges(&self, face: FaceId) -> FaceEdges<'_> {
        let root = self.face_root(face);
        FaceEdges {
            mesh: self,
            root,
            cur: Some(root),
        }
    }

    pub fn origin(&self, edge: EdgeId) -> PointId {
        self.edges[edge.index()].origin
    }

    /// Origin of the edge's successor, i.e. the vertex this edge points at.
    pub fn target(&self, edge: EdgeId) -> PointId {
        self.origin(self.next(edge))
    }

    pub fn next(&self, edge: EdgeId) -> EdgeId {
        self.edges[edge.index()].next
    }

    pub fn twin(&self, edge: EdgeId) -> Option<EdgeId> {
        self.edges[edge.index()].twin
    }

    pub fn edge_face(&self, edge: EdgeId) -> FaceId {
        self.edges[edge.index()].face
    }

    pub fn position(&self, point: PointId) -> Vec2 {
        self.points[point.index()].position
    }

    /// Whether the vertex is reflex with respect to traversable space, i.e.
    /// a legal path-bend point. Assigned by [`NavMesh::mark_corners`].
    pub fn is_corner(&self, point: PointId) -> bool {
        self.points[point.index()].corner
    }

    /// Signed area by the shoelace formula; positive for the counter-clockwise
    /// winding all construction and predicate code assumes.
    pub fn face_area(&self, face: FaceId) -> f64 {
        let mut sum = 0.0;
        for e in self.face_edges(face) {
            let a = self.position(self.origin(e));
            let b = self.position(self.target(e));
            sum += a.x * b.y - a.y * b.x;
        }
        sum / 2.0
    }

    /// Boundary polygon of a face, in cycle order.
    pub fn polygon(&self, face: FaceId) -> Vec<Vec2> {
        self.face_edges(face)
            .map(|e| self.position(self.origin(e)))
            .collect()
    }

    /// Boundary polygons of every live navigable face.
    pub fn polygons(&self) -> Vec<Vec<Vec2>> {
        self.faces()
            .filter(|&f| self.is_navigable(f))
            .map(|f| self.polygon(f))
            .collect()
    }

    /// Classify `p` against one convex face, distinguishing boundary contact
    /// from strict containment.
    ///
    /// Crossing-number test with explicit collinear handling, so points lying
    /// exactly on a shared edge between two faces classify as `Boundary`
    /// rather than flickering between the neighbors.
    pub fn locate_point(&self, face: FaceId, p: Vec2) -> PointLocation {
        let mut crossings = 0usize;
        let mut collinear = false;
        let mut on_edge = false;

        for e in self.face_edges(face) {
            let a = self.position(self.origin(e));
            let b = self.position(self.target(e));

            if orient2d(p, a, b) == 0.0 {
                collinear = true;
                let (min_x, max_x) = if a.x <= b.x { (a.x, b.x) } else { (b.x, a.x) };
                let (min_y, max_y) = if a.y <= b.y { (a.y, b.y) } else { (b.y, a.y) };
                if min_x <= p.x && p.x <= max_x && min_y <= p.y && p.y <= max_y {
                    on_edge = true;
                }
            }

            if (a.y > p.y) != (b.y > p.y) && p.x < a.x + (b.x - a.x) * (p.y - a.y) / (b.y - a.y) {
                crossings += 1;
            }
        }

        if collinear {
            if on_edge {
                PointLocation::Boundary
            } else {
                PointLocation::Outside
            }
        } else if crossings % 2 == 1 {
            PointLocation::Inside
        } else {
            PointLocation::Outside
        }
    }

    /// Like [`NavMesh::locate_point`], but absorbs floating-point tolerance
    /// by also trying `p` nudged by [`EPSILON`] in the four axis directions
    /// and accepting the first classification that is not `Outside`.
    pub fn locate_point_nudged(&self, face: FaceId, p: Vec2) -> PointLocation {
        const DIRS: [Vec2; 4] = [
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(-1.0, 0.0),
        ];
        for dir in DIRS {
            let location = self.locate_point(face, p + dir * EPSILON);
            if location != PointLocation::Outside {
                return location;
            }
        }
        self.locate_point(face, p)
    }

    /// First live navigable face containing `p`, with epsilon tolerance.
    pub fn find_face(&self, p: Vec2) -> Option<FaceId> {
        self.faces()
            .filter(|&f| self.is_navigable(f))
            .find(|&f| self.locate_point_nudged(f, p) != PointLocation::Outside)
    }

    /// First live navigable face containing `p`, by exact classification.
    pub fn find_face_strict(&self, p: Vec2) -> Option<FaceId> {
        self.faces()
            .filter(|&f| self.is_navigable(f))
            .find(|&f| self.locate_point(f, p) != PointLocation::Outside)
    }
}

/// Iterator over one face's boundary cycle.
pub struct FaceEdges<'a> {
    mesh: &'a NavMesh,
    root: EdgeId,
    cur: Option<EdgeId>,
}

impl Iterator for FaceEdges<'_> {
    type Item = EdgeId;

    fn next(&mut self) -> Option<EdgeId> {
        let edge = self.cur?;
        let next = self.mesh.next(edge);
        self.cur = if next == self.root { None } else { Some(next) };
        Some(edge)
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct NavMeshSerde {
    polygons: Vec<Vec<Vec2>>,
}

#[cfg(feature = "serde")]
impl Serialize for NavMesh {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        NavMeshSerde {
            polygons: self.polygons(),
        }
        .serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for NavMesh {
    /// Rebuilds the arenas from the serialized polygon soup and re-marks
    /// corners; a simplified mesh round-trips to an identical face set.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = NavMeshSerde::deserialize(deserializer)?;
        let mut mesh = NavMesh::from_polygons(&data.polygons);
        mesh.mark_corners();
        Ok(mesh)
    }
}
