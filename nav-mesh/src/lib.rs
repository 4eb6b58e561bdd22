//! Half-edge navigation mesh with any-angle (Polyanya) path queries.
//!
//! Pipeline: build a mesh from convex polygon soup (or a cell grid), run
//! [`NavMesh::simplify`] once to merge faces into maximal convex polygons,
//! [`NavMesh::mark_corners`] to flag legal path-bend vertices, optionally
//! [`NavMesh::validate`] the structure, then issue any number of
//! [`NavMesh::shortest_path`] queries against the now-immutable mesh.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod check;
pub mod mesh;
pub mod navigator;
pub mod polyanya;

mod corner;
mod merge;

pub use check::MeshError;
pub use mesh::{EdgeId, FaceId, NavMesh, PointId, PointLocation};
pub use navigator::{NavPath, Navigator};
pub use polyanya::QueryOptions;

pub use nav_core::Vec2;
