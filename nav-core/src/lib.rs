//! Deterministic, engine-agnostic 2D geometry primitives.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod geom;
pub mod math;

pub use geom::{line_intersection, orient2d, EPSILON};
pub use math::{lerp, Vec2, VertexKey};
