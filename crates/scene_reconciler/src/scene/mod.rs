//! Native scene graph and picking primitives

pub mod scene_graph;
pub mod shape;

pub use scene_graph::{NodeHit, NodeKey, NodeLink, SceneGraph, SceneNode};
pub use shape::{Aabb, BoundingSphere, HitShape, Ray};
