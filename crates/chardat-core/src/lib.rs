//! Chardat Core - Scene model and value types for character snapshots
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Mathematical primitives (re-exported from glam)
//! - The arena scene graph that live characters are built from
//! - The engine-side skinned mesh with normal, tangent and bounds recomputation
//! - A deterministic sample character builder

pub mod error;
pub mod mesh;
pub mod sample;
pub mod scene;
pub mod types;

pub use error::{MeshError, SceneError};
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use mesh::{BlendShape, BlendShapeFrame, Mesh};
pub use scene::{Material, Node, NodeId, Scene, SkinnedMeshRenderer, Texture};
pub use types::{BoneWeight, Bounds, Color, Transform};
