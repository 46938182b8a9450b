//! Chardat Assets - Mesh, skeleton and material codecs
//!
//! Converts the live parts of a character into by-value snapshots and back:
//! skeleton poses, skinned meshes with skinning and blend shapes, and
//! per-material texture channels encoded as PNG.

mod error;
pub mod graphics;
pub mod material;
pub mod mesh;
pub mod skeleton;
pub mod texture;

pub use error::AssetError;
pub use graphics::{GraphicsContext, SoftwareGraphics, TargetResolution};
pub use material::{
    ChannelMapping, ChannelTable, MaterialSnapshot, MaterialTextures, ShadingTechnique,
};
pub use mesh::{BlendShapeSnapshot, MeshSnapshot, FULL_INTENSITY};
pub use skeleton::{BonePose, SkeletonPose};
pub use texture::{decode_png, encode_png};
