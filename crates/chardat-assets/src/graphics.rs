//! Off-screen render targets and texture upload
//!
//! Texture capture and application go through [`GraphicsContext`] so the
//! codecs never depend on a particular device. [`SoftwareGraphics`] renders
//! on the CPU and is what the workspace uses outside of an engine.

use chardat_core::Texture;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AssetError;

/// Size of the off-screen target a texture is rendered into before readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetResolution {
    /// Keep the source texture's dimensions
    Source,
    /// Square target of the given edge length
    Square(u32),
}

impl TargetResolution {
    /// Target dimensions for a source of `width` x `height`.
    pub fn dimensions(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            TargetResolution::Source => (width, height),
            TargetResolution::Square(edge) => (edge, edge),
        }
    }
}

/// Graphics-thread operations the material codec needs.
pub trait GraphicsContext {
    /// Render `texture` into an off-screen target of the requested resolution
    /// and read the RGBA8 result back.
    fn read_back(
        &mut self,
        texture: &Texture,
        resolution: TargetResolution,
    ) -> Result<RgbaImage, AssetError>;

    /// Upload pixel data so the texture can be sampled.
    fn commit(&mut self, texture: &mut Texture) -> Result<(), AssetError>;

    /// Copy `texture` into a fresh texture that CPU code may read.
    fn duplicate_readable(&mut self, texture: &Texture) -> Result<Texture, AssetError> {
        let image = self.read_back(texture, TargetResolution::Source)?;
        let (width, height) = image.dimensions();
        let mut copy = Texture::from_rgba8(width, height, image.into_raw())?;
        copy.readable = true;
        copy.committed = false;
        Ok(copy)
    }
}

/// CPU renderer backed by `image::imageops`.
#[derive(Debug, Clone)]
pub struct SoftwareGraphics {
    filter: FilterType,
    commits: usize,
}

impl SoftwareGraphics {
    pub fn new(filter: FilterType) -> Self {
        Self { filter, commits: 0 }
    }

    /// Number of textures committed through this context.
    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl Default for SoftwareGraphics {
    fn default() -> Self {
        Self::new(FilterType::Triangle)
    }
}

impl GraphicsContext for SoftwareGraphics {
    fn read_back(
        &mut self,
        texture: &Texture,
        resolution: TargetResolution,
    ) -> Result<RgbaImage, AssetError> {
        if texture.width == 0 || texture.height == 0 {
            return Err(AssetError::Graphics(format!(
                "cannot render a {}x{} texture",
                texture.width, texture.height
            )));
        }
        let source = RgbaImage::from_raw(texture.width, texture.height, texture.pixels().to_vec())
            .ok_or_else(|| AssetError::Graphics("texture buffer does not match its size".into()))?;

        let (width, height) = resolution.dimensions(texture.width, texture.height);
        if width == 0 || height == 0 {
            return Err(AssetError::Graphics(format!(
                "cannot allocate a {}x{} render target",
                width, height
            )));
        }
        if (width, height) == source.dimensions() {
            return Ok(source);
        }
        debug!(
            "resizing {}x{} texture to {}x{}",
            texture.width, texture.height, width, height
        );
        Ok(imageops::resize(&source, width, height, self.filter))
    }

    fn commit(&mut self, texture: &mut Texture) -> Result<(), AssetError> {
        texture.committed = true;
        self.commits += 1;
        Ok(())
    }
}
