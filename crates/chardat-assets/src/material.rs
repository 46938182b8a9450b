//! Texture channel capture and reapplication for materials

use chardat_core::Material;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AssetError;
use crate::graphics::{GraphicsContext, TargetResolution};
use crate::texture::{decode_png, encode_png};

/// Number of texture channels captured per material.
pub const CHANNELS_PER_MATERIAL: usize = 3;

/// Shading techniques with a known texture layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadingTechnique {
    Standard,
    UniversalLit,
    Skin,
    Cornea,
    Hair,
}

impl ShadingTechnique {
    /// Classify a shader identifier.
    ///
    /// When a name matches several techniques the precedence is
    /// Hair, Cornea, Lit, Skin, then Standard.
    pub fn from_shader_name(shader: &str) -> Option<Self> {
        if shader.contains("Hair") {
            Some(Self::Hair)
        } else if shader.contains("RL_CorneaShader") {
            Some(Self::Cornea)
        } else if shader.contains("Lit") {
            Some(Self::UniversalLit)
        } else if ["SkinShader_Variants_URP", "RL_TeethShader_URP", "RL_TongueShader_URP"]
            .iter()
            .any(|name| shader.contains(name))
        {
            Some(Self::Skin)
        } else if shader.contains("Standard") {
            Some(Self::Standard)
        } else {
            None
        }
    }
}

/// Channel names used by one shading technique, in capture order:
/// base color, packed surface map, normal or detail map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMapping {
    pub technique: ShadingTechnique,
    pub channels: [String; CHANNELS_PER_MATERIAL],
}

impl ChannelMapping {
    pub fn new(technique: ShadingTechnique, channels: [&str; CHANNELS_PER_MATERIAL]) -> Self {
        Self {
            technique,
            channels: channels.map(str::to_string),
        }
    }
}

/// Maps shading techniques to the texture channels worth capturing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTable {
    pub mappings: Vec<ChannelMapping>,
}

impl Default for ChannelTable {
    fn default() -> Self {
        use ShadingTechnique::*;
        Self {
            mappings: vec![
                ChannelMapping::new(Standard, ["_MainTex", "_MetallicGlossMap", "_BumpMap"]),
                ChannelMapping::new(UniversalLit, ["_BaseMap", "_MetallicGlossMap", "_BumpMap"]),
                ChannelMapping::new(Skin, ["_DiffuseMap", "_MaskMap", "_NormalMap"]),
                ChannelMapping::new(Cornea, ["_ScleraDiffuseMap", "_CorneaDiffuseMap", "_MaskMap"]),
                ChannelMapping::new(Hair, ["_DiffuseMap", "_MaskMap", "_FlowMap"]),
            ],
        }
    }
}

impl ChannelTable {
    /// Add or replace the mapping for a technique.
    pub fn insert(&mut self, mapping: ChannelMapping) {
        match self
            .mappings
            .iter_mut()
            .find(|m| m.technique == mapping.technique)
        {
            Some(existing) => *existing = mapping,
            None => self.mappings.push(mapping),
        }
    }

    pub fn channels_for(
        &self,
        technique: ShadingTechnique,
    ) -> Option<&[String; CHANNELS_PER_MATERIAL]> {
        self.mappings
            .iter()
            .find(|m| m.technique == technique)
            .map(|m| &m.channels)
    }

    /// Channel names for a shader identifier; all `None` when the shader is
    /// not recognized.
    pub fn resolve(&self, shader: &str) -> [Option<&str>; CHANNELS_PER_MATERIAL] {
        match ShadingTechnique::from_shader_name(shader).and_then(|t| self.channels_for(t)) {
            Some([a, b, c]) => [Some(a.as_str()), Some(b.as_str()), Some(c.as_str())],
            None => [None; CHANNELS_PER_MATERIAL],
        }
    }
}

/// PNG bytes for each captured channel of one material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialTextures {
    pub channels: [Option<Vec<u8>>; CHANNELS_PER_MATERIAL],
}

impl MaterialTextures {
    pub fn present(&self) -> usize {
        self.channels.iter().filter(|c| c.is_some()).count()
    }
}

/// Captured textures for every material slot of one renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialSnapshot {
    pub materials: Vec<MaterialTextures>,
}

impl MaterialSnapshot {
    /// Read back every bound channel texture at `resolution` and encode it as PNG.
    pub fn capture<G: GraphicsContext + ?Sized>(
        materials: &[Material],
        table: &ChannelTable,
        resolution: TargetResolution,
        gfx: &mut G,
    ) -> Result<Self, AssetError> {
        let mut captured = Vec::with_capacity(materials.len());
        for material in materials {
            let mut textures = MaterialTextures::default();
            let names = table.resolve(&material.shader);
            if names.iter().all(Option::is_none) {
                debug!(
                    "material '{}' uses unrecognized shader '{}', no textures captured",
                    material.name, material.shader
                );
            }
            for (slot, name) in textures.channels.iter_mut().zip(names) {
                let Some(texture) = name.and_then(|n| material.texture(n)) else {
                    continue;
                };
                let image = gfx.read_back(texture, resolution)?;
                *slot = Some(encode_png(&image)?);
            }
            captured.push(textures);
        }
        Ok(Self { materials: captured })
    }

    /// Decode each present channel and bind it to the matching live material.
    ///
    /// Channels without captured data keep their current texture. Captured
    /// slots beyond the number of live materials are skipped. A material is
    /// only touched once all of its channels have decoded.
    pub fn apply<G: GraphicsContext + ?Sized>(
        &self,
        materials: &mut [Material],
        table: &ChannelTable,
        gfx: &mut G,
    ) -> Result<(), AssetError> {
        if self.materials.len() > materials.len() {
            warn!(
                "snapshot has {} material slots but the renderer has {}, skipping the rest",
                self.materials.len(),
                materials.len()
            );
        }
        for (captured, material) in self.materials.iter().zip(materials.iter_mut()) {
            let names = table.resolve(&material.shader).map(|n| n.map(str::to_string));
            let mut decoded = Vec::with_capacity(CHANNELS_PER_MATERIAL);
            for (bytes, name) in captured.channels.iter().zip(names) {
                if let (Some(bytes), Some(name)) = (bytes, name) {
                    decoded.push((name, decode_png(bytes)?));
                }
            }
            for (name, texture) in decoded {
                let mut texture = gfx.duplicate_readable(&texture)?;
                gfx.commit(&mut texture)?;
                material.set_texture(name, texture);
            }
        }
        Ok(())
    }
}
