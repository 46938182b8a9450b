use std::collections::BTreeMap;

use chardat_assets::{ChannelTable, GraphicsContext, MaterialSnapshot, MeshSnapshot, SkeletonPose};
use chardat_core::{NodeId, Scene};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExchangeError, ResolveError};
use crate::resolver::{CharacterId, CharacterReference, CharacterSchema, PartRole};

/// Mesh and material data of one character part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartSnapshot {
    pub mesh: MeshSnapshot,
    pub materials: MaterialSnapshot,
}

/// Everything needed to make a structurally compatible character look like
/// the captured one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub id: CharacterId,
    /// Version of the schema the character was resolved with
    pub schema_version: u32,
    pub skeleton: SkeletonPose,
    pub body: PartSnapshot,
    /// Parts other than the body; never contains [`PartRole::Body`]
    pub optional_parts: BTreeMap<PartRole, PartSnapshot>,
}

impl CharacterSnapshot {
    /// Capture every resolved part of `reference`.
    pub fn capture<G: GraphicsContext + ?Sized>(
        scene: &Scene,
        reference: &CharacterReference,
        channels: &ChannelTable,
        gfx: &mut G,
    ) -> Result<Self, ExchangeError> {
        let skeleton = SkeletonPose::capture(scene, &reference.skeleton)?;

        let mut body = None;
        let mut optional_parts = BTreeMap::new();
        for (role, node) in reference.parts() {
            let part = capture_part(scene, node, role, &reference.skeleton, channels, gfx)?;
            if role == PartRole::Body {
                body = Some(part);
            } else {
                optional_parts.insert(role, part);
            }
        }
        let body = body.ok_or_else(|| ResolveError::MissingBody {
            pattern: PartRole::Body.name().to_string(),
        })?;

        info!(
            "captured character {}: {} bones, {} optional parts",
            reference.id,
            skeleton.len(),
            optional_parts.len()
        );
        Ok(Self {
            id: reference.id,
            schema_version: reference.report.schema_version,
            skeleton,
            body,
            optional_parts,
        })
    }

    pub fn part(&self, role: PartRole) -> Option<&PartSnapshot> {
        match role {
            PartRole::Body => Some(&self.body),
            _ => self.optional_parts.get(&role),
        }
    }

    /// Captured parts, body first.
    pub fn parts(&self) -> impl Iterator<Item = (PartRole, &PartSnapshot)> {
        std::iter::once((PartRole::Body, &self.body))
            .chain(self.optional_parts.iter().map(|(&role, part)| (role, part)))
    }
}

fn capture_part<G: GraphicsContext + ?Sized>(
    scene: &Scene,
    node: NodeId,
    role: PartRole,
    skeleton: &[NodeId],
    channels: &ChannelTable,
    gfx: &mut G,
) -> Result<PartSnapshot, ExchangeError> {
    let renderer = scene.renderer(node)?;
    let mesh = MeshSnapshot::from_renderer(renderer, skeleton);
    let materials = MaterialSnapshot::capture(
        &renderer.materials,
        channels,
        role.texture_resolution(),
        gfx,
    )
    .map_err(|source| ExchangeError::Part { role, source })?;
    Ok(PartSnapshot { mesh, materials })
}

/// Resolve the character at `root` and capture it under `id`.
pub fn capture_character<G: GraphicsContext + ?Sized>(
    scene: &Scene,
    root: NodeId,
    id: CharacterId,
    schema: &CharacterSchema,
    channels: &ChannelTable,
    gfx: &mut G,
) -> Result<CharacterSnapshot, ExchangeError> {
    let reference = schema.resolve(scene, root, id)?;
    CharacterSnapshot::capture(scene, &reference, channels, gfx)
}
