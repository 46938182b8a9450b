//! Locating the skeleton and renderable parts of a live character
//!
//! Parts are found by substring match on node names. Which names are expected
//! for which role is described by a versioned [`CharacterSchema`], so rigs
//! exported from different tools can be supported by configuration.

use std::collections::BTreeMap;
use std::fmt;

use chardat_assets::TargetResolution;
use chardat_core::{NodeId, Scene};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ResolveError;

/// Identifier a character is stored and transferred under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CharacterId(pub u32);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic role of a renderable character part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PartRole {
    Body,
    Eyes,
    Eyebrows,
    Hair,
    Teeth,
    Tongue,
    Clothes,
    Shoes,
}

impl PartRole {
    /// Every role, body first.
    pub const ALL: [PartRole; 8] = [
        PartRole::Body,
        PartRole::Eyes,
        PartRole::Eyebrows,
        PartRole::Hair,
        PartRole::Teeth,
        PartRole::Tongue,
        PartRole::Clothes,
        PartRole::Shoes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PartRole::Body => "Body",
            PartRole::Eyes => "Eyes",
            PartRole::Eyebrows => "Eyebrows",
            PartRole::Hair => "Hair",
            PartRole::Teeth => "Teeth",
            PartRole::Tongue => "Tongue",
            PartRole::Clothes => "Clothes",
            PartRole::Shoes => "Shoes",
        }
    }

    /// Resolution textures of this part are captured at.
    pub fn texture_resolution(self) -> TargetResolution {
        match self {
            PartRole::Body => TargetResolution::Source,
            PartRole::Clothes => TargetResolution::Square(1024),
            _ => TargetResolution::Square(512),
        }
    }
}

/// Name pattern for one part role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartPattern {
    pub role: PartRole,
    pub pattern: String,
}

/// Expected node names of a character rig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSchema {
    pub version: u32,
    /// Matched against the direct children of the character root
    pub skeleton_root: String,
    /// Matched against every descendant that carries a skinned mesh renderer
    pub parts: Vec<PartPattern>,
}

impl Default for CharacterSchema {
    fn default() -> Self {
        Self {
            version: 1,
            skeleton_root: "Root".to_string(),
            parts: PartRole::ALL
                .iter()
                .map(|&role| PartPattern {
                    role,
                    pattern: role.name().to_string(),
                })
                .collect(),
        }
    }
}

impl CharacterSchema {
    pub fn pattern(&self, role: PartRole) -> Option<&str> {
        self.parts
            .iter()
            .find(|p| p.role == role)
            .map(|p| p.pattern.as_str())
    }

    /// Resolve the character rooted at `root`.
    ///
    /// Fails when the skeleton root or the body cannot be found; every other
    /// unmatched role is recorded as missing in the report.
    pub fn resolve(
        &self,
        scene: &Scene,
        root: NodeId,
        id: CharacterId,
    ) -> Result<CharacterReference, ResolveError> {
        if scene.node(root).is_none() {
            return Err(ResolveError::UnknownRoot(root));
        }

        let skeleton_root = scene
            .children(root)
            .iter()
            .copied()
            .find(|&child| {
                scene
                    .node(child)
                    .is_some_and(|n| n.name.contains(self.skeleton_root.as_str()))
            })
            .ok_or_else(|| ResolveError::MissingSkeletonRoot {
                pattern: self.skeleton_root.clone(),
            })?;
        let skeleton = scene.descendants(skeleton_root);

        let renderers: Vec<NodeId> = scene
            .descendants(root)
            .into_iter()
            .filter(|&id| scene.renderer(id).is_ok())
            .collect();

        let mut parts = BTreeMap::new();
        let mut report = ResolutionReport {
            schema_version: self.version,
            ..Default::default()
        };
        for role in PartRole::ALL {
            let found = self.pattern(role).and_then(|pattern| {
                renderers.iter().copied().find(|&id| {
                    scene
                        .node(id)
                        .is_some_and(|n| n.name.contains(pattern))
                })
            });
            match found {
                Some(node) => {
                    parts.insert(role, node);
                    report.satisfied.push(role);
                }
                None => report.missing.push(role),
            }
        }

        if !parts.contains_key(&PartRole::Body) {
            return Err(ResolveError::MissingBody {
                pattern: self.pattern(PartRole::Body).unwrap_or_default().to_string(),
            });
        }

        debug!(
            "resolved character {}: {} bones, parts {:?}, missing {:?}",
            id,
            skeleton.len(),
            report.satisfied,
            report.missing
        );
        Ok(CharacterReference {
            id,
            root,
            skeleton,
            parts,
            report,
        })
    }
}

/// Which roles a resolution found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub schema_version: u32,
    pub satisfied: Vec<PartRole>,
    pub missing: Vec<PartRole>,
}

/// Handles to the skeleton and parts of one live character.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterReference {
    pub id: CharacterId,
    pub root: NodeId,
    /// Skeleton root followed by all of its descendants in depth-first order
    pub skeleton: Vec<NodeId>,
    parts: BTreeMap<PartRole, NodeId>,
    pub report: ResolutionReport,
}

impl CharacterReference {
    pub fn part(&self, role: PartRole) -> Option<NodeId> {
        self.parts.get(&role).copied()
    }

    pub fn body(&self) -> NodeId {
        self.parts[&PartRole::Body]
    }

    /// Resolved parts in role order.
    pub fn parts(&self) -> impl Iterator<Item = (PartRole, NodeId)> + '_ {
        self.parts.iter().map(|(&role, &node)| (role, node))
    }
}
