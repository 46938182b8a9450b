//! Frame-sliced application of a snapshot to a live character
//!
//! Applying rebuilds meshes and uploads textures, which must happen on the
//! thread that owns the graphics context. [`ApplyJob`] splits the work into
//! steps (the skeleton pose, then mesh and materials of each part) so the
//! frame loop can run one step per frame.

use std::collections::VecDeque;

use chardat_assets::{ChannelTable, GraphicsContext};
use chardat_core::Scene;
use tracing::{debug, info, warn};

use crate::error::ExchangeError;
use crate::resolver::{CharacterReference, PartRole};
use crate::snapshot::CharacterSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Skeleton,
    Mesh(PartRole),
    Materials(PartRole),
}

/// Whether an [`ApplyJob`] has work left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Pending { remaining: usize },
    Done,
}

/// Applies a [`CharacterSnapshot`] one heavy step at a time.
pub struct ApplyJob {
    snapshot: CharacterSnapshot,
    channels: ChannelTable,
    steps: VecDeque<Step>,
}

impl ApplyJob {
    pub fn new(snapshot: CharacterSnapshot, channels: ChannelTable) -> Self {
        let mut steps = VecDeque::from([Step::Skeleton]);
        for (role, _) in snapshot.parts() {
            steps.push_back(Step::Mesh(role));
            steps.push_back(Step::Materials(role));
        }
        Self {
            snapshot,
            channels,
            steps,
        }
    }

    pub fn snapshot(&self) -> &CharacterSnapshot {
        &self.snapshot
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    pub fn is_done(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the next step against `target`.
    ///
    /// A failed step is consumed; calling again continues with the next one.
    /// Parts present in the snapshot but missing on the target are skipped.
    pub fn step<G: GraphicsContext + ?Sized>(
        &mut self,
        scene: &mut Scene,
        target: &CharacterReference,
        gfx: &mut G,
    ) -> Result<StepOutcome, ExchangeError> {
        let Some(step) = self.steps.pop_front() else {
            return Ok(StepOutcome::Done);
        };
        self.run(step, scene, target, gfx)?;

        if self.steps.is_empty() {
            info!("applied character {} to {:?}", self.snapshot.id, target.root);
            Ok(StepOutcome::Done)
        } else {
            Ok(StepOutcome::Pending {
                remaining: self.steps.len(),
            })
        }
    }

    /// Run every remaining step, stopping at the first failure.
    pub fn run_to_completion<G: GraphicsContext + ?Sized>(
        &mut self,
        scene: &mut Scene,
        target: &CharacterReference,
        gfx: &mut G,
    ) -> Result<(), ExchangeError> {
        while self.step(scene, target, gfx)? != StepOutcome::Done {}
        Ok(())
    }

    fn run<G: GraphicsContext + ?Sized>(
        &self,
        step: Step,
        scene: &mut Scene,
        target: &CharacterReference,
        gfx: &mut G,
    ) -> Result<(), ExchangeError> {
        debug!("apply step {:?}", step);
        let (role, part) = match step {
            Step::Skeleton => {
                self.snapshot.skeleton.apply(scene, &target.skeleton)?;
                return Ok(());
            }
            Step::Mesh(role) | Step::Materials(role) => match self.snapshot.part(role) {
                Some(part) => (role, part),
                None => return Ok(()),
            },
        };
        let Some(node) = target.part(role) else {
            if matches!(step, Step::Mesh(_)) {
                warn!("target has no {:?} part, skipping it", role);
            }
            return Ok(());
        };

        let renderer = scene.renderer_mut(node)?;
        let result = match step {
            Step::Mesh(_) => part.mesh.reconstruct(renderer, &target.skeleton),
            _ => part
                .materials
                .apply(&mut renderer.materials, &self.channels, gfx),
        };
        result.map_err(|source| ExchangeError::Part { role, source })
    }
}

/// Apply a snapshot in one go, outside of a frame loop.
pub fn apply_character<G: GraphicsContext + ?Sized>(
    snapshot: CharacterSnapshot,
    scene: &mut Scene,
    target: &CharacterReference,
    channels: &ChannelTable,
    gfx: &mut G,
) -> Result<(), ExchangeError> {
    ApplyJob::new(snapshot, channels.clone()).run_to_completion(scene, target, gfx)
}
