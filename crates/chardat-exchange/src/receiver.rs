use std::time::Instant;

use chardat_assets::{ChannelTable, GraphicsContext};
use chardat_core::{NodeId, Scene};
use chardat_net::{Message, SessionEvent, SessionState, TransferSession, Transport};
use tracing::{debug, info, warn};

use crate::codec::BlobCodec;
use crate::config::ExchangeConfig;
use crate::error::ExchangeError;
use crate::reconstruct::{ApplyJob, StepOutcome};
use crate::resolver::{CharacterId, CharacterReference, CharacterSchema};
use crate::snapshot::CharacterSnapshot;
use crate::worker::{PendingRequest, WorkerPool};

/// What the receiver is doing this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverStatus {
    Idle,
    Receiving { target_id: u32, received: u32, expected: u32 },
    Decoding { id: CharacterId },
    Applying { id: CharacterId, remaining: usize },
    /// The last step of an apply ran this frame
    Applied { id: CharacterId },
}

/// Receives chunked character blobs and applies them to one live character.
///
/// Call [`poll`](Self::poll) to drain the transport and
/// [`update`](Self::update) once per frame on the graphics thread.
pub struct CharacterReceiver {
    character: NodeId,
    session: TransferSession,
    codec: BlobCodec,
    schema: CharacterSchema,
    channels: ChannelTable,
    decoding: Option<(CharacterId, PendingRequest<CharacterSnapshot>)>,
    applying: Option<(ApplyJob, CharacterReference)>,
}

impl CharacterReceiver {
    pub fn new(character: NodeId, config: &ExchangeConfig) -> Self {
        Self {
            character,
            session: TransferSession::new(config.session_timeout()),
            codec: BlobCodec::new(config.compression_level),
            schema: config.schema.clone(),
            channels: config.channels.clone(),
            decoding: None,
            applying: None,
        }
    }

    pub fn status(&self) -> ReceiverStatus {
        if let Some((job, reference)) = &self.applying {
            return ReceiverStatus::Applying {
                id: reference.id,
                remaining: job.remaining(),
            };
        }
        if let Some((id, _)) = &self.decoding {
            return ReceiverStatus::Decoding { id: *id };
        }
        match self.session.state() {
            SessionState::Idle => ReceiverStatus::Idle,
            SessionState::Announced {
                target_id,
                expected,
            } => ReceiverStatus::Receiving {
                target_id,
                received: 0,
                expected,
            },
            SessionState::Collecting {
                target_id,
                expected,
                received,
            } => ReceiverStatus::Receiving {
                target_id,
                received,
                expected,
            },
        }
    }

    /// Feed one message. A completed transfer is handed to the pool for decoding.
    pub fn receive(&mut self, message: Message, pool: &WorkerPool) -> Result<(), ExchangeError> {
        match self.session.handle(message)? {
            SessionEvent::Complete { target_id, payload } => {
                let id = CharacterId(target_id);
                if let Some((previous, _)) = self.decoding.take() {
                    warn!("character {} arrived before {} finished decoding", id, previous);
                }
                self.decoding = Some((id, pool.decode(self.codec, payload)));
            }
            event => debug!("{:?}", event),
        }
        Ok(())
    }

    /// Drain every waiting message from `transport`. Messages the session
    /// rejects are logged and dropped. Returns the number of messages read.
    pub fn poll<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        pool: &WorkerPool,
    ) -> Result<usize, ExchangeError> {
        let mut count = 0;
        while let Some(message) = transport.try_recv()? {
            count += 1;
            if let Err(e) = self.receive(message, pool) {
                warn!("dropped message: {}", e);
            }
        }
        Ok(count)
    }

    /// Advance by one frame: expire a silent transfer, pick up a decoded
    /// snapshot, or run one apply step.
    ///
    /// An expired transfer is logged and dropped; it does not hold up a
    /// character that already arrived.
    pub fn update<G: GraphicsContext + ?Sized>(
        &mut self,
        scene: &mut Scene,
        gfx: &mut G,
    ) -> Result<ReceiverStatus, ExchangeError> {
        // The session logs the timeout itself.
        let _ = self.session.expire(Instant::now());

        if let Some((mut job, reference)) = self.applying.take() {
            let result = job.step(scene, &reference, gfx);
            let id = reference.id;
            if !job.is_done() {
                self.applying = Some((job, reference));
            }
            return match result? {
                StepOutcome::Done => Ok(ReceiverStatus::Applied { id }),
                StepOutcome::Pending { remaining } => {
                    Ok(ReceiverStatus::Applying { id, remaining })
                }
            };
        }

        if let Some((id, pending)) = self.decoding.take() {
            match pending.try_recv() {
                None => self.decoding = Some((id, pending)),
                Some(result) => {
                    let snapshot = result?;
                    if snapshot.id != id {
                        warn!("transfer {} carried character {}", id, snapshot.id);
                    }
                    let reference = self.schema.resolve(scene, self.character, snapshot.id)?;
                    info!("applying character {} to {:?}", snapshot.id, self.character);
                    let job = ApplyJob::new(snapshot, self.channels.clone());
                    self.applying = Some((job, reference));
                }
            }
        }
        Ok(self.status())
    }

    /// Run frames until nothing is left to decode or apply.
    pub fn finish<G: GraphicsContext + ?Sized>(
        &mut self,
        scene: &mut Scene,
        gfx: &mut G,
    ) -> Result<(), ExchangeError> {
        while self.decoding.is_some() || self.applying.is_some() {
            self.update(scene, gfx)?;
            if self.applying.is_none() {
                std::thread::yield_now();
            }
        }
        Ok(())
    }
}
