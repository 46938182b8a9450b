//! Receiver-side reassembly of one chunked transfer at a time

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::chunker;
use crate::error::TransferError;
use crate::message::Message;

/// Default time a transfer may go without any message before it is abandoned.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Observable state of a [`TransferSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Announced { target_id: u32, expected: u32 },
    Collecting { target_id: u32, expected: u32, received: u32 },
}

/// What a message did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A transfer was opened and is waiting for chunks
    Announced { target_id: u32, expected: u32 },
    /// A chunk was stored
    Progress { received: u32, expected: u32 },
    /// Every chunk arrived; `payload` is the reassembled blob
    Complete { target_id: u32, payload: Vec<u8> },
}

#[derive(Debug)]
struct Transfer {
    target_id: u32,
    expected: u32,
    chunks: HashMap<u32, Vec<u8>>,
    received: u32,
    last_activity: Instant,
}

/// Collects the chunks of an announced transfer and reassembles them once the
/// announced number of chunks has arrived.
#[derive(Debug)]
pub struct TransferSession {
    timeout: Duration,
    transfer: Option<Transfer>,
}

impl Default for TransferSession {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

impl TransferSession {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            transfer: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match &self.transfer {
            None => SessionState::Idle,
            Some(t) if t.received == 0 => SessionState::Announced {
                target_id: t.target_id,
                expected: t.expected,
            },
            Some(t) => SessionState::Collecting {
                target_id: t.target_id,
                expected: t.expected,
                received: t.received,
            },
        }
    }

    pub fn is_idle(&self) -> bool {
        self.transfer.is_none()
    }

    /// Drop any transfer in progress.
    pub fn reset(&mut self) {
        if let Some(t) = self.transfer.take() {
            debug!("abandoning transfer for target {}", t.target_id);
        }
    }

    pub fn handle(&mut self, message: Message) -> Result<SessionEvent, TransferError> {
        self.handle_at(message, Instant::now())
    }

    /// Feed one message received at `now`.
    pub fn handle_at(
        &mut self,
        message: Message,
        now: Instant,
    ) -> Result<SessionEvent, TransferError> {
        match message {
            Message::Announcement {
                target_id,
                expected_chunk_count,
            } => {
                if let Some(previous) = &self.transfer {
                    warn!(
                        "announcement for target {} replaces unfinished transfer for target {}",
                        target_id, previous.target_id
                    );
                }
                info!(
                    "receiving {} chunks for target {}",
                    expected_chunk_count, target_id
                );
                self.transfer = Some(Transfer {
                    target_id,
                    expected: expected_chunk_count,
                    chunks: HashMap::new(),
                    received: 0,
                    last_activity: now,
                });
                if expected_chunk_count == 0 {
                    return self.complete();
                }
                Ok(SessionEvent::Announced {
                    target_id,
                    expected: expected_chunk_count,
                })
            }
            Message::Chunk {
                sequence_index,
                bytes,
            } => {
                let transfer = self
                    .transfer
                    .as_mut()
                    .ok_or(TransferError::UnexpectedChunk { sequence_index })?;
                if sequence_index >= transfer.expected {
                    return Err(TransferError::ChunkOutOfRange {
                        sequence_index,
                        expected: transfer.expected,
                    });
                }
                if transfer.chunks.insert(sequence_index, bytes).is_some() {
                    debug!("chunk {} was sent again, keeping the latest", sequence_index);
                }
                transfer.received += 1;
                transfer.last_activity = now;

                if transfer.received == transfer.expected {
                    return self.complete();
                }
                Ok(SessionEvent::Progress {
                    received: transfer.received,
                    expected: transfer.expected,
                })
            }
        }
    }

    /// Abandon the transfer if it has been silent for longer than the timeout.
    pub fn expire(&mut self, now: Instant) -> Result<(), TransferError> {
        let Some(t) = &self.transfer else {
            return Ok(());
        };
        if now.saturating_duration_since(t.last_activity) < self.timeout {
            return Ok(());
        }
        let err = TransferError::TimedOut {
            target_id: t.target_id,
            received: t.received,
            expected: t.expected,
        };
        warn!("{}", err);
        self.transfer = None;
        Err(err)
    }

    fn complete(&mut self) -> Result<SessionEvent, TransferError> {
        let Some(mut transfer) = self.transfer.take() else {
            return Err(TransferError::UnexpectedChunk { sequence_index: 0 });
        };

        let missing: Vec<u32> = (0..transfer.expected)
            .filter(|i| !transfer.chunks.contains_key(i))
            .collect();
        if !missing.is_empty() {
            return Err(TransferError::MissingChunks {
                target_id: transfer.target_id,
                missing,
            });
        }

        let mut ordered: Vec<(u32, Vec<u8>)> = transfer.chunks.drain().collect();
        ordered.sort_unstable_by_key(|(index, _)| *index);
        let payload = chunker::reassemble(ordered.into_iter().map(|(_, bytes)| bytes));
        info!(
            "reassembled {} bytes for target {}",
            payload.len(),
            transfer.target_id
        );
        Ok(SessionEvent::Complete {
            target_id: transfer.target_id,
            payload,
        })
    }
}
