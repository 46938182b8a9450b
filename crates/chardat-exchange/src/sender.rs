use chardat_net::{split, Message, Transport};
use tracing::{info, warn};

use crate::codec::BlobCodec;
use crate::error::{ExchangeError, StoreError};
use crate::resolver::CharacterId;
use crate::snapshot::CharacterSnapshot;
use crate::store::BlobStore;
use crate::worker::WorkerPool;

/// Splits character blobs into chunks and sends them over a transport.
#[derive(Debug, Clone)]
pub struct CharacterSender {
    chunk_size: usize,
}

impl CharacterSender {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Announce and send `blob` for `id`. Returns the number of chunks sent.
    pub fn send_blob<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        id: CharacterId,
        blob: &[u8],
    ) -> Result<usize, ExchangeError> {
        let chunks = split(blob, self.chunk_size)?;
        let count = chunks.len();
        for message in Message::transfer(id.0, chunks) {
            transport.send(&message)?;
        }
        info!(
            "sent character {}: {} bytes in {} chunks",
            id,
            blob.len(),
            count
        );
        Ok(count)
    }

    /// Load the stored blob for `id` and send it.
    pub fn send_stored<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        store: &BlobStore,
        id: CharacterId,
    ) -> Result<usize, ExchangeError> {
        let blob = store.load(id).map_err(|e| {
            if let StoreError::NotFound(path) = &e {
                warn!("no stored character at {:?}", path);
            }
            e
        })?;
        self.send_blob(transport, id, &blob)
    }

    /// Encode `snapshot` on the worker pool and send it.
    pub fn send_snapshot<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        pool: &WorkerPool,
        codec: BlobCodec,
        snapshot: CharacterSnapshot,
    ) -> Result<usize, ExchangeError> {
        let id = snapshot.id;
        let blob = pool.encode(codec, snapshot).wait()?;
        self.send_blob(transport, id, &blob)
    }
}
