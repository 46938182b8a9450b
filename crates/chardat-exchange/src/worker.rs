use std::sync::mpsc;

use tracing::debug;

use crate::codec::BlobCodec;
use crate::error::ExchangeError;
use crate::snapshot::CharacterSnapshot;

/// A non-blocking handle to a job running on the worker pool.
/// Call `try_recv()` each frame to check for results without blocking the frame loop.
pub struct PendingRequest<T> {
    receiver: mpsc::Receiver<Result<T, ExchangeError>>,
}

impl<T> PendingRequest<T> {
    /// Non-blocking check for the result. Returns `None` if still pending.
    pub fn try_recv(&self) -> Option<Result<T, ExchangeError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                Some(Err(ExchangeError::Worker("job ended without a result".into())))
            }
        }
    }

    /// Blocking wait for the result. Only use outside the frame loop.
    pub fn wait(self) -> Result<T, ExchangeError> {
        self.receiver
            .recv()
            .map_err(|_| ExchangeError::Worker("job ended without a result".into()))?
    }
}

/// Bounded pool for CPU-bound work such as serialization and compression.
/// Owns a background tokio runtime; jobs report back through channels.
pub struct WorkerPool {
    runtime: tokio::runtime::Runtime,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, ExchangeError> {
        let threads = threads.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name("chardat-worker")
            .build()
            .map_err(|e| ExchangeError::Worker(format!("failed to create runtime: {}", e)))?;
        debug!("started worker pool with {} threads", threads);
        Ok(Self { runtime })
    }

    /// Run `job` on the pool.
    pub fn spawn<T, F>(&self, job: F) -> PendingRequest<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ExchangeError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.runtime.spawn_blocking(move || {
            let _ = tx.send(job());
        });
        PendingRequest { receiver: rx }
    }

    /// Serialize and compress a snapshot.
    pub fn encode(&self, codec: BlobCodec, snapshot: CharacterSnapshot) -> PendingRequest<Vec<u8>> {
        self.spawn(move || codec.encode(&snapshot))
    }

    /// Decompress and deserialize a blob.
    pub fn decode(&self, codec: BlobCodec, blob: Vec<u8>) -> PendingRequest<CharacterSnapshot> {
        self.spawn(move || codec.decode(&blob))
    }
}
