//! Chardat Exchange - Character snapshot capture, storage and transfer
//!
//! Ties the codecs and the transfer layer together:
//! - [`CharacterSchema`] resolves a live character into a [`CharacterReference`]
//! - [`CharacterSnapshot::capture`] builds a by-value snapshot of it
//! - [`BlobCodec`] turns snapshots into compressed blobs on a [`WorkerPool`]
//! - [`BlobStore`], [`CharacterSender`] and [`CharacterReceiver`] move blobs
//!   around, and [`ApplyJob`] applies them one step per frame

pub mod codec;
pub mod config;
pub mod error;
pub mod local;
pub mod receiver;
pub mod reconstruct;
pub mod resolver;
pub mod sender;
pub mod snapshot;
pub mod store;
pub mod worker;

pub use codec::{compress, decompress, BlobCodec, DEFAULT_COMPRESSION_LEVEL};
pub use config::ExchangeConfig;
pub use error::{ExchangeError, ResolveError, StoreError};
pub use local::{load_and_apply, save_character};
pub use receiver::{CharacterReceiver, ReceiverStatus};
pub use reconstruct::{apply_character, ApplyJob, StepOutcome};
pub use resolver::{
    CharacterId, CharacterReference, CharacterSchema, PartPattern, PartRole, ResolutionReport,
};
pub use sender::CharacterSender;
pub use snapshot::{capture_character, CharacterSnapshot, PartSnapshot};
pub use store::{BlobStore, SaveOutcome, BLOB_EXTENSION};
pub use worker::{PendingRequest, WorkerPool};
