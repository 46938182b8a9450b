//! Chardat Net - Chunked transfer of snapshot blobs
//!
//! Splits a blob into size-bounded chunks, announces and sends them over a
//! [`Transport`], and reassembles them on the receiving side regardless of
//! arrival order.

pub mod chunker;
mod error;
pub mod message;
pub mod session;
pub mod transport;

pub use chunker::{reassemble, split, DEFAULT_CHUNK_SIZE};
pub use error::TransferError;
pub use message::Message;
pub use session::{SessionEvent, SessionState, TransferSession, DEFAULT_SESSION_TIMEOUT};
pub use transport::{LoopbackTransport, Transport};
