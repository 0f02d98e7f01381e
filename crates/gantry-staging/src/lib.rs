//! Filesystem-backed staging for chunked artifact transfers.
//!
//! Chunk presence and file age are the only persisted state: completion is
//! decided by listing the staging directory, never by an in-memory registry,
//! so a restarted instance can never disagree with what is on disk.

pub mod error;
pub mod publish;
pub mod store;

pub use error::{StagingError, StagingResult};
pub use publish::publish;
pub use store::StagingStore;
