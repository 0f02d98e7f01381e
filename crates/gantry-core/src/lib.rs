//! Core domain types and shared logic for the gantry deployment receiver.
//!
//! This crate defines the data model used across all other crates:
//! - The per-chunk package descriptor and its wire codec
//! - Declared checksums and streaming artifact hashing
//! - Instance identity used to namespace staged files
//! - Configuration model and validation

pub mod checksum;
pub mod config;
pub mod error;
pub mod instance;
pub mod meta;

pub use checksum::{ArtifactHasher, DeclaredChecksum};
pub use error::{Error, Result};
pub use instance::InstanceId;
pub use meta::{AuthPlacement, PackageId, PackageMeta};

/// Name of the request header carrying the per-chunk package descriptor.
pub const PACKAGE_HEADER: &str = "Package";

/// Name of the request header carrying the shared secret in header-secret
/// deployments.
pub const SECRET_HEADER: &str = "Secret";

/// Default chunk size used by the push client: 4 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;
