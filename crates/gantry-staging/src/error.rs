//! Error types for the staging store.

use gantry_core::PackageId;
use thiserror::Error;

/// Staging store error type.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("chunk {sequence} of package {package} is already staged")]
    Conflict { package: PackageId, sequence: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for staging operations.
pub type StagingResult<T> = std::result::Result<T, StagingError>;
