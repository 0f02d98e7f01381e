//! Application state shared across handlers.

use gantry_core::config::AppConfig;
use gantry_staging::StagingStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Chunk staging store, namespaced by this instance's identity.
    pub staging: Arc<StagingStore>,
    /// Serializes the assembly sequence instance-wide. Chunk staging runs
    /// lock-free; at most one completion/merge/publish sequence executes at
    /// a time across all packages handled by this instance.
    pub assembly_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Validates the configuration up front so misconfiguration fails at
    /// startup rather than on the first request.
    pub fn new(config: AppConfig, staging: StagingStore) -> gantry_core::Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            staging: Arc::new(staging),
            assembly_lock: Arc::new(Mutex::new(())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::InstanceId;

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = AppConfig::for_testing(temp.path());
        config.deploy.secret = String::new();

        let staging = StagingStore::open(temp.path().join("staging"), InstanceId::generate())
            .await
            .unwrap();
        assert!(AppState::new(config, staging).is_err());
    }
}
