//! Server test utilities.

use gantry_core::InstanceId;
use gantry_core::config::AppConfig;
use gantry_server::{AppState, create_router};
use gantry_staging::StagingStore;
use std::path::PathBuf;
use tempfile::TempDir;

/// A test server wrapper with temporary staging and destination.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with the default test configuration
    /// (embedded-token deployment, sweeping disabled).
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut config = AppConfig::for_testing(temp_dir.path());
        modifier(&mut config);

        let staging = StagingStore::open(&config.staging.path, InstanceId::generate())
            .await
            .expect("Failed to open staging store");
        let state = AppState::new(config, staging).expect("Invalid test configuration");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// The configured destination path.
    pub fn destination(&self) -> PathBuf {
        self.state.config.deploy.destination.clone()
    }

    /// The staging directory.
    pub fn staging_dir(&self) -> PathBuf {
        self.state.config.staging.path.clone()
    }

    /// Count staged files belonging to this server's instance.
    pub fn staged_file_count(&self) -> usize {
        let prefix = format!("{}---", self.state.staging.instance().as_str());
        match std::fs::read_dir(self.staging_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
                .count(),
            Err(_) => 0,
        }
    }
}
