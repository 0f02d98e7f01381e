//! Configuration types shared across crates.

use crate::error::{Error, Result};
use crate::meta::{AuthPlacement, is_identifier};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Route the deployment endpoint is mounted on. The endpoint reveals
    /// nothing about itself to unauthenticated callers, so operators
    /// typically pick a cryptic alias here.
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_path() -> String {
    "/deploy".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path: default_path(),
        }
    }
}

/// Deployment configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Shared secret required on every chunk request.
    pub secret: String,
    /// Destination path replaced by a successful publish.
    pub destination: PathBuf,
    /// Optional shell command executed after a successful publish.
    #[serde(default)]
    pub command: Option<String>,
    /// Age in milliseconds after which staged files are swept. Zero
    /// disables sweeping and keeps staged files indefinitely.
    #[serde(default)]
    pub expiration_ms: u64,
    /// Where the secret travels: dedicated header or embedded token.
    #[serde(default)]
    pub auth: AuthPlacement,
}

impl DeployConfig {
    /// Get the expiration window, or `None` when sweeping is disabled.
    pub fn expiration(&self) -> Option<Duration> {
        (self.expiration_ms > 0).then(|| Duration::from_millis(self.expiration_ms))
    }
}

/// Staging directory configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Directory holding in-flight and pending-merge chunk files. May be
    /// shared between instances; filenames are namespaced per instance.
    #[serde(default = "default_staging_path")]
    pub path: PathBuf,
}

fn default_staging_path() -> PathBuf {
    std::env::temp_dir()
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            path: default_staging_path(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Deployment configuration (required).
    pub deploy: DeployConfig,
    /// Staging directory configuration.
    #[serde(default)]
    pub staging: StagingConfig,
}

impl AppConfig {
    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.deploy.secret.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "deploy.secret must not be blank".to_string(),
            ));
        }
        if self.deploy.auth == AuthPlacement::Embedded && !is_identifier(&self.deploy.secret) {
            return Err(Error::InvalidConfig(
                "deploy.secret contains characters outside the embedded token grammar"
                    .to_string(),
            ));
        }
        if self.deploy.destination.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "deploy.destination must not be empty".to_string(),
            ));
        }
        if let Some(command) = &self.deploy.command {
            if command.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "deploy.command must not be blank".to_string(),
                ));
            }
        }
        if !self.server.path.starts_with('/') {
            return Err(Error::InvalidConfig(
                "server.path must start with '/'".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a test configuration rooted in the given directory.
    ///
    /// **For testing only.** Uses an embedded-token deployment with sweeping
    /// disabled.
    pub fn for_testing(root: &std::path::Path) -> Self {
        Self {
            server: ServerConfig::default(),
            deploy: DeployConfig {
                secret: "test-secret".to_string(),
                destination: root.join("artifact.bin"),
                command: None,
                expiration_ms: 0,
                auth: AuthPlacement::Embedded,
            },
            staging: StagingConfig {
                path: root.join("staging"),
            },
        }
    }
}
