//! Package assembly: completion detection, merge, verification, publish,
//! and the post-publish command.

use crate::state::AppState;
use gantry_core::meta::PackageMeta;
use gantry_staging::{StagingError, publish};
use thiserror::Error;
use tokio::process::Command;

/// Errors raised after the chunk response has already been sent. No client
/// is waiting; these surface through the log channel only.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("invalid checksum of {destination}")]
    ChecksumMismatch { destination: String },

    #[error("failed to publish to {destination}: {source}")]
    Publish {
        destination: String,
        #[source]
        source: std::io::Error,
    },

    #[error("post-publish command failed: {0}")]
    PostPublishCommand(String),

    #[error(transparent)]
    Staging(#[from] StagingError),
}

/// Detect completion for the package and, if complete, merge, verify,
/// publish, and run the post-publish command.
///
/// The whole sequence runs under the instance-wide assembly lock; chunk
/// staging itself never takes it. Errors are logged and otherwise dropped.
pub async fn assemble(state: AppState, meta: PackageMeta) {
    let result = {
        let _guard = state.assembly_lock.lock().await;
        try_assemble(&state, &meta).await
    };
    if let Err(e) = result {
        tracing::error!(
            package = %meta.package,
            error = %e,
            "package assembly failed"
        );
    }
}

async fn try_assemble(state: &AppState, meta: &PackageMeta) -> Result<(), AssemblyError> {
    let staging = &state.staging;
    if !staging.is_complete(&meta.package, meta.total).await? {
        // Some later chunk will complete the set and trigger assembly again.
        return Ok(());
    }

    let artifact = staging.merge(&meta.package, meta.total).await?;
    let destination = &state.config.deploy.destination;

    let actual = staging.artifact_checksum(&artifact).await?;
    if !meta.checksum.matches(&actual) {
        // The merged artifact stays in staging for inspection until the
        // sweeper reclaims it; the destination is untouched.
        return Err(AssemblyError::ChecksumMismatch {
            destination: destination.display().to_string(),
        });
    }

    publish(&artifact, destination)
        .await
        .map_err(|source| AssemblyError::Publish {
            destination: destination.display().to_string(),
            source,
        })?;

    tracing::info!(
        package = %meta.package,
        destination = %destination.display(),
        "artifact published"
    );

    if let Some(command) = &state.config.deploy.command {
        // Publish is committed at this point; a failing command does not
        // roll the destination back.
        run_post_publish(command).await?;
        tracing::info!(package = %meta.package, "post-publish command finished");
    }

    Ok(())
}

/// Run the configured command through the platform shell and treat any
/// error output as fatal.
async fn run_post_publish(command: &str) -> Result<(), AssemblyError> {
    let output = shell_command(command)
        .output()
        .await
        .map_err(|e| AssemblyError::PostPublishCommand(format!("failed to run: {e}")))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return Err(AssemblyError::PostPublishCommand(stderr.to_string()));
    }
    Ok(())
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
