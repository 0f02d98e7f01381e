//! Atomic publication of a merged artifact to its destination.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Replace the destination with the artifact.
///
/// A plain rename is atomic when source and destination share a volume. If
/// the rename fails (typically a cross-volume move), the artifact is copied
/// to a temporary sibling of the destination, synced, renamed into place,
/// and only then is the source removed. Readers never observe a
/// half-written destination.
pub async fn publish(artifact: &Path, destination: &Path) -> io::Result<()> {
    if fs::rename(artifact, destination).await.is_ok() {
        return Ok(());
    }

    let temp = temp_sibling(destination);
    if let Err(e) = copy_into_place(artifact, &temp, destination).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }
    fs::remove_file(artifact).await?;
    Ok(())
}

/// Build a unique temp name next to the destination so the final move is a
/// same-volume rename.
fn temp_sibling(destination: &Path) -> PathBuf {
    let temp_name = format!(".tmp.{}", Uuid::new_v4());
    destination.with_file_name(
        destination
            .file_name()
            .map(|n| format!("{}{temp_name}", n.to_string_lossy()))
            .unwrap_or(temp_name),
    )
}

async fn copy_into_place(artifact: &Path, temp: &Path, destination: &Path) -> io::Result<()> {
    fs::copy(artifact, temp).await?;
    let file = fs::File::open(temp).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp, destination).await
}
