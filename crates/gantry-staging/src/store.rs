//! Namespaced chunk staging, merging, and expiration sweeping.

use crate::error::{StagingError, StagingResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use gantry_core::{ArtifactHasher, InstanceId, PackageId};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Buffer size for streaming merges and checksums (64 KiB).
const STREAM_BUF_SIZE: usize = 64 * 1024;

/// Extension of a chunk file still being written.
const PART_EXT: &str = "part";
/// Extension of a fully received chunk file.
const CHUNK_EXT: &str = "chunk";
/// Extension of a merged artifact awaiting verification and publish.
const ARTIFACT_EXT: &str = "artifact";

/// Separator between the instance identity and the package id in staged
/// filenames.
const NAMESPACE_SEPARATOR: &str = "---";

/// Filesystem-backed chunk store namespaced by instance identity.
///
/// A chunk file passes through two names: `<prefix>_<seq>.part` while the
/// request body is still streaming in, then `<prefix>_<seq>.chunk` once
/// fully written, switched by an atomic rename. Only `.chunk` files count
/// toward completion, so concurrent requests observe completed uploads only.
pub struct StagingStore {
    root: PathBuf,
    instance: InstanceId,
}

impl StagingStore {
    /// Open a staging store rooted at the given directory, creating the
    /// directory if necessary.
    pub async fn open(root: impl AsRef<Path>, instance: InstanceId) -> StagingResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root, instance })
    }

    /// The instance identity this store is namespaced under.
    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    /// The staging directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn package_prefix(&self, package: &PackageId) -> String {
        format!(
            "{}{NAMESPACE_SEPARATOR}{}",
            self.instance.as_str(),
            package.as_str()
        )
    }

    fn part_path(&self, package: &PackageId, sequence: u32) -> PathBuf {
        self.root
            .join(format!("{}_{sequence}.{PART_EXT}", self.package_prefix(package)))
    }

    fn chunk_path(&self, package: &PackageId, sequence: u32) -> PathBuf {
        self.root
            .join(format!("{}_{sequence}.{CHUNK_EXT}", self.package_prefix(package)))
    }

    fn artifact_path(&self, package: &PackageId) -> PathBuf {
        self.root
            .join(format!("{}.{ARTIFACT_EXT}", self.package_prefix(package)))
    }

    /// Stream one chunk body into the store.
    ///
    /// Fails with [`StagingError::Conflict`] if a chunk with the same
    /// sequence number is already staged in either state; an existing file
    /// is never overwritten. A body that errors mid-stream leaves its
    /// `.part` file behind (blocking resends until the sweeper reclaims it,
    /// matching the no-renegotiation rule). On success the chunk becomes
    /// visible to completion checks atomically via rename.
    pub async fn stage_chunk<S, E>(
        &self,
        package: &PackageId,
        sequence: u32,
        mut body: S,
    ) -> StagingResult<()>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let part = self.part_path(package, sequence);
        let chunk = self.chunk_path(package, sequence);
        if fs::try_exists(&part).await? || fs::try_exists(&chunk).await? {
            return Err(StagingError::Conflict {
                package: package.clone(),
                sequence,
            });
        }

        let mut file = fs::File::create(&part).await?;
        while let Some(frame) = body.next().await {
            let data = frame.map_err(|e| StagingError::Io(io::Error::other(e)))?;
            file.write_all(&data).await?;
        }
        file.sync_all().await?;
        drop(file);
        fs::rename(&part, &chunk).await?;
        Ok(())
    }

    /// Check whether every chunk in `1..=total` has been fully received.
    pub async fn is_complete(&self, package: &PackageId, total: u32) -> StagingResult<bool> {
        for sequence in 1..=total {
            if !fs::try_exists(&self.chunk_path(package, sequence)).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Concatenate all received chunks in ascending sequence order into a
    /// single artifact file, streaming through a fixed-size buffer.
    ///
    /// The per-sequence chunk files are deleted whether or not concatenation
    /// succeeds; once a merge is attempted the chunk set is spent. Returns
    /// the artifact path.
    pub async fn merge(&self, package: &PackageId, total: u32) -> StagingResult<PathBuf> {
        let artifact = self.artifact_path(package);
        let result = self.concat_chunks(package, total, &artifact).await;
        for sequence in 1..=total {
            if let Err(e) = fs::remove_file(self.chunk_path(package, sequence)).await {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        package = %package,
                        sequence,
                        error = %e,
                        "failed to remove merged chunk file"
                    );
                }
            }
        }
        result.map(|()| artifact)
    }

    async fn concat_chunks(
        &self,
        package: &PackageId,
        total: u32,
        artifact: &Path,
    ) -> StagingResult<()> {
        let mut out = fs::File::create(artifact).await?;
        let mut buf = vec![0u8; STREAM_BUF_SIZE];
        for sequence in 1..=total {
            let mut chunk = fs::File::open(self.chunk_path(package, sequence)).await?;
            loop {
                let n = chunk.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                out.write_all(&buf[..n]).await?;
            }
        }
        out.sync_all().await?;
        Ok(())
    }

    /// Compute the hex checksum of a file, streaming through a fixed-size
    /// buffer so the artifact is never held in memory.
    pub async fn artifact_checksum(&self, artifact: &Path) -> StagingResult<String> {
        let mut file = fs::File::open(artifact).await?;
        let mut hasher = ArtifactHasher::new();
        let mut buf = vec![0u8; STREAM_BUF_SIZE];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize_hex())
    }

    /// Delete staged files owned by this instance whose modification time is
    /// older than the given window. Returns how many files were removed.
    ///
    /// The sweep is not synchronized with staging or merging; the window
    /// must exceed realistic in-flight durations. Files belonging to other
    /// instances sharing the directory are never touched.
    pub async fn sweep(&self, window: Duration) -> StagingResult<usize> {
        let Some(cutoff) = SystemTime::now().checked_sub(window) else {
            return Ok(0);
        };
        let prefix = format!("{}{NAMESPACE_SEPARATOR}", self.instance.as_str());
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_name().to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Ok(modified) = meta.modified() else {
                continue;
            };
            if modified <= cutoff && fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;

    fn body(frames: &[&[u8]]) -> impl Stream<Item = Result<Bytes, Infallible>> + Unpin {
        stream::iter(
            frames
                .iter()
                .map(|f| Ok(Bytes::copy_from_slice(f)))
                .collect::<Vec<_>>(),
        )
    }

    fn package(name: &str) -> PackageId {
        PackageId::parse(name).unwrap()
    }

    async fn open_store(dir: &Path) -> StagingStore {
        StagingStore::open(dir, InstanceId::generate()).await.unwrap()
    }

    #[tokio::test]
    async fn test_stage_then_resend_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let pkg = package("pkg");

        store.stage_chunk(&pkg, 1, body(&[b"data"])).await.unwrap();
        let err = store
            .stage_chunk(&pkg, 1, body(&[b"data"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::Conflict { sequence: 1, .. }));
    }

    #[tokio::test]
    async fn test_staged_chunk_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let pkg = package("pkg");

        store
            .stage_chunk(&pkg, 2, body(&[b"ab", b"cd"]))
            .await
            .unwrap();
        assert!(!fs::try_exists(&store.part_path(&pkg, 2)).await.unwrap());
        let staged = fs::read(store.chunk_path(&pkg, 2)).await.unwrap();
        assert_eq!(staged, b"abcd");
    }

    #[tokio::test]
    async fn test_failed_body_blocks_resend_until_swept() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let pkg = package("pkg");

        let broken = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::other("connection reset")),
        ]);
        assert!(store.stage_chunk(&pkg, 1, broken).await.is_err());

        // The abandoned .part file stays and blocks a resend.
        let err = store
            .stage_chunk(&pkg, 1, body(&[b"retry"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::Conflict { .. }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.sweep(Duration::from_millis(10)).await.unwrap();
        store.stage_chunk(&pkg, 1, body(&[b"retry"])).await.unwrap();
    }

    #[tokio::test]
    async fn test_is_complete_requires_every_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let pkg = package("pkg");

        store.stage_chunk(&pkg, 1, body(&[b"a"])).await.unwrap();
        store.stage_chunk(&pkg, 3, body(&[b"c"])).await.unwrap();
        assert!(!store.is_complete(&pkg, 3).await.unwrap());

        store.stage_chunk(&pkg, 2, body(&[b"b"])).await.unwrap();
        assert!(store.is_complete(&pkg, 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_merge_orders_by_sequence_and_removes_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let pkg = package("pkg");

        // Staged out of order; merge must follow sequence order.
        store.stage_chunk(&pkg, 2, body(&[b"world"])).await.unwrap();
        store.stage_chunk(&pkg, 1, body(&[b"hello "])).await.unwrap();

        let artifact = store.merge(&pkg, 2).await.unwrap();
        assert_eq!(fs::read(&artifact).await.unwrap(), b"hello world");
        assert!(!fs::try_exists(&store.chunk_path(&pkg, 1)).await.unwrap());
        assert!(!fs::try_exists(&store.chunk_path(&pkg, 2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_merge_failure_still_removes_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let pkg = package("pkg");

        store.stage_chunk(&pkg, 1, body(&[b"a"])).await.unwrap();
        // Chunk 2 missing: merge fails, but the chunk set is spent anyway.
        assert!(store.merge(&pkg, 2).await.is_err());
        assert!(!fs::try_exists(&store.chunk_path(&pkg, 1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_artifact_checksum_streams_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        let path = dir.path().join("blob");
        fs::write(&path, b"abc").await.unwrap();
        assert_eq!(
            store.artifact_checksum(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_sweep_only_touches_own_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let pkg = package("pkg");

        store.stage_chunk(&pkg, 1, body(&[b"old"])).await.unwrap();
        let foreign = dir.path().join("OTHERINSTANCE---pkg_1.chunk");
        fs::write(&foreign, b"not ours").await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let removed = store.sweep(Duration::from_millis(10)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!fs::try_exists(&store.chunk_path(&pkg, 1)).await.unwrap());
        assert!(fs::try_exists(&foreign).await.unwrap());

        // A fresh file survives a sweep with a generous window.
        store.stage_chunk(&pkg, 2, body(&[b"new"])).await.unwrap();
        let removed = store.sweep(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 0);
        assert!(fs::try_exists(&store.chunk_path(&pkg, 2)).await.unwrap());
    }
}
