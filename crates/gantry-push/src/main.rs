//! CLI that pushes an artifact to a gantry endpoint in bounded-size chunks.
//!
//! The file is split into `ceil(size / chunk_size)` chunks and sent as one
//! PUT per chunk, every request carrying the same package id and the
//! checksum of the whole file. Any non-201 response aborts the transfer;
//! there is no partial-retry logic.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use gantry_core::checksum::{ArtifactHasher, DeclaredChecksum};
use gantry_core::meta::{AuthPlacement, PackageId, PackageMeta};
use gantry_core::{DEFAULT_CHUNK_SIZE, PACKAGE_HEADER, SECRET_HEADER};
use reqwest::StatusCode;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

/// Push an artifact to a gantry deployment endpoint in bounded-size chunks
#[derive(Parser, Debug)]
#[command(name = "gantry-push")]
#[command(version, about, long_about = None)]
struct Args {
    /// Deployment endpoint URL
    url: String,

    /// Artifact file to push
    file: PathBuf,

    /// Shared secret configured on the receiving side
    #[arg(long, env = "GANTRY_SECRET")]
    secret: String,

    /// Where the secret travels: embedded in the package descriptor, or in
    /// a dedicated Secret header
    #[arg(long, value_enum, default_value_t = AuthArg::Embedded)]
    auth: AuthArg,

    /// Chunk size in bytes
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AuthArg {
    Embedded,
    Header,
}

impl From<AuthArg> for AuthPlacement {
    fn from(arg: AuthArg) -> Self {
        match arg {
            AuthArg::Embedded => Self::Embedded,
            AuthArg::Header => Self::Header,
        }
    }
}

/// Number of chunks needed for a file of the given size.
fn chunk_count(file_size: u64, chunk_size: u64) -> u64 {
    file_size.div_ceil(chunk_size)
}

/// Compute the whole-file checksum, streaming through a fixed-size buffer.
async fn file_checksum(path: &std::path::Path) -> Result<String> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = ArtifactHasher::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.chunk_size == 0 {
        bail!("chunk size must be greater than zero");
    }
    let file_size = tokio::fs::metadata(&args.file)
        .await
        .with_context(|| format!("invalid path of data file: {}", args.file.display()))?
        .len();
    if file_size == 0 {
        bail!("data file is empty: {}", args.file.display());
    }

    let placement = AuthPlacement::from(args.auth);
    let checksum_hex = file_checksum(&args.file).await?;
    let checksum =
        DeclaredChecksum::parse(&checksum_hex).context("computed checksum is invalid")?;
    let package = PackageId::parse(&Uuid::new_v4().simple().to_string().to_uppercase())
        .context("generated package id is invalid")?;
    let total_u64 = chunk_count(file_size, args.chunk_size);
    let total = u32::try_from(total_u64).context("file needs more chunks than supported")?;

    println!("Destination: {}", args.url);
    println!("File:        {}", args.file.display());
    println!("Checksum:    {checksum_hex}");
    println!("Chunks:      {total}x max. {} bytes", args.chunk_size);
    println!("Package:     {package}");
    println!();

    let client = reqwest::Client::new();
    let mut file = File::open(&args.file)
        .await
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let mut remaining = file_size;

    for sequence in 1..=total {
        let len = remaining.min(args.chunk_size) as usize;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .await
            .with_context(|| format!("failed to read chunk {sequence} of {total}"))?;
        remaining -= len as u64;

        let meta = PackageMeta {
            package: package.clone(),
            token: match placement {
                AuthPlacement::Embedded => Some(args.secret.clone()),
                AuthPlacement::Header => None,
            },
            sequence,
            total,
            checksum: checksum.clone(),
        };

        let mut request = client
            .put(&args.url)
            .header(PACKAGE_HEADER, meta.header_value())
            .body(buf);
        if matches!(placement, AuthPlacement::Header) {
            request = request.header(SECRET_HEADER, &args.secret);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("chunk {sequence} of {total} failed to send"))?;
        let status = response.status();
        if status != StatusCode::CREATED {
            bail!("chunk {sequence} of {total} failed (status {status})");
        }
        println!("chunk {sequence} of {total} complete (status {status})");
    }

    Ok(())
}
