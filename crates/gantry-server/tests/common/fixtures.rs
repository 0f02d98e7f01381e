//! Request builders and polling helpers shared by integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::path::Path;
use std::time::Duration;
use tower::ServiceExt;

/// The shared secret used by `AppConfig::for_testing`.
#[allow(dead_code)]
pub const TEST_SECRET: &str = "test-secret";

/// Build an embedded-token `Package` header value with the test secret.
#[allow(dead_code)]
pub fn embedded_meta(package: &str, sequence: u32, total: u32, checksum: &str) -> String {
    format!("{package}/{TEST_SECRET}/{sequence}/{total}/{checksum}")
}

/// Build a header-secret `Package` header value (no token segment).
#[allow(dead_code)]
pub fn header_meta(package: &str, sequence: u32, total: u32, checksum: &str) -> String {
    format!("{package}/{sequence}/{total}/{checksum}")
}

/// Send a request and return its status and raw body.
#[allow(dead_code)]
pub async fn send(
    router: &axum::Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_vec())).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body_bytes.to_vec())
}

/// PUT one chunk carrying the given `Package` header value.
#[allow(dead_code)]
pub async fn put_chunk(
    router: &axum::Router,
    uri: &str,
    package_header: &str,
    body: &[u8],
) -> StatusCode {
    send(router, "PUT", uri, &[("Package", package_header)], body)
        .await
        .0
}

/// Poll until the file exists and return its contents, panicking after a
/// deadline. Assembly runs as a background continuation, so tests wait for
/// its effects instead of its completion.
#[allow(dead_code)]
pub async fn wait_for_file(path: &Path) -> Vec<u8> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Ok(data) = tokio::fs::read(path).await {
            return data;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("file did not appear in time: {}", path.display());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Poll until a merged `.artifact` file appears in the staging directory.
#[allow(dead_code)]
pub async fn wait_for_artifact(staging_dir: &Path) -> std::path::PathBuf {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Ok(entries) = std::fs::read_dir(staging_dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "artifact") {
                    return path;
                }
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("no merged artifact appeared in {}", staging_dir.display());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
