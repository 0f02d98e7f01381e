//! Chunk reception pipeline.

use crate::assembly;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use gantry_core::meta::{AuthPlacement, PackageMeta};
use gantry_core::{PACKAGE_HEADER, SECRET_HEADER};

/// PUT on the configured path - receive one chunk of a package.
///
/// The response reports only the fate of this chunk: 201 when staged, 400
/// for missing or malformed metadata, 423 when the same chunk is already
/// staged. It says nothing about overall transfer progress, checksum
/// outcome, or the post-publish command - none of that is known yet.
/// Requests that fail authentication get a bare 404, as if the endpoint did
/// not exist.
pub async fn receive(State(state): State<AppState>, req: Request) -> ApiResult<StatusCode> {
    let outcome = receive_chunk(&state, req).await;

    // The sweeper runs at the end of every authenticated request, whatever
    // the chunk outcome. Auth rejection stays silent end to end.
    if !matches!(outcome, Err(ApiError::PassThrough)) {
        if let Some(window) = state.config.deploy.expiration() {
            if let Err(e) = state.staging.sweep(window).await {
                tracing::warn!(error = %e, "staging sweep failed");
            }
        }
    }

    outcome
}

async fn receive_chunk(state: &AppState, req: Request) -> ApiResult<StatusCode> {
    if req.method() != Method::PUT {
        return Err(ApiError::PassThrough);
    }

    let deploy = &state.config.deploy;
    let header = req
        .headers()
        .get(PACKAGE_HEADER)
        .and_then(|v| v.to_str().ok());

    let meta = match deploy.auth {
        AuthPlacement::Header => {
            let secret = req
                .headers()
                .get(SECRET_HEADER)
                .and_then(|v| v.to_str().ok());
            if secret != Some(deploy.secret.as_str()) {
                return Err(ApiError::PassThrough);
            }
            PackageMeta::parse(header, AuthPlacement::Header)?
        }
        AuthPlacement::Embedded => {
            let meta = PackageMeta::parse(header, AuthPlacement::Embedded)?;
            if meta.token.as_deref() != Some(deploy.secret.as_str()) {
                return Err(ApiError::PassThrough);
            }
            meta
        }
    };

    let body = req.into_body().into_data_stream();
    state
        .staging
        .stage_chunk(&meta.package, meta.sequence, body)
        .await?;

    tracing::debug!(
        package = %meta.package,
        sequence = meta.sequence,
        total = meta.total,
        "chunk staged"
    );

    // Completion detection is a separate continuation sharing only the
    // staging directory with this request; its failures are visible only on
    // this side of the transfer.
    tokio::spawn(assembly::assemble(state.clone(), meta));

    Ok(StatusCode::CREATED)
}
