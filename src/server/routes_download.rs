//! Retrieval endpoints for the caller's current batch.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use imageforged_common::{ArtifactId, Error};

use super::error::ApiError;
use super::session::current_batch;
use super::AppContext;
use crate::retrieval;

pub fn download_routes() -> Router<AppContext> {
    Router::new()
        .route("/download/:artifact_id", get(download_one))
        .route("/download-zip", get(download_zip))
}

/// Download a single converted image.
#[utoipa::path(
    get,
    path = "/download/{artifact_id}",
    tag = "downloads",
    params(
        ("artifact_id" = String, Path, description = "Artifact id from a conversion result")
    ),
    responses(
        (
            status = 200,
            description = "Converted image as an attachment",
            body = Vec<u8>,
            content_type = "application/octet-stream"
        ),
        (status = 404, description = "No session, unknown artifact, or batch expired")
    )
)]
pub async fn download_one(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Path(artifact_id): Path<String>,
) -> Result<Response, ApiError> {
    let artifact_id: ArtifactId = artifact_id
        .parse()
        .map_err(|_| Error::not_found(format!("artifact {artifact_id}")))?;

    let binding = current_batch(&jar, &ctx.sessions);
    let artifact = retrieval::get_one(&ctx.store, binding, artifact_id)?;

    tracing::debug!(artifact_id = %artifact.id, filename = %artifact.filename, "Serving artifact");

    Ok(attachment(
        artifact.mime_type.clone(),
        &artifact.filename,
        artifact.data.clone(),
    ))
}

/// Download every image of the current batch as a ZIP archive.
#[utoipa::path(
    get,
    path = "/download-zip",
    tag = "downloads",
    responses(
        (
            status = 200,
            description = "ZIP archive of the current batch",
            body = Vec<u8>,
            content_type = "application/zip"
        ),
        (status = 404, description = "No session, batch expired, or nothing converted")
    )
)]
pub async fn download_zip(
    State(ctx): State<AppContext>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let binding = current_batch(&jar, &ctx.sessions);
    let store = ctx.store.clone();
    let archive = tokio::task::spawn_blocking(move || retrieval::get_archive(&store, binding))
        .await
        .map_err(|e| Error::internal(format!("archive task failed: {e}")))??;

    Ok(attachment(
        "application/zip".to_string(),
        &archive.name,
        archive.data,
    ))
}

fn attachment(content_type: String, filename: &str, body: bytes::Bytes) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
