//! Bulk conversion endpoint.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use imageforged_common::Error;
use utoipa::ToSchema;

use super::error::ApiError;
use super::session;
use super::AppContext;
use crate::conversion::{convert_batch, resolve_format, BatchSummary, UploadedFile};

pub fn convert_routes() -> Router<AppContext> {
    Router::new().route("/convert", post(convert))
}

/// Multipart form accepted by `POST /convert` (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ConvertForm {
    /// One or more images (field name `files`; `file` is also accepted).
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Vec<Vec<u8>>,
    /// Target format: JPEG, JPG, PNG, WEBP or AVIF. Defaults to the configured format.
    format: Option<String>,
}

/// Raw multipart contents before validation.
struct ConvertUpload {
    files: Vec<UploadedFile>,
    format: Option<String>,
}

/// Convert a batch of uploaded images.
///
/// Creates a new batch, binds it to the caller's session (replacing any
/// previous one) and returns one result per uploaded file.
#[utoipa::path(
    post,
    path = "/convert",
    tag = "conversion",
    request_body(content = ConvertForm, content_type = "multipart/form-data"),
    responses(
        (
            status = 200,
            description = "Batch converted (individual items may have failed)",
            body = BatchSummary
        ),
        (status = 400, description = "No files uploaded or invalid output format"),
        (status = 413, description = "Upload exceeds the configured size limit")
    )
)]
pub async fn convert(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<(CookieJar, Json<BatchSummary>), ApiError> {
    let limit = ctx.config.server.max_upload_bytes;
    let upload = read_upload(multipart, limit).await?;

    let requested = upload
        .format
        .unwrap_or_else(|| ctx.config.conversion.default_format.clone());
    let format = resolve_format(&requested)?.format;

    let store = ctx.store.clone();
    let converter = ctx.converter;
    let summary = tokio::task::spawn_blocking(move || {
        convert_batch(&store, &converter, upload.files, format)
    })
    .await
    .map_err(|e| Error::internal(format!("conversion task failed: {e}")))??;

    let (jar, session_id) = session::ensure_session(jar, ctx.config.server.session_timeout_hours);
    ctx.sessions.bind(session_id, summary.batch_id);

    Ok((jar, Json(summary)))
}

async fn read_upload(mut multipart: Multipart, limit: usize) -> Result<ConvertUpload, Error> {
    let mut files = Vec::new();
    let mut format = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        match field.name().unwrap_or_default() {
            "files" | "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                files.push(UploadedFile::new(filename, content_type, data));
            }
            "format" => {
                let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
                let value = value.trim();
                if !value.is_empty() {
                    format = Some(value.to_string());
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unexpected multipart field");
            }
        }
    }

    Ok(ConvertUpload { files, format })
}

fn multipart_error(e: MultipartError, limit: usize) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit }
    } else {
        Error::invalid_input(e.body_text())
    }
}
