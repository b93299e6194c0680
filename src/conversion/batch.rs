//! Bulk conversion of an uploaded file set.
//!
//! Items are converted one by one in upload order. A failing item produces
//! a failure record and never affects its siblings; only a request with no
//! usable files at all is rejected up front.

use bytes::Bytes;
use imageforged_common::paths::is_allowed_upload;
use imageforged_common::{ArtifactId, BatchId, Error, Result};
use serde::Serialize;
use utoipa::ToSchema;

use super::converter::{ConversionOutcome, Converter};
use super::format::OutputFormat;
use crate::store::{Artifact, ResultStore};

pub const DISALLOWED_TYPE_MESSAGE: &str =
    "Invalid file type. Only AVIF, PNG, JPG, JPEG, and WebP are allowed.";

/// One uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    /// Content type declared by the client, not sniffed.
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// Per-item entry in a batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub success: bool,
    pub original_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_filename: Option<String>,
    /// Base64 JPEG thumbnail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub artifact_id: Option<ArtifactId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemResult {
    fn converted(
        original_filename: String,
        converted_filename: String,
        preview: String,
        artifact_id: ArtifactId,
    ) -> Self {
        Self {
            success: true,
            original_filename,
            converted_filename: Some(converted_filename),
            preview: Some(preview),
            artifact_id: Some(artifact_id),
            error: None,
        }
    }

    fn failed(original_filename: String, error: impl Into<String>) -> Self {
        Self {
            success: false,
            original_filename,
            converted_filename: None,
            preview: None,
            artifact_id: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a whole bulk-conversion request.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    #[schema(value_type = String, format = Uuid)]
    pub batch_id: BatchId,
    pub total_files: usize,
    pub successful_conversions: usize,
    pub results: Vec<ItemResult>,
}

/// Convert every usable item in `items` into a brand-new batch in `store`.
///
/// Items with an empty filename are ignored. Returns `InvalidInput` when no
/// item remains.
pub fn convert_batch(
    store: &ResultStore,
    converter: &Converter,
    items: Vec<UploadedFile>,
    format: OutputFormat,
) -> Result<BatchSummary> {
    let items: Vec<UploadedFile> = items
        .into_iter()
        .filter(|item| !item.filename.is_empty())
        .collect();

    if items.is_empty() {
        return Err(Error::invalid_input("No files uploaded"));
    }

    let batch_id = store.create_batch();
    tracing::info!(
        batch_id = %batch_id,
        files = items.len(),
        format = %format,
        "Starting batch conversion"
    );

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        results.push(convert_item(store, converter, batch_id, item, format));
    }

    let successful_conversions = results.iter().filter(|r| r.success).count();
    tracing::info!(
        batch_id = %batch_id,
        total = results.len(),
        succeeded = successful_conversions,
        failed = results.len() - successful_conversions,
        "Batch conversion finished"
    );

    Ok(BatchSummary {
        batch_id,
        total_files: results.len(),
        successful_conversions,
        results,
    })
}

fn convert_item(
    store: &ResultStore,
    converter: &Converter,
    batch_id: BatchId,
    item: UploadedFile,
    format: OutputFormat,
) -> ItemResult {
    if !is_allowed_upload(&item.filename, &item.content_type) {
        tracing::debug!(
            filename = %item.filename,
            content_type = %item.content_type,
            "Rejected upload outside the allow-list"
        );
        return ItemResult::failed(item.filename, DISALLOWED_TYPE_MESSAGE);
    }

    match converter.convert(&item.data, format, &item.filename) {
        ConversionOutcome::Success(converted) => {
            let artifact_id = ArtifactId::new();
            let artifact = Artifact {
                id: artifact_id,
                filename: converted.filename.clone(),
                data: converted.data,
                mime_type: converted.mime_type.to_string(),
            };

            match store.append(batch_id, artifact) {
                Ok(()) => ItemResult::converted(
                    item.filename,
                    converted.filename,
                    converted.preview,
                    artifact_id,
                ),
                Err(e) => {
                    tracing::warn!(batch_id = %batch_id, "Failed to store artifact: {e}");
                    ItemResult::failed(item.filename, e.to_string())
                }
            }
        }
        ConversionOutcome::Failure {
            original_filename,
            error,
        } => ItemResult::failed(original_filename, error),
    }
}
