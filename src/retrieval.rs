//! Retrieval of converted artifacts for the caller's current batch.
//!
//! Lookups go through the session binding; nothing here mutates the store.
//! Archives are built entirely in memory and are either complete or not
//! produced at all.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use imageforged_common::paths::split_extension;
use imageforged_common::{ArtifactId, BatchId, Error, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::store::{Artifact, ResultStore};

/// A ready-to-send ZIP archive.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Download name, e.g. `converted_images_20240101_120000.zip`.
    pub name: String,
    pub data: Bytes,
}

/// Fetch one artifact from the batch bound to the caller's session.
pub fn get_one(
    store: &ResultStore,
    binding: Option<BatchId>,
    artifact_id: ArtifactId,
) -> Result<Arc<Artifact>> {
    let batch_id = binding.ok_or(Error::NoSession)?;
    store.find_artifact(batch_id, artifact_id)
}

/// Bundle every artifact of the bound batch into a ZIP archive.
pub fn get_archive(store: &ResultStore, binding: Option<BatchId>) -> Result<Archive> {
    let batch_id = binding.ok_or(Error::NoSession)?;
    let artifacts = store.get(batch_id)?;
    if artifacts.is_empty() {
        return Err(Error::EmptyBatch);
    }

    let (data, entries) = build_zip(&artifacts)?;
    let name = archive_name(Utc::now());

    tracing::info!(
        batch_id = %batch_id,
        entries = entries.len(),
        bytes = data.len(),
        archive = %name,
        "Built download archive"
    );

    Ok(Archive {
        name,
        data: Bytes::from(data),
    })
}

/// Write artifacts into a deflate-compressed ZIP.
///
/// Duplicate filenames get a ` (n)` suffix before the extension so every
/// artifact gets its own entry. Entry timestamps are fixed, so the same
/// artifacts always produce the same archive bytes.
pub fn build_zip(artifacts: &[Arc<Artifact>]) -> Result<(Vec<u8>, Vec<String>)> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut used = HashSet::new();
    let mut entries = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let entry_name = unique_entry_name(&artifact.filename, &mut used);
        writer
            .start_file(entry_name.as_str(), options)
            .map_err(|e| Error::internal(format!("failed to start archive entry: {e}")))?;
        writer
            .write_all(&artifact.data)
            .map_err(|e| Error::internal(format!("failed to write archive entry: {e}")))?;
        entries.push(entry_name);
    }

    let cursor = writer
        .finish()
        .map_err(|e| Error::internal(format!("failed to finish archive: {e}")))?;

    Ok((cursor.into_inner(), entries))
}

fn unique_entry_name(filename: &str, used: &mut HashSet<String>) -> String {
    if used.insert(filename.to_string()) {
        return filename.to_string();
    }

    let (stem, ext) = split_extension(filename);
    let mut n = 1;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Timestamped archive download name.
pub fn archive_name(now: DateTime<Utc>) -> String {
    format!("converted_images_{}.zip", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use std::io::Read;

    fn artifact(name: &str, body: &[u8]) -> Artifact {
        Artifact {
            id: ArtifactId::new(),
            filename: name.to_string(),
            data: Bytes::copy_from_slice(body),
            mime_type: "image/png".to_string(),
        }
    }

    fn read_entries(data: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut body = Vec::new();
                file.read_to_end(&mut body).unwrap();
                (file.name().to_string(), body)
            })
            .collect()
    }

    #[test]
    fn get_one_without_session() {
        let store = ResultStore::default();
        assert_matches!(get_one(&store, None, ArtifactId::new()), Err(Error::NoSession));
    }

    #[test]
    fn get_one_finds_artifact() {
        let store = ResultStore::default();
        let batch_id = store.create_batch();
        let a = artifact("a.png", b"aaa");
        let id = a.id;
        store.append(batch_id, a).unwrap();

        let found = get_one(&store, Some(batch_id), id).unwrap();
        assert_eq!(found.data.as_ref(), b"aaa");
        assert_matches!(
            get_one(&store, Some(batch_id), ArtifactId::new()),
            Err(Error::NotFound(_))
        );
    }

    #[test]
    fn archive_without_session_or_batch() {
        let store = ResultStore::default();
        assert_matches!(get_archive(&store, None), Err(Error::NoSession));
        assert_matches!(
            get_archive(&store, Some(BatchId::new())),
            Err(Error::NotFound(_))
        );
    }

    #[test]
    fn archive_of_empty_batch() {
        let store = ResultStore::default();
        let batch_id = store.create_batch();
        assert_matches!(get_archive(&store, Some(batch_id)), Err(Error::EmptyBatch));
    }

    #[test]
    fn archive_contains_every_artifact() {
        let store = ResultStore::default();
        let batch_id = store.create_batch();
        store.append(batch_id, artifact("a_converted.png", b"one")).unwrap();
        store.append(batch_id, artifact("b_converted.png", b"two")).unwrap();

        let archive = get_archive(&store, Some(batch_id)).unwrap();
        assert!(archive.name.starts_with("converted_images_"));
        assert!(archive.name.ends_with(".zip"));

        let entries = read_entries(&archive.data);
        assert_eq!(
            entries,
            vec![
                ("a_converted.png".to_string(), b"one".to_vec()),
                ("b_converted.png".to_string(), b"two".to_vec()),
            ]
        );
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let artifacts: Vec<_> = [
            artifact("x_converted.jpg", b"1"),
            artifact("x_converted.jpg", b"2"),
            artifact("x_converted.jpg", b"3"),
            artifact("noext", b"4"),
            artifact("noext", b"5"),
        ]
        .into_iter()
        .map(Arc::new)
        .collect();

        let (data, names) = build_zip(&artifacts).unwrap();
        assert_eq!(
            names,
            [
                "x_converted.jpg",
                "x_converted (1).jpg",
                "x_converted (2).jpg",
                "noext",
                "noext (1)",
            ]
        );

        let entries = read_entries(&data);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[2].1, b"3");
    }

    #[test]
    fn suffix_skips_names_already_taken() {
        let mut used = HashSet::new();
        assert_eq!(unique_entry_name("a (1).png", &mut used), "a (1).png");
        assert_eq!(unique_entry_name("a.png", &mut used), "a.png");
        assert_eq!(unique_entry_name("a.png", &mut used), "a (2).png");
    }

    #[test]
    fn repeated_archives_are_identical() {
        let artifacts = vec![Arc::new(artifact("a.png", b"payload"))];
        let (first, _) = build_zip(&artifacts).unwrap();
        let (second, _) = build_zip(&artifacts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn archive_name_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(archive_name(ts), "converted_images_20240309_070501.zip");
    }
}
