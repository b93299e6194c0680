//! Offline conversion of local files, used by the `convert` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::converter::{decoded_dimensions, ConversionOutcome, Converter};
use super::format::OutputFormat;

/// A file written by [`convert_file`].
#[derive(Debug, Clone)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// Convert `input` to `format` and write `<stem>_converted.<ext>` into `output_dir`.
///
/// The output directory is created if missing. An existing file with the same
/// name is overwritten.
pub fn convert_file(
    converter: &Converter,
    input: &Path,
    format: OutputFormat,
    output_dir: &Path,
) -> Result<WrittenFile> {
    let data = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let original_filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let converted = match converter.convert(&data, format, &original_filename) {
        ConversionOutcome::Success(converted) => converted,
        ConversionOutcome::Failure { error, .. } => {
            anyhow::bail!("{:?}: {}", input, error);
        }
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
    let path = output_dir.join(&converted.filename);
    std::fs::write(&path, &converted.data)
        .with_context(|| format!("Failed to write {:?}", path))?;

    let (width, height) = decoded_dimensions(&data)?;
    tracing::debug!(input = ?input, output = ?path, width, height, "Converted file");

    Ok(WrittenFile {
        path,
        width,
        height,
        bytes: converted.data.len(),
    })
}
