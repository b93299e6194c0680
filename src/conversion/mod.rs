//! Image conversion module.
//!
//! Turns uploaded images into one of the supported output formats:
//!
//! - [`format`]: the fixed format policy (names, encode parameters, extensions)
//! - [`converter`]: single-image decode → flatten → encode → preview
//! - [`batch`]: bulk conversion into a fresh result-store batch
//! - [`files`]: offline conversion of files on disk
//!
//! Conversion is synchronous and CPU-bound; async callers should run it on a
//! blocking thread.

pub mod batch;
pub mod converter;
pub mod files;
pub mod format;

pub use batch::{convert_batch, BatchSummary, ItemResult, UploadedFile};
pub use converter::{ConversionOutcome, ConvertedImage, Converter};
pub use files::{convert_file, WrittenFile};
pub use format::{resolve_format, EncodeParams, FormatSpec, OutputFormat};
