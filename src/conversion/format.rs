//! Output format policy.
//!
//! Maps a requested format name onto a fixed, immutable parameter record.
//! Encode parameters are not user-configurable.

use std::fmt;

use imageforged_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl OutputFormat {
    /// Canonical upper-case name (`JPEG`, `PNG`, `WEBP`, `AVIF`).
    pub fn canonical_name(self) -> &'static str {
        self.spec().canonical_name
    }

    /// The parameter record for this format.
    pub fn spec(self) -> &'static FormatSpec {
        match self {
            Self::Jpeg => &FORMAT_TABLE[0],
            Self::Png => &FORMAT_TABLE[1],
            Self::Webp => &FORMAT_TABLE[2],
            Self::Avif => &FORMAT_TABLE[3],
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Encoder knobs for one format. `None` means the encoder has no such knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub quality: Option<u8>,
    pub lossless: Option<bool>,
    pub optimize: bool,
}

/// Everything the converter needs to know about an output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub format: OutputFormat,
    pub canonical_name: &'static str,
    pub params: EncodeParams,
    /// Extension including the leading dot.
    pub extension: &'static str,
    pub mime_type: &'static str,
    pub supports_alpha: bool,
}

static FORMAT_TABLE: [FormatSpec; 4] = [
    FormatSpec {
        format: OutputFormat::Jpeg,
        canonical_name: "JPEG",
        params: EncodeParams {
            quality: Some(95),
            lossless: None,
            optimize: true,
        },
        extension: ".jpg",
        mime_type: "image/jpeg",
        supports_alpha: false,
    },
    FormatSpec {
        format: OutputFormat::Png,
        canonical_name: "PNG",
        params: EncodeParams {
            quality: None,
            lossless: None,
            optimize: true,
        },
        extension: ".png",
        mime_type: "image/png",
        supports_alpha: true,
    },
    FormatSpec {
        format: OutputFormat::Webp,
        canonical_name: "WEBP",
        params: EncodeParams {
            quality: Some(95),
            lossless: Some(false),
            optimize: false,
        },
        extension: ".webp",
        mime_type: "image/webp",
        supports_alpha: true,
    },
    FormatSpec {
        format: OutputFormat::Avif,
        canonical_name: "AVIF",
        params: EncodeParams {
            quality: Some(95),
            lossless: None,
            optimize: false,
        },
        extension: ".avif",
        mime_type: "image/avif",
        supports_alpha: true,
    },
];

/// Resolve a requested format name (case-insensitive, `JPG` aliases `JPEG`).
pub fn resolve_format(name: &str) -> Result<&'static FormatSpec> {
    let format = match name.trim().to_uppercase().as_str() {
        "JPEG" | "JPG" => OutputFormat::Jpeg,
        "PNG" => OutputFormat::Png,
        "WEBP" => OutputFormat::Webp,
        "AVIF" => OutputFormat::Avif,
        _ => return Err(Error::unsupported_format(name.trim())),
    };
    Ok(format.spec())
}

/// File extension for a format name, `.jpg` when the name is unknown.
///
/// Only used when naming output; callers validate with [`resolve_format`] first.
pub fn extension_for(name: &str) -> &'static str {
    resolve_format(name).map(|spec| spec.extension).unwrap_or(".jpg")
}

/// All supported formats in table order.
pub fn supported_formats() -> impl Iterator<Item = &'static FormatSpec> {
    FORMAT_TABLE.iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn resolves_canonical_names_and_alias() {
        assert_eq!(resolve_format("JPEG").unwrap().format, OutputFormat::Jpeg);
        assert_eq!(resolve_format("jpg").unwrap().format, OutputFormat::Jpeg);
        assert_eq!(resolve_format(" png ").unwrap().format, OutputFormat::Png);
        assert_eq!(resolve_format("WebP").unwrap().format, OutputFormat::Webp);
        assert_eq!(resolve_format("avif").unwrap().format, OutputFormat::Avif);
    }

    #[test]
    fn rejects_unknown_formats() {
        assert_matches!(
            resolve_format("gif"),
            Err(Error::UnsupportedFormat(name)) if name == "gif"
        );
        assert_matches!(resolve_format(""), Err(Error::UnsupportedFormat(_)));
    }

    #[test]
    fn extension_map() {
        assert_eq!(extension_for("JPEG"), ".jpg");
        assert_eq!(extension_for("JPG"), ".jpg");
        assert_eq!(extension_for("PNG"), ".png");
        assert_eq!(extension_for("WEBP"), ".webp");
        assert_eq!(extension_for("AVIF"), ".avif");
        assert_eq!(extension_for("TIFF"), ".jpg");
    }

    #[test]
    fn jpg_alias_normalizes_mime_type() {
        assert_eq!(resolve_format("JPG").unwrap().mime_type, "image/jpeg");
    }

    #[test]
    fn mime_type_is_lowercase_canonical_name() {
        for spec in supported_formats() {
            let expected = format!("image/{}", spec.canonical_name.to_lowercase());
            assert_eq!(spec.mime_type, expected);
        }
    }

    #[test]
    fn table_is_keyed_by_format() {
        for spec in supported_formats() {
            assert_eq!(spec.format.spec(), spec);
        }
    }

    #[test]
    fn fixed_encode_params() {
        let jpeg = resolve_format("JPEG").unwrap().params;
        assert_eq!(jpeg.quality, Some(95));
        assert!(jpeg.optimize);

        let png = resolve_format("PNG").unwrap().params;
        assert_eq!(png.quality, None);
        assert!(png.optimize);

        let webp = resolve_format("WEBP").unwrap().params;
        assert_eq!(webp.quality, Some(95));
        assert_eq!(webp.lossless, Some(false));

        assert_eq!(resolve_format("AVIF").unwrap().params.quality, Some(95));
        assert!(!resolve_format("JPEG").unwrap().supports_alpha);
    }
}
