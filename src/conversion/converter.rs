//! Single-image conversion.
//!
//! Decodes one uploaded payload, flattens transparency when the target
//! cannot carry it, encodes with the fixed per-format parameters, and renders
//! a small JPEG preview. Every failure is folded into
//! [`ConversionOutcome::Failure`]; nothing here touches the filesystem.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use imageforged_common::paths::{secure_filename, split_extension};
use imageforged_common::{Error, Result};

use super::format::{FormatSpec, OutputFormat};
use crate::config::ConversionConfig;

/// ravif speed setting; 1 is slowest/best, 10 fastest.
const AVIF_SPEED: u8 = 6;

/// A successfully converted image.
#[derive(Debug, Clone)]
pub struct ConvertedImage {
    /// Output filename (`<sanitized stem>_converted<ext>`).
    pub filename: String,
    pub data: Bytes,
    pub mime_type: &'static str,
    /// Base64-encoded JPEG thumbnail.
    pub preview: String,
}

/// Result of converting one upload.
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    Success(ConvertedImage),
    Failure {
        original_filename: String,
        error: String,
    },
}

/// Converts single images; cheap to clone and share across blocking tasks.
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    preview_max_dimension: u32,
    preview_quality: u8,
}

impl Converter {
    pub fn new(preview_max_dimension: u32, preview_quality: u8) -> Self {
        Self {
            preview_max_dimension,
            preview_quality,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.preview_max_dimension, config.preview_quality)
    }

    /// Convert `data` to `format`, naming the result after `original_filename`.
    pub fn convert(
        &self,
        data: &[u8],
        format: OutputFormat,
        original_filename: &str,
    ) -> ConversionOutcome {
        match self.try_convert(data, format.spec(), original_filename) {
            Ok(converted) => {
                tracing::debug!(
                    original = original_filename,
                    filename = %converted.filename,
                    format = %format,
                    input_bytes = data.len(),
                    output_bytes = converted.data.len(),
                    "Converted image"
                );
                ConversionOutcome::Success(converted)
            }
            Err(e) => {
                tracing::debug!(
                    original = original_filename,
                    format = %format,
                    "Conversion failed: {e}"
                );
                ConversionOutcome::Failure {
                    original_filename: original_filename.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    fn try_convert(
        &self,
        data: &[u8],
        spec: &FormatSpec,
        original_filename: &str,
    ) -> Result<ConvertedImage> {
        let decoded = decode_image(data)?;

        let img = if spec.supports_alpha {
            decoded
        } else {
            DynamicImage::ImageRgb8(flatten_onto_white(&decoded))
        };

        let encoded = encode(&img, spec)?;
        let preview = self.render_preview(&img)?;

        Ok(ConvertedImage {
            filename: converted_filename(original_filename, spec),
            data: Bytes::from(encoded),
            mime_type: spec.mime_type,
            preview,
        })
    }

    /// Downscale (never upscale) to fit the preview box and encode as base64 JPEG.
    fn render_preview(&self, img: &DynamicImage) -> Result<String> {
        let max = self.preview_max_dimension;
        let thumb = if img.width() > max || img.height() > max {
            img.resize(max, max, FilterType::Lanczos3)
        } else {
            img.clone()
        };

        let rgb = flatten_onto_white(&thumb);
        let mut buf = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, self.preview_quality))
            .map_err(|e| Error::codec(format!("preview: {e}")))?;

        Ok(STANDARD.encode(buf))
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

/// Decode any supported upload, sniffing the container from its magic bytes.
///
/// AVIF goes through `avif-decode`; everything else through `image`.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    match image::guess_format(data) {
        Ok(ImageFormat::Avif) => decode_avif(data),
        _ => image::load_from_memory(data).map_err(|e| Error::codec(e.to_string())),
    }
}

fn decode_avif(data: &[u8]) -> Result<DynamicImage> {
    let decoder = avif_decode::Decoder::from_avif(data)
        .map_err(|e| Error::codec(format!("AVIF decoding failed: {e}")))?;
    let image = decoder
        .to_image()
        .map_err(|e| Error::codec(format!("AVIF decoding failed: {e}")))?;
    avif_image_to_dynamic(image)
}

fn avif_image_to_dynamic(image: avif_decode::Image) -> Result<DynamicImage> {
    use avif_decode::Image as Avif;

    let mismatch = || Error::codec("AVIF decoding failed: pixel buffer does not match dimensions");

    match image {
        Avif::Rgb8(img) => {
            let (width, height) = avif_dimensions(img.width(), img.height())?;
            let buf = img.as_ref().pixels().flat_map(|px| [px.r, px.g, px.b]).collect();
            RgbImage::from_vec(width, height, buf)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(mismatch)
        }
        Avif::Rgb16(img) => {
            let (width, height) = avif_dimensions(img.width(), img.height())?;
            let buf = img.as_ref().pixels().flat_map(|px| [px.r, px.g, px.b]).collect();
            image::ImageBuffer::from_vec(width, height, buf)
                .map(DynamicImage::ImageRgb16)
                .ok_or_else(mismatch)
        }
        Avif::Rgba8(img) => {
            let (width, height) = avif_dimensions(img.width(), img.height())?;
            let buf = img
                .as_ref()
                .pixels()
                .flat_map(|px| [px.r, px.g, px.b, px.a])
                .collect();
            image::RgbaImage::from_vec(width, height, buf)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(mismatch)
        }
        Avif::Rgba16(img) => {
            let (width, height) = avif_dimensions(img.width(), img.height())?;
            let buf = img
                .as_ref()
                .pixels()
                .flat_map(|px| [px.r, px.g, px.b, px.a])
                .collect();
            image::ImageBuffer::from_vec(width, height, buf)
                .map(DynamicImage::ImageRgba16)
                .ok_or_else(mismatch)
        }
        Avif::Gray8(img) => {
            let (width, height) = avif_dimensions(img.width(), img.height())?;
            let buf = img.as_ref().pixels().map(|px| px.value()).collect();
            image::GrayImage::from_vec(width, height, buf)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(mismatch)
        }
        Avif::Gray16(img) => {
            let (width, height) = avif_dimensions(img.width(), img.height())?;
            let buf = img.as_ref().pixels().map(|px| px.value()).collect();
            image::ImageBuffer::from_vec(width, height, buf)
                .map(DynamicImage::ImageLuma16)
                .ok_or_else(mismatch)
        }
    }
}

fn avif_dimensions(width: usize, height: usize) -> Result<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(Error::codec(format!("AVIF image too large: {width}x{height}"))),
    }
}

/// Composite an image over an opaque white background of the same size.
///
/// Images without an alpha channel are converted to RGB unchanged.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| -> u8 {
            let a = u32::from(a);
            ((u32::from(c) * a + 255 * (255 - a) + 127) / 255) as u8
        };
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Encode with the format's fixed parameters.
fn encode(img: &DynamicImage, spec: &FormatSpec) -> Result<Vec<u8>> {
    let params = spec.params;
    let mut buf = Vec::new();

    match spec.format {
        OutputFormat::Jpeg => {
            let quality = params.quality.unwrap_or(95);
            img.to_rgb8()
                .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
                .map_err(|e| Error::codec(e.to_string()))?;
        }
        OutputFormat::Png => {
            let compression = if params.optimize {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            let encoder =
                PngEncoder::new_with_quality(&mut buf, compression, PngFilter::Adaptive);
            img.write_with_encoder(encoder)
                .map_err(|e| Error::codec(e.to_string()))?;
        }
        OutputFormat::Webp => {
            let quality = f32::from(params.quality.unwrap_or(95));
            let lossless = params.lossless.unwrap_or(false);
            let (w, h) = (img.width(), img.height());
            let has_alpha = img.color().has_alpha();
            let pixels = if has_alpha {
                img.to_rgba8().into_raw()
            } else {
                img.to_rgb8().into_raw()
            };
            let encoder = if has_alpha {
                webp::Encoder::from_rgba(&pixels, w, h)
            } else {
                webp::Encoder::from_rgb(&pixels, w, h)
            };
            let memory = encoder
                .encode_simple(lossless, quality)
                .map_err(|e| Error::codec(format!("WebP encoding failed: {e:?}")))?;
            buf.extend_from_slice(&memory);
        }
        OutputFormat::Avif => {
            let quality = params.quality.unwrap_or(95);
            let encoder = AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, quality);
            let result = if img.color().has_alpha() {
                img.to_rgba8().write_with_encoder(encoder)
            } else {
                img.to_rgb8().write_with_encoder(encoder)
            };
            result.map_err(|e| Error::codec(e.to_string()))?;
        }
    }

    Ok(buf)
}

/// `<sanitized stem>_converted<ext>`; an empty stem becomes `image`.
pub fn converted_filename(original_filename: &str, spec: &FormatSpec) -> String {
    let sanitized = secure_filename(original_filename);
    let (stem, _) = split_extension(&sanitized);
    let stem = if stem.is_empty() { "image" } else { stem };
    format!("{stem}_converted{}", spec.extension)
}

/// Decode only the dimensions of an encoded image.
///
/// AVIF has no header-only path, so it is decoded in full.
pub fn decoded_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    if let Ok(ImageFormat::Avif) = image::guess_format(data) {
        let img = decode_avif(data)?;
        return Ok((img.width(), img.height()));
    }

    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::codec(e.to_string()))?;
    reader
        .into_dimensions()
        .map_err(|e| Error::codec(e.to_string()))
}
