//! Magic-byte format detection and lossless WebP transcoding.
//!
//! Formats are a closed enum; everything a format needs (media type,
//! file extension, codec) is resolved from [`FORMAT_TABLE`], so adding a
//! format means adding one variant, one row and one signature.

use std::io::Cursor;

use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageError as CodecError};

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    WebP,
    Png,
    Jpeg,
    Gif,
    Bmp,
}

struct FormatInfo {
    format: ImageFormat,
    media_type: &'static str,
    extension: &'static str,
    codec: image::ImageFormat,
}

const FORMAT_TABLE: &[FormatInfo] = &[
    FormatInfo {
        format: ImageFormat::WebP,
        media_type: "image/webp",
        extension: "webp",
        codec: image::ImageFormat::WebP,
    },
    FormatInfo {
        format: ImageFormat::Png,
        media_type: "image/png",
        extension: "png",
        codec: image::ImageFormat::Png,
    },
    FormatInfo {
        format: ImageFormat::Jpeg,
        media_type: "image/jpeg",
        extension: "jpg",
        codec: image::ImageFormat::Jpeg,
    },
    FormatInfo {
        format: ImageFormat::Gif,
        media_type: "image/gif",
        extension: "gif",
        codec: image::ImageFormat::Gif,
    },
    FormatInfo {
        format: ImageFormat::Bmp,
        media_type: "image/bmp",
        extension: "bmp",
        codec: image::ImageFormat::Bmp,
    },
];

impl ImageFormat {
    fn info(self) -> &'static FormatInfo {
        // Every variant has exactly one row.
        FORMAT_TABLE
            .iter()
            .find(|row| row.format == self)
            .unwrap_or(&FORMAT_TABLE[0])
    }

    pub fn media_type(self) -> &'static str {
        self.info().media_type
    }

    /// Preferred file extension, without the dot.
    pub fn extension(self) -> &'static str {
        self.info().extension
    }

    fn codec(self) -> image::ImageFormat {
        self.info().codec
    }

    /// Format implied by a file extension. `jpeg` and `jpg` both map to JPEG.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if ext == "jpeg" {
            return Some(ImageFormat::Jpeg);
        }
        FORMAT_TABLE
            .iter()
            .find(|row| row.extension == ext)
            .map(|row| row.format)
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image format not recognized")]
    UnrecognizedFormat,

    #[error("No decoder available for {0}")]
    UnsupportedFormat(ImageFormat),

    #[error("Failed to decode {format} image: {message}")]
    Decode { format: ImageFormat, message: String },

    #[error("Failed to encode WebP image: {0}")]
    Encode(String),

    #[error("No WebP encoder available")]
    WriterUnavailable,
}

impl ImageError {
    pub fn reason(&self) -> &'static str {
        match self {
            ImageError::UnrecognizedFormat => "UNRECOGNIZED_FORMAT",
            ImageError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ImageError::Decode { .. } => "DECODE_ERROR",
            ImageError::Encode(_) => "ENCODE_ERROR",
            ImageError::WriterUnavailable => "WRITER_UNAVAILABLE",
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn is_webp(b: &[u8]) -> bool {
    b.len() >= 12 && &b[0..4] == b"RIFF" && &b[8..12] == b"WEBP"
}

fn is_png(b: &[u8]) -> bool {
    b.starts_with(&PNG_SIGNATURE)
}

fn is_jpeg(b: &[u8]) -> bool {
    b.starts_with(&[0xFF, 0xD8])
}

fn is_gif(b: &[u8]) -> bool {
    b.starts_with(b"GIF87a") || b.starts_with(b"GIF89a")
}

fn is_bmp(b: &[u8]) -> bool {
    b.starts_with(b"BM")
}

/// Signature checks in precedence order.
const SIGNATURES: &[(ImageFormat, fn(&[u8]) -> bool)] = &[
    (ImageFormat::WebP, is_webp),
    (ImageFormat::Png, is_png),
    (ImageFormat::Jpeg, is_jpeg),
    (ImageFormat::Gif, is_gif),
    (ImageFormat::Bmp, is_bmp),
];

/// Classify `bytes` by their leading magic bytes.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    SIGNATURES
        .iter()
        .find(|(_, matches)| matches(bytes))
        .map(|(format, _)| *format)
}

// ---------------------------------------------------------------------------
// Decode / encode
// ---------------------------------------------------------------------------

/// Requested WebP quality. Ignored: the encoder is lossless.
pub const DEFAULT_WEBP_QUALITY: f32 = 0.8;

pub fn decode(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, ImageError> {
    let codec = format.codec();
    if !codec.reading_enabled() {
        return Err(ImageError::UnsupportedFormat(format));
    }
    image::load_from_memory_with_format(bytes, codec).map_err(|err| match err {
        CodecError::Unsupported(_) => ImageError::UnsupportedFormat(format),
        other => ImageError::Decode {
            format,
            message: other.to_string(),
        },
    })
}

/// Encode `img` as lossless WebP. `_quality` has no effect in lossless mode.
pub fn encode_webp(img: &DynamicImage, _quality: f32) -> Result<Vec<u8>, ImageError> {
    if !image::ImageFormat::WebP.writing_enabled() {
        return Err(ImageError::WriterUnavailable);
    }

    let rgba = img.to_rgba8();
    let mut out = Cursor::new(Vec::new());
    WebPEncoder::new_lossless(&mut out)
        .encode(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        .map_err(|err| match err {
            CodecError::Unsupported(_) => ImageError::WriterUnavailable,
            other => ImageError::Encode(other.to_string()),
        })?;
    Ok(out.into_inner())
}

pub fn transcode_to_webp(
    bytes: &[u8],
    format: ImageFormat,
    quality: f32,
) -> Result<Vec<u8>, ImageError> {
    let img = decode(bytes, format)?;
    let encoded = encode_webp(&img, quality)?;
    tracing::debug!(
        %format,
        width = img.width(),
        height = img.height(),
        input_bytes = bytes.len(),
        output_bytes = encoded.len(),
        "Transcoded image to WebP"
    );
    Ok(encoded)
}
