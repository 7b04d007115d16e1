//! # Logo Loading
//!
//! The company logo in the top-right corner of the first page can come from a
//! file on disk, a `data:image/...;base64,` URI or bare base64. JPEG bytes go
//! into the PDF untouched (DCTDecode). PNGs are decoded to RGB with a separate
//! alpha channel that becomes an SMask.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use image::io::Reader as ImageReader;

use crate::error::SheetError;

/// An image ready for PDF embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub pixels: ImagePixels,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixels {
    /// Original JPEG stream.
    Jpeg { data: Vec<u8>, gray: bool },
    /// `width * height * 3` RGB bytes plus one alpha byte per pixel when any
    /// pixel is not fully opaque.
    Rgb { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

impl LoadedImage {
    /// Load from a path, data URI or base64 string.
    pub fn from_source(src: &str) -> Result<Self, SheetError> {
        let bytes = source_bytes(src)?;
        Self::decode(&bytes)
    }

    /// Sniff the format from the magic bytes and decode.
    pub fn decode(data: &[u8]) -> Result<Self, SheetError> {
        if data.starts_with(&[0xFF, 0xD8]) {
            decode_jpeg(data)
        } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            decode_png(data)
        } else {
            Err(SheetError::Image(
                "unsupported image format (expected JPEG or PNG)".to_string(),
            ))
        }
    }

    /// Size in points when scaled to fit a `max_width` by `max_height` box,
    /// keeping the aspect ratio. Never scales up past one point per pixel.
    pub fn fit(&self, max_width: f64, max_height: f64) -> (f64, f64) {
        if self.width_px == 0 || self.height_px == 0 {
            return (0.0, 0.0);
        }
        let w = self.width_px as f64;
        let h = self.height_px as f64;
        let scale = (max_width / w).min(max_height / h).min(1.0);
        (w * scale, h * scale)
    }
}

fn source_bytes(src: &str) -> Result<Vec<u8>, SheetError> {
    let src = src.trim();
    if let Some(rest) = src.strip_prefix("data:image/") {
        let (_, payload) = rest
            .split_once(',')
            .ok_or_else(|| SheetError::Image("invalid data URI: missing comma".to_string()))?;
        return decode_base64(payload);
    }

    let path = Path::new(src);
    if path.is_file() {
        return std::fs::read(path)
            .map_err(|e| SheetError::Image(format!("failed to read '{}': {}", src, e)));
    }
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return Err(SheetError::Image(format!("logo file '{}' not found", src)));
    }

    decode_base64(src)
}

fn decode_base64(input: &str) -> Result<Vec<u8>, SheetError> {
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|e| SheetError::Image(format!("base64 decode error: {}", e)))
}

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, SheetError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| SheetError::Image(format!("format detection failed: {}", e)))
}

fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, SheetError> {
    let img = reader(data)?
        .decode()
        .map_err(|e| SheetError::Image(format!("failed to decode JPEG: {}", e)))?;
    Ok(LoadedImage {
        pixels: ImagePixels::Jpeg {
            data: data.to_vec(),
            gray: img.color().channel_count() == 1,
        },
        width_px: img.width(),
        height_px: img.height(),
    })
}

fn decode_png(data: &[u8]) -> Result<LoadedImage, SheetError> {
    let rgba = reader(data)?
        .decode()
        .map_err(|e| SheetError::Image(format!("failed to decode PNG: {}", e)))?
        .to_rgba8();

    let (width, height) = rgba.dimensions();
    let pixel_count = width as usize * height as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }
    let opaque = alpha.iter().all(|&a| a == 255);

    Ok(LoadedImage {
        pixels: ImagePixels::Rgb {
            rgb,
            alpha: (!opaque).then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}
