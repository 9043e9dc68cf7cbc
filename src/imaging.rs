// SYNOID Wallpaper - Reference Image Loading
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use crate::error::{Result, WallpaperError};
use image::ImageOutputFormat;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// An image ready to be attached to a service request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ReferenceImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

fn extension_lower(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// MIME type used when uploading raw file bytes.
pub fn mime_for_path(path: &Path) -> &'static str {
    match extension_lower(path).as_str() {
        "png" => "image/png",
        _ => "image/jpeg",
    }
}

/// Load an input photo as canonical RGB PNG bytes.
///
/// HEIC/HEIF containers are not decoded here; their bytes are forwarded
/// untouched with the matching MIME type.
pub fn load_reference_image(path: &Path) -> Result<ReferenceImage> {
    let raw = std::fs::read(path).map_err(|e| WallpaperError::io(path, e))?;

    let ext = extension_lower(path);
    if ext == "heic" || ext == "heif" {
        debug!("[IMAGING] Forwarding {} container as-is: {:?}", ext, path);
        return Ok(ReferenceImage::new(raw, format!("image/{}", ext)));
    }

    let decoded = image::load_from_memory(&raw).map_err(|e| WallpaperError::Image {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut png = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(|e| WallpaperError::Image {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!(
        "[IMAGING] Normalized {:?} ({}x{}) to {} PNG bytes",
        path,
        rgb.width(),
        rgb.height(),
        png.len()
    );
    Ok(ReferenceImage::new(png, "image/png"))
}
