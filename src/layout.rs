// SYNOID Wallpaper - Output Layout
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Derives where generated artifacts live and how they are named.
// Image artifacts are named `{stem}_gen_{style_key}_{epoch}.png`; the motion
// director recovers `style_key` from that name, so both directions live here.

use crate::config::RootMapping;
use crate::error::{Result, WallpaperError};
use regex::Regex;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

pub const GEN_MARKER: &str = "_gen_";
pub const DEFAULT_STYLE_KEY: &str = "default";

static GENERATED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<style>.+)_\d+\.(png|jpe?g|heic)$").expect("static regex")
});

/// Hands out epoch-second stamps that never repeat within the process.
#[derive(Debug, Default)]
pub struct StampSource {
    last: AtomicU64,
}

impl StampSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch seconds, bumped past any previously issued stamp.
    pub fn next(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.next_at(now)
    }

    pub fn next_at(&self, now: u64) -> u64 {
        let mut prev = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputLayout {
    roots: RootMapping,
}

impl OutputLayout {
    pub fn new(roots: RootMapping) -> Self {
        Self { roots }
    }

    /// Map the input image's directory onto the output tree.
    ///
    /// The first path component equal to the input root name is swapped for
    /// the output root name. When no component matches, the output root is
    /// nested directly under the input directory.
    pub fn output_root_for(&self, image_path: &Path) -> PathBuf {
        let input_dir = match image_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut swapped = false;
        let mapped: PathBuf = input_dir
            .components()
            .map(|c| match c {
                Component::Normal(name)
                    if !swapped && name.to_str() == Some(self.roots.input_root.as_str()) =>
                {
                    swapped = true;
                    OsString::from(&self.roots.output_root)
                }
                other => other.as_os_str().to_os_string(),
            })
            .collect();

        if swapped {
            mapped
        } else {
            input_dir.join(&self.roots.output_root)
        }
    }

    /// `<output root>/<stem>`, the per-input directory for its artifacts.
    pub fn output_dir_for(&self, image_path: &Path) -> PathBuf {
        self.output_root_for(image_path).join(file_stem(image_path))
    }

    /// Full artifact path for one style at one stamp.
    pub fn artifact_path(&self, image_path: &Path, style_key: &str, epoch: u64) -> PathBuf {
        let stem = file_stem(image_path);
        self.output_dir_for(image_path)
            .join(artifact_file_name(&stem, style_key, epoch))
    }

    /// Create the per-input output directory. Safe under concurrent creators.
    pub fn ensure_output_dir(&self, image_path: &Path) -> Result<PathBuf> {
        let dir = self.output_dir_for(image_path);
        std::fs::create_dir_all(&dir).map_err(|e| WallpaperError::io(&dir, e))?;
        Ok(dir)
    }
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn artifact_file_name(stem: &str, style_key: &str, epoch: u64) -> String {
    format!("{}{}{}_{}.png", stem, GEN_MARKER, style_key, epoch)
}

/// Recover the style key from a generated artifact's filename.
///
/// The generator appends `_gen_{key}_{epoch}` last, so the final marker is the
/// one that counts; the input stem may contain `_gen_` itself.
pub fn style_key_from_file_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let (_, tail) = name.rsplit_once(GEN_MARKER)?;
    let caps = GENERATED_SUFFIX.captures(tail)?;
    Some(caps["style"].to_string())
}

/// `<dir>/<stem>_raw.mp4` next to the source artifact.
pub fn video_path_for(artifact: &Path) -> PathBuf {
    artifact.with_file_name(format!("{}_raw.mp4", file_stem(artifact)))
}
