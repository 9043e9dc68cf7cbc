// SYNOID Wallpaper - Error Taxonomy
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WallpaperError {
    /// Missing credential, unreadable or malformed style catalog, bad endpoint.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("could not parse service response: {0}")]
    Parse(String),

    #[error("image decode failed for {path:?}: {reason}")]
    Image { path: PathBuf, reason: String },

    #[error("service response carried no image data")]
    NoImageData,

    #[error("video job {job} failed: {reason}")]
    JobFailed { job: String, reason: String },

    #[error("video job {job} did not finish after {attempts} polls ({elapsed_secs}s)")]
    JobTimedOut {
        job: String,
        attempts: u32,
        elapsed_secs: u64,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl WallpaperError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, WallpaperError>;

/// Result of a pipeline stage that may degrade instead of failing.
///
/// Stages with a safe fallback (analysis, style recovery, motion prompt)
/// only ever yield `Fresh` or `Recovered`. Stages without one (image
/// synthesis, video job) yield `Fresh` or `Fatal`.
#[derive(Debug)]
pub enum Outcome<T> {
    Fresh(T),
    Recovered { value: T, cause: WallpaperError },
    Fatal(WallpaperError),
}

impl<T> Outcome<T> {
    pub fn recovered(value: T, cause: WallpaperError) -> Self {
        Self::Recovered { value, cause }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Fresh(v) | Self::Recovered { value: v, .. } => Some(v),
            Self::Fatal(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Fresh(v) | Self::Recovered { value: v, .. } => Some(v),
            Self::Fatal(_) => None,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Convert into a plain `Result`, keeping recovered values as successes.
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Fresh(v) | Self::Recovered { value: v, .. } => Ok(v),
            Self::Fatal(e) => Err(e),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(v) => Self::Fresh(v),
            Err(e) => Self::Fatal(e),
        }
    }
}
