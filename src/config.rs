// SYNOID Wallpaper - Runtime Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Credential, endpoints and model identifiers are gathered once into an
// explicit AppConfig that every component receives at construction time.

use crate::error::{Result, WallpaperError};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_STYLES_PATH: &str = "config/styles.yaml";

/// Bounded retry policy for long-running video jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_interval: Duration,
    pub backoff: f64,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(30),
            backoff: 1.5,
            max_attempts: 120,
            timeout: Duration::from_secs(600),
        }
    }
}

impl PollPolicy {
    /// Delay before poll number `attempt` (0-based), capped at `max_interval`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff.max(1.0).powi(attempt.min(64) as i32);
        let secs = self.interval.as_secs_f64() * factor;
        Duration::from_secs_f64(secs.min(self.max_interval.as_secs_f64()))
    }
}

/// Maps an input tree onto its sibling output tree by directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMapping {
    pub input_root: String,
    pub output_root: String,
}

impl Default for RootMapping {
    fn default() -> Self {
        Self {
            input_root: "inputs".to_string(),
            output_root: "outputs".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelIds {
    pub analysis: String,
    pub image: String,
    /// Text-to-image engine, used when the reference photo is not sent.
    pub text_image: String,
    pub motion: String,
    pub video: String,
}

impl Default for ModelIds {
    fn default() -> Self {
        Self {
            analysis: "gemini-2.5-flash".to_string(),
            image: "gemini-2.5-flash-image".to_string(),
            text_image: "imagen-4.0-generate-001".to_string(),
            motion: "gemini-2.5-flash".to_string(),
            video: "veo-3.1-generate-preview".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub api_base: Url,
    pub styles_path: PathBuf,
    pub models: ModelIds,
    pub roots: RootMapping,
    pub poll: PollPolicy,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GOOGLE_API_KEY").ok_or_else(|| {
            WallpaperError::Configuration("GOOGLE_API_KEY is not set".to_string())
        })?;

        let base = get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(base.trim_end_matches('/')).map_err(|e| {
            WallpaperError::Configuration(format!("invalid GEMINI_API_BASE '{}': {}", base, e))
        })?;

        let defaults = ModelIds::default();
        let models = ModelIds {
            analysis: get("WALLPAPER_ANALYSIS_MODEL").unwrap_or(defaults.analysis),
            image: get("WALLPAPER_IMAGE_MODEL").unwrap_or(defaults.image),
            text_image: get("WALLPAPER_TEXT_IMAGE_MODEL").unwrap_or(defaults.text_image),
            motion: get("WALLPAPER_MOTION_MODEL").unwrap_or(defaults.motion),
            video: get("WALLPAPER_VIDEO_MODEL").unwrap_or(defaults.video),
        };

        let root_defaults = RootMapping::default();
        let roots = RootMapping {
            input_root: get("WALLPAPER_INPUT_ROOT").unwrap_or(root_defaults.input_root),
            output_root: get("WALLPAPER_OUTPUT_ROOT").unwrap_or(root_defaults.output_root),
        };
        if roots.input_root == roots.output_root {
            return Err(WallpaperError::Configuration(format!(
                "input and output roots must differ (both '{}')",
                roots.input_root
            )));
        }

        let poll_defaults = PollPolicy::default();
        let poll = PollPolicy {
            interval: secs(&get, "WALLPAPER_POLL_INTERVAL_SECS", poll_defaults.interval)?,
            max_interval: secs(
                &get,
                "WALLPAPER_POLL_MAX_INTERVAL_SECS",
                poll_defaults.max_interval,
            )?,
            backoff: poll_defaults.backoff,
            max_attempts: number(&get, "WALLPAPER_POLL_MAX_ATTEMPTS", poll_defaults.max_attempts)?,
            timeout: secs(&get, "WALLPAPER_POLL_TIMEOUT_SECS", poll_defaults.timeout)?,
        };

        Ok(Self {
            api_key,
            api_base,
            styles_path: get("WALLPAPER_STYLES")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STYLES_PATH)),
            models,
            roots,
            poll,
            http_timeout: secs(&get, "WALLPAPER_HTTP_TIMEOUT_SECS", Duration::from_secs(120))?,
        })
    }
}

fn number<G>(get: &G, key: &str, default: u32) -> Result<u32>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
            WallpaperError::Configuration(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
    }
}

fn secs<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    number(get, key, default.as_secs() as u32).map(|s| Duration::from_secs(s as u64))
}
