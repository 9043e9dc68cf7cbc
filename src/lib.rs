// SYNOID Wallpaper - Library Root
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Photo -> art-direction analysis -> restyled wallpapers -> optional motion clips.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod generator;
pub mod imaging;
pub mod layout;
pub mod mixer;
pub mod motion;
pub mod pipeline;
pub mod services;
pub mod styles;
pub mod types;

pub use error::{Outcome, Result, WallpaperError};
