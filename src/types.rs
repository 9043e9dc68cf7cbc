// SYNOID Wallpaper - Shared Data Model
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How far a synthesized image may drift from the reference image's structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum CreativityLevel {
    /// Realistic styles: structure kept, only lighting and color change.
    Low,
    /// Illustrative styles: composition kept, texture and detail restyled.
    #[default]
    Medium,
    /// Abstract or artistic styles: structure may change freely.
    High,
}

impl CreativityLevel {
    /// Parse a level reported by the analysis service.
    /// Anything unrecognized resolves to `Medium`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for CreativityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CreativityLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Non-string values (null, numbers) are untrusted model output too.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .map(CreativityLevel::parse_lenient)
            .unwrap_or_default())
    }
}

/// One (style, creativity) pair proposed by the analysis stage.
/// `style_key` is foreign input and may not exist in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub style_key: String,
    #[serde(default)]
    pub creativity: CreativityLevel,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<RecommendationItem>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reasoning: String,
}

/// Strings from model output: `null` and non-string values read as empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Everything the generation step needs for one style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptBundle {
    pub style_name: String,
    pub style_key: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub creativity: CreativityLevel,
}

impl PromptBundle {
    pub fn with_creativity(mut self, creativity: CreativityLevel) -> Self {
        self.creativity = creativity;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub style_key: String,
    /// Epoch seconds embedded in the filename.
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MotionScript {
    pub source_image: PathBuf,
    pub style_detected: String,
    pub video_prompt: String,
}
