// SYNOID Wallpaper - Style Catalog
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Named style definitions loaded once from YAML. Read-only after load and
// shared across the analyzer, the mixer and the motion director.

use crate::error::{Result, WallpaperError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

pub const DESCRIPTION_PLACEHOLDER: &str = "{description}";
pub const DEFAULT_MOTION_GUIDE: &str = "Subtle and organic motion.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDefinition {
    pub key: String,
    pub display_name: String,
    pub prompt_template: String,
    pub negative_prompt: String,
    pub motion_guide: String,
}

/// On-disk shape of a single style entry.
#[derive(Debug, Deserialize)]
struct StyleEntry {
    name: Option<String>,
    prompt_template: Option<String>,
    negative_prompt: Option<String>,
    motion_guide: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: Vec<StyleDefinition>,
    index: HashMap<String, usize>,
}

impl StyleCatalog {
    /// Load the catalog from a YAML file with a top-level `styles` mapping.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WallpaperError::Configuration(format!(
                "style catalog not found: {}",
                path.display()
            )));
        }
        let raw = fs::read_to_string(path).map_err(|e| {
            WallpaperError::Configuration(format!(
                "cannot read style catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        let catalog = Self::from_yaml_str(&raw)?;
        info!(
            "[CATALOG] Loaded {} styles from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse catalog YAML. File order of the `styles` keys is the iteration order.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_str(raw)
            .map_err(|e| WallpaperError::Configuration(format!("malformed style catalog: {}", e)))?;

        let styles = match doc.get("styles") {
            None | Some(serde_yaml::Value::Null) => return Ok(Self::default()),
            Some(serde_yaml::Value::Mapping(m)) => m,
            Some(_) => {
                return Err(WallpaperError::Configuration(
                    "`styles` must be a mapping of key to style".to_string(),
                ))
            }
        };

        let mut definitions = Vec::with_capacity(styles.len());
        for (key, value) in styles {
            let key = key.as_str().ok_or_else(|| {
                WallpaperError::Configuration(format!("style key must be a string: {:?}", key))
            })?;
            let entry: StyleEntry = serde_yaml::from_value(value.clone()).map_err(|e| {
                WallpaperError::Configuration(format!("style '{}' is malformed: {}", key, e))
            })?;
            definitions.push(StyleDefinition {
                key: key.to_string(),
                display_name: entry.name.unwrap_or_else(|| key.to_string()),
                prompt_template: entry
                    .prompt_template
                    .unwrap_or_else(|| DESCRIPTION_PLACEHOLDER.to_string()),
                negative_prompt: entry.negative_prompt.unwrap_or_default(),
                motion_guide: entry
                    .motion_guide
                    .unwrap_or_else(|| DEFAULT_MOTION_GUIDE.to_string()),
            });
        }

        Self::from_definitions(definitions)
    }

    pub fn from_definitions(styles: Vec<StyleDefinition>) -> Result<Self> {
        let mut index = HashMap::with_capacity(styles.len());
        for (i, style) in styles.iter().enumerate() {
            if index.insert(style.key.clone(), i).is_some() {
                return Err(WallpaperError::Configuration(format!(
                    "duplicate style key '{}'",
                    style.key
                )));
            }
        }
        Ok(Self { styles, index })
    }

    /// Case-sensitive exact lookup.
    pub fn lookup(&self, key: &str) -> Option<&StyleDefinition> {
        self.index.get(key).map(|&i| &self.styles[i])
    }

    pub fn first(&self) -> Option<&StyleDefinition> {
        self.styles.first()
    }

    /// Ordered (key, display name) pairs.
    pub fn menu(&self) -> Vec<(&str, &str)> {
        self.styles
            .iter()
            .map(|s| (s.key.as_str(), s.display_name.as_str()))
            .collect()
    }

    /// The menu as a JSON object, in catalog order, for embedding in prompts.
    pub fn menu_json(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .styles
            .iter()
            .map(|s| (s.key.clone(), serde_json::Value::String(s.display_name.clone())))
            .collect();
        serde_json::Value::Object(map).to_string()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(|s| s.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleDefinition> {
        self.styles.iter()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
