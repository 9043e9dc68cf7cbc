// SYNOID Wallpaper - Prompt Mixer
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use crate::styles::{StyleCatalog, DESCRIPTION_PLACEHOLDER};
use crate::types::{CreativityLevel, PromptBundle};
use std::sync::Arc;
use tracing::warn;

/// Injects an image description into a style template.
pub struct PromptMixer {
    catalog: Arc<StyleCatalog>,
}

impl PromptMixer {
    pub fn new(catalog: Arc<StyleCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve `style_key` and fill its template with `description`.
    ///
    /// Unknown keys fall back to the first catalog style; an empty catalog
    /// yields a bundle carrying only the description. The returned bundle
    /// has `Medium` creativity until the caller overrides it.
    pub fn mix(&self, style_key: &str, description: &str) -> PromptBundle {
        let style = match self.catalog.lookup(style_key) {
            Some(style) => Some(style),
            None => {
                let fallback = self.catalog.first();
                warn!(
                    "[MIXER] Style '{}' not in catalog, falling back to '{}'",
                    style_key,
                    fallback.map(|s| s.key.as_str()).unwrap_or("<description only>")
                );
                fallback
            }
        };

        let Some(style) = style else {
            return PromptBundle {
                style_name: String::new(),
                style_key: String::new(),
                prompt: description.to_string(),
                negative_prompt: String::new(),
                creativity: CreativityLevel::default(),
            };
        };

        PromptBundle {
            style_name: style.display_name.clone(),
            style_key: style.key.clone(),
            prompt: fill_template(&style.prompt_template, description),
            negative_prompt: style.negative_prompt.clone(),
            creativity: CreativityLevel::default(),
        }
    }
}

fn fill_template(template: &str, description: &str) -> String {
    if template.contains(DESCRIPTION_PLACEHOLDER) {
        template.replace(DESCRIPTION_PLACEHOLDER, description)
    } else {
        format!("{}, {}", template, description)
    }
}
