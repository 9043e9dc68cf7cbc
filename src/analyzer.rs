// SYNOID Wallpaper - Analysis Client
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Asks the vision service which catalog styles suit a photo and how much
// creative freedom each one should get. Never fails: on any error it falls
// back to the first catalog styles at Medium creativity.

use crate::error::{Outcome, WallpaperError};
use crate::imaging::ReferenceImage;
use crate::services::VisionService;
use crate::styles::StyleCatalog;
use crate::types::{AnalysisResult, CreativityLevel, RecommendationItem};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const FALLBACK_DESCRIPTION: &str = "A nice photo";

pub struct AnalysisClient {
    vision: Arc<dyn VisionService>,
    catalog: Arc<StyleCatalog>,
    model: String,
}

impl AnalysisClient {
    pub fn new(vision: Arc<dyn VisionService>, catalog: Arc<StyleCatalog>, model: &str) -> Self {
        Self {
            vision,
            catalog,
            model: model.to_string(),
        }
    }

    /// Recommend up to `top_k` styles for `image`.
    ///
    /// Returns `Outcome::Fresh` with the service's plan, or
    /// `Outcome::Recovered` with the deterministic fallback.
    pub async fn analyze_and_recommend(
        &self,
        image: &ReferenceImage,
        top_k: usize,
    ) -> Outcome<AnalysisResult> {
        info!("[ANALYZER] Analyzing image and planning restyle strategy (top {})...", top_k);

        let instruction = self.build_instruction(top_k);
        let answer = match self
            .vision
            .describe(&self.model, image, &instruction, true)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!("[ANALYZER] Analysis call failed: {}", e);
                return Outcome::recovered(self.fallback(top_k), e);
            }
        };

        match parse_analysis(&answer) {
            Ok(mut result) => {
                result.recommendations.truncate(top_k);
                info!(
                    "[ANALYZER] Plan ready: {} recommendations",
                    result.recommendations.len()
                );
                Outcome::Fresh(result)
            }
            Err(e) => {
                warn!("[ANALYZER] Unparseable analysis answer: {}", answer);
                Outcome::recovered(self.fallback(top_k), e)
            }
        }
    }

    pub fn build_instruction(&self, top_k: usize) -> String {
        format!(
            r#"Act as an expert AI Art Director.
Styles Library: {menu}

Task:
1. Recommend the TOP {top_k} styles from the Styles Library for this image. Use the library keys exactly.
2. For EACH style, determine the optimal "Creativity Level" (how much to deviate from the original image):
   - "High": For abstract/artistic styles (e.g., Cubism, Impressionism). Change structure freely.
   - "Medium": For illustrative styles (e.g., Anime, 3D). Keep composition, change textures and details.
   - "Low": For realistic styles. Keep strict structure, only change lighting/color.
3. Write a visual description of the image.

Output JSON only:
{{
    "description": "...",
    "recommendations": [
        {{ "style_key": "style1", "creativity": "High" }},
        {{ "style_key": "style2", "creativity": "Low" }}
    ],
    "reasoning": "..."
}}"#,
            menu = self.catalog.menu_json(),
            top_k = top_k,
        )
    }

    /// First `min(top_k, catalog size)` catalog styles at Medium creativity.
    pub fn fallback(&self, top_k: usize) -> AnalysisResult {
        AnalysisResult {
            description: FALLBACK_DESCRIPTION.to_string(),
            recommendations: self
                .catalog
                .keys()
                .take(top_k)
                .map(|key| RecommendationItem {
                    style_key: key.to_string(),
                    creativity: CreativityLevel::Medium,
                })
                .collect(),
            reasoning: String::new(),
        }
    }
}

/// Strip markdown fences some models wrap around JSON answers.
pub fn strip_code_fences(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

pub fn parse_analysis(text: &str) -> Result<AnalysisResult, WallpaperError> {
    serde_json::from_str::<AnalysisResult>(strip_code_fences(text))
        .map_err(|e| WallpaperError::Parse(format!("analysis JSON: {}", e)))
}
