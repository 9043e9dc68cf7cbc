// SYNOID Wallpaper - Generation Client
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Restyles a reference photo through the image-synthesis service and
// persists the result under the derived output layout.

use crate::error::{Outcome, Result, WallpaperError};
use crate::imaging::ReferenceImage;
use crate::config::ModelIds;
use crate::layout::{OutputLayout, StampSource};
use crate::services::{ImageSynthesisService, SynthesisResponse};
use crate::types::{CreativityLevel, GeneratedArtifact, PromptBundle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

const LOW_INSTRUCTION: &str = "STRICTLY maintain the original image's structure, pose, and geometry. Only change the lighting and art style texture. Do not add or remove objects.";
const MEDIUM_INSTRUCTION: &str = "Maintain the main subject's pose and overall composition, but feel free to stylize the background and details to match the art style.";
const HIGH_INSTRUCTION: &str = "Use the original image only as a loose reference for color and vibe. Feel free to reimagine the composition and pose to better fit the artistic style. Be creative!";

pub const TEXT_IMAGE_ASPECT_RATIO: &str = "3:4";
const TEXT_IMAGE_DEFAULT_NEGATIVE: &str = "text, watermark";

/// Fixed creativity policy table.
pub fn creativity_instruction(level: CreativityLevel) -> &'static str {
    match level {
        CreativityLevel::Low => LOW_INSTRUCTION,
        CreativityLevel::Medium => MEDIUM_INSTRUCTION,
        CreativityLevel::High => HIGH_INSTRUCTION,
    }
}

pub struct GenerationClient {
    synthesis: Arc<dyn ImageSynthesisService>,
    layout: OutputLayout,
    stamps: Arc<StampSource>,
    model: String,
    text_model: String,
}

impl GenerationClient {
    pub fn new(synthesis: Arc<dyn ImageSynthesisService>, layout: OutputLayout, model: &str) -> Self {
        Self {
            synthesis,
            layout,
            stamps: Arc::new(StampSource::new()),
            model: model.to_string(),
            text_model: ModelIds::default().text_image,
        }
    }

    pub fn with_text_model(mut self, model: &str) -> Self {
        self.text_model = model.to_string();
        self
    }

    pub fn compose_request(bundle: &PromptBundle) -> String {
        let negative = if bundle.negative_prompt.is_empty() {
            "low quality"
        } else {
            bundle.negative_prompt.as_str()
        };
        format!(
            "Generate a wallpaper image.\n\n\
             Style Target: {}\n\
             Visual Description: {}\n\n\
             Constraint Level: {}\n\
             Instructions: {}\n\n\
             Negative Prompt: {}",
            bundle.style_name,
            bundle.prompt,
            bundle.creativity,
            creativity_instruction(bundle.creativity),
            negative
        )
    }

    /// Prompt for the text-only engine: the mixed prompt plus a `--no` clause.
    pub fn compose_text_prompt(bundle: &PromptBundle) -> String {
        let negative = if bundle.negative_prompt.is_empty() {
            TEXT_IMAGE_DEFAULT_NEGATIVE
        } else {
            bundle.negative_prompt.as_str()
        };
        format!("{} --no {}", bundle.prompt, negative)
    }

    /// Restyle `image_path` according to `bundle` and save the result.
    ///
    /// Yields `Fresh(artifact)` or `Fatal(cause)`; errors never propagate as
    /// panics or early returns so the caller can move on to the next style.
    pub async fn generate_with_reference(
        &self,
        image_path: &Path,
        reference: &ReferenceImage,
        bundle: &PromptBundle,
    ) -> Outcome<GeneratedArtifact> {
        info!(
            "[GENERATOR] Rendering {} (creativity: {})",
            bundle.style_name, bundle.creativity
        );
        let request = Self::compose_request(bundle);
        let response = self
            .synthesis
            .synthesize(&self.model, reference, &request)
            .await;
        self.finish(image_path, bundle, response).await
    }

    /// Generate from the text prompt alone; the result is filed under
    /// `image_path` exactly like a reference-based artifact.
    pub async fn generate_from_text(
        &self,
        image_path: &Path,
        bundle: &PromptBundle,
    ) -> Outcome<GeneratedArtifact> {
        info!(
            "[GENERATOR] Rendering {} from text ({})",
            bundle.style_name, self.text_model
        );
        let prompt = Self::compose_text_prompt(bundle);
        let response = self
            .synthesis
            .generate_images(&self.text_model, &prompt, TEXT_IMAGE_ASPECT_RATIO)
            .await;
        self.finish(image_path, bundle, response).await
    }

    async fn finish(
        &self,
        image_path: &Path,
        bundle: &PromptBundle,
        response: Result<SynthesisResponse>,
    ) -> Outcome<GeneratedArtifact> {
        let saved = match response {
            Ok(response) => self.save(image_path, &bundle.style_key, &response).await,
            Err(e) => Err(e),
        };
        match saved {
            Ok(artifact) => {
                info!("[GENERATOR] Saved: {:?}", artifact.path);
                Outcome::Fresh(artifact)
            }
            Err(e) => {
                error!("[GENERATOR] {} failed: {}", bundle.style_key, e);
                Outcome::Fatal(e)
            }
        }
    }

    async fn save(
        &self,
        image_path: &Path,
        style_key: &str,
        response: &SynthesisResponse,
    ) -> Result<GeneratedArtifact> {
        let Some(bytes) = response.first_image() else {
            if let Some(text) = response.text() {
                warn!("[GENERATOR] Service answered with text only: {}", text);
            }
            return Err(WallpaperError::NoImageData);
        };

        self.layout.ensure_output_dir(image_path)?;
        let (path, created_at) = self.claim_path(image_path, style_key);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| WallpaperError::io(&path, e))?;

        Ok(GeneratedArtifact {
            path,
            style_key: style_key.to_string(),
            created_at,
        })
    }

    /// Pick a stamp whose path is not already on disk.
    fn claim_path(&self, image_path: &Path, style_key: &str) -> (PathBuf, u64) {
        loop {
            let stamp = self.stamps.next();
            let path = self.layout.artifact_path(image_path, style_key, stamp);
            if !path.exists() {
                return (path, stamp);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ContentPart, GeneratedImage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedSynthesis {
        response: Mutex<Vec<Result<SynthesisResponse>>>,
        requests: Mutex<Vec<String>>,
    }

    impl FixedSynthesis {
        fn new(responses: Vec<Result<SynthesisResponse>>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ImageSynthesisService for FixedSynthesis {
        async fn synthesize(
            &self,
            _model: &str,
            _reference: &ReferenceImage,
            instruction: &str,
        ) -> Result<SynthesisResponse> {
            self.requests.lock().unwrap().push(instruction.to_string());
            self.response.lock().unwrap().remove(0)
        }

        async fn generate_images(
            &self,
            model: &str,
            prompt: &str,
            aspect_ratio: &str,
        ) -> Result<SynthesisResponse> {
            self.requests
                .lock()
                .unwrap()
                .push(format!("{model}|{aspect_ratio}|{prompt}"));
            self.response.lock().unwrap().remove(0)
        }
    }

    fn bundle(style_key: &str, creativity: CreativityLevel) -> PromptBundle {
        PromptBundle {
            style_name: "Monet Impressionism".into(),
            style_key: style_key.into(),
            prompt: "a dog, impressionist".into(),
            negative_prompt: "text, watermark".into(),
            creativity,
        }
    }

    fn reference() -> ReferenceImage {
        ReferenceImage::new(vec![1, 2, 3], "image/png")
    }

    #[test]
    fn test_instruction_table_is_total_and_distinct() {
        let all = [
            creativity_instruction(CreativityLevel::Low),
            creativity_instruction(CreativityLevel::Medium),
            creativity_instruction(CreativityLevel::High),
        ];
        assert!(all.iter().all(|s| !s.is_empty()));
        assert_ne!(all[0], all[1]);
        assert_ne!(all[1], all[2]);
        assert_ne!(all[0], all[2]);
        assert_eq!(creativity_instruction(CreativityLevel::parse_lenient("Bananas")), all[1]);
    }

    #[test]
    fn test_request_carries_every_piece() {
        let request = GenerationClient::compose_request(&bundle("monet", CreativityLevel::Low));
        assert!(request.contains("Style Target: Monet Impressionism"));
        assert!(request.contains("Visual Description: a dog, impressionist"));
        assert!(request.contains("Constraint Level: Low"));
        assert!(request.contains(LOW_INSTRUCTION));
        assert!(request.contains("Negative Prompt: text, watermark"));
    }

    #[tokio::test]
    async fn test_inline_image_saved_under_output_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("assets/inputs/Dog/Dog.png");
        let synthesis = FixedSynthesis::new(vec![Ok(SynthesisResponse::InlineParts(vec![
            ContentPart::Text("ok".into()),
            ContentPart::InlineData {
                mime_type: "image/png".into(),
                data: vec![42, 43],
            },
        ]))]);
        let client = GenerationClient::new(synthesis.clone(), OutputLayout::default(), "m");

        let artifact = client
            .generate_with_reference(&input, &reference(), &bundle("monet_impressionism", CreativityLevel::High))
            .await
            .into_result()
            .unwrap();

        let expected_dir = tmp.path().join("assets/outputs/Dog/Dog");
        assert_eq!(artifact.path.parent().unwrap(), expected_dir);
        assert_eq!(
            artifact.path.file_name().unwrap().to_string_lossy(),
            format!("Dog_gen_monet_impressionism_{}.png", artifact.created_at)
        );
        assert_eq!(std::fs::read(&artifact.path).unwrap(), vec![42, 43]);
        assert!(synthesis.requests.lock().unwrap()[0].contains(HIGH_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_same_second_generations_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("inputs/cat.jpg");
        let image = || -> Result<SynthesisResponse> {
            Ok(SynthesisResponse::ImageList(vec![GeneratedImage { bytes: vec![1] }]))
        };
        let client = GenerationClient::new(FixedSynthesis::new(vec![image(), image()]), OutputLayout::default(), "m");
        let b = bundle("ink", CreativityLevel::Medium);

        let first = client.generate_with_reference(&input, &reference(), &b).await.into_result().unwrap();
        let second = client.generate_with_reference(&input, &reference(), &b).await.into_result().unwrap();
        assert_ne!(first.path, second.path);
        assert!(second.created_at > first.created_at);
    }

    #[tokio::test]
    async fn test_text_only_response_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("inputs/cat.jpg");
        let synthesis = FixedSynthesis::new(vec![Ok(SynthesisResponse::InlineParts(vec![
            ContentPart::Text("I cannot do that".into()),
        ]))]);
        let client = GenerationClient::new(synthesis, OutputLayout::default(), "m");
        let outcome = client
            .generate_with_reference(&input, &reference(), &bundle("ink", CreativityLevel::Low))
            .await;
        assert!(matches!(outcome, Outcome::Fatal(WallpaperError::NoImageData)));
        assert!(!tmp.path().join("outputs").exists());
    }

    #[tokio::test]
    async fn test_service_error_is_fatal_not_panic() {
        let tmp = tempfile::tempdir().unwrap();
        let synthesis = FixedSynthesis::new(vec![Err(WallpaperError::Service {
            status: 500,
            body: "boom".into(),
        })]);
        let client = GenerationClient::new(synthesis, OutputLayout::default(), "m");
        let outcome = client
            .generate_with_reference(&tmp.path().join("inputs/x.png"), &reference(), &bundle("ink", CreativityLevel::Low))
            .await;
        assert!(outcome.is_fatal());
    }

    #[test]
    fn test_text_prompt_carries_negative_clause() {
        let b = bundle("ink", CreativityLevel::Low);
        assert_eq!(
            GenerationClient::compose_text_prompt(&b),
            "a dog, impressionist --no text, watermark"
        );
        let bare = PromptBundle {
            negative_prompt: String::new(),
            ..b
        };
        assert!(GenerationClient::compose_text_prompt(&bare).ends_with("--no text, watermark"));
    }

    #[tokio::test]
    async fn test_text_engine_files_image_list_under_input() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("assets/inputs/italy.jpg");
        let synthesis = FixedSynthesis::new(vec![Ok(SynthesisResponse::ImageList(vec![
            GeneratedImage { bytes: vec![] },
            GeneratedImage { bytes: vec![7, 7] },
        ]))]);
        let client = GenerationClient::new(synthesis.clone(), OutputLayout::default(), "m")
            .with_text_model("imagen-test");

        let artifact = client
            .generate_from_text(&input, &bundle("cyberpunk_neon", CreativityLevel::Medium))
            .await
            .into_result()
            .unwrap();

        assert_eq!(
            artifact.path.parent().unwrap(),
            tmp.path().join("assets/outputs/italy")
        );
        assert_eq!(std::fs::read(&artifact.path).unwrap(), vec![7, 7]);
        let request = synthesis.requests.lock().unwrap()[0].clone();
        assert!(request.starts_with("imagen-test|3:4|a dog, impressionist --no"));
    }
}
