// SYNOID Wallpaper - External AI Service Seams
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Every component talks to the outside world through these traits. The
// Gemini adapter implements all three; tests plug in scripted fakes.

pub mod gemini;

use crate::error::Result;
use crate::imaging::ReferenceImage;
use async_trait::async_trait;

pub use gemini::GeminiClient;

/// One record of an image-list style response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

/// The closed set of shapes an image-synthesis response can take.
/// Decoded once at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisResponse {
    ImageList(Vec<GeneratedImage>),
    InlineParts(Vec<ContentPart>),
}

impl SynthesisResponse {
    /// Binary payload of the first generated image, if any.
    pub fn first_image(&self) -> Option<&[u8]> {
        match self {
            Self::ImageList(images) => images
                .iter()
                .map(|img| img.bytes.as_slice())
                .find(|bytes| !bytes.is_empty()),
            Self::InlineParts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::InlineData { mime_type, data }
                    if !data.is_empty() && (mime_type.is_empty() || mime_type.starts_with("image/")) =>
                {
                    Some(data.as_slice())
                }
                _ => None,
            }),
        }
    }

    /// Any text the service returned alongside (or instead of) an image.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::ImageList(_) => None,
            Self::InlineParts(parts) => {
                let text: Vec<&str> = parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Text(t) => Some(t.as_str()),
                        _ => None,
                    })
                    .collect();
                if text.is_empty() {
                    None
                } else {
                    Some(text.join(" "))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub image: ReferenceImage,
    pub prompt: String,
    pub aspect_ratio: String,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    /// Finished; `video_uri` is `None` when the job produced nothing.
    Done { video_uri: Option<String> },
    Failed(String),
}

#[async_trait]
pub trait VisionService: Send + Sync {
    /// Send an image plus instruction and return the model's text answer.
    /// With `json_output` the service is asked for a JSON document.
    async fn describe(
        &self,
        model: &str,
        image: &ReferenceImage,
        instruction: &str,
        json_output: bool,
    ) -> Result<String>;
}

#[async_trait]
pub trait ImageSynthesisService: Send + Sync {
    /// Restyle `reference` following `instruction`.
    async fn synthesize(
        &self,
        model: &str,
        reference: &ReferenceImage,
        instruction: &str,
    ) -> Result<SynthesisResponse>;

    /// Text-only generation of a single image at `aspect_ratio` (e.g. `"3:4"`).
    async fn generate_images(
        &self,
        model: &str,
        prompt: &str,
        aspect_ratio: &str,
    ) -> Result<SynthesisResponse>;
}

#[async_trait]
pub trait VideoSynthesisService: Send + Sync {
    async fn submit(&self, model: &str, request: &VideoRequest) -> Result<JobHandle>;

    async fn poll(&self, job: &JobHandle) -> Result<JobStatus>;

    /// Fetch a finished video. Non-success HTTP statuses are errors.
    async fn download(&self, uri: &str) -> Result<Vec<u8>>;
}
