// SYNOID Wallpaper - Gemini REST Adapter
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Vision analysis and image synthesis go through `generateContent`, video
// synthesis through `predictLongRunning` plus operation polling. Response
// bodies are decoded here and nowhere else.

use super::{
    ContentPart, GeneratedImage, ImageSynthesisService, JobHandle, JobStatus, SynthesisResponse,
    VideoRequest, VideoSynthesisService, VisionService,
};
use crate::config::AppConfig;
use crate::error::{Result, WallpaperError};
use crate::imaging::ReferenceImage;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";
const SAFETY_FILTER_LEVEL: &str = "block_low_and_above";
const PERSON_GENERATION: &str = "allow_adult";

pub struct GeminiClient {
    client: Client,
    api_base: Url,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::with_base(config.api_base.clone(), &config.api_key, config.http_timeout)
    }

    pub fn with_base(api_base: Url, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base,
            api_key: api_key.to_string(),
        })
    }

    fn base(&self) -> &str {
        self.api_base.as_str().trim_end_matches('/')
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base(), model, method)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        debug!("[GEMINI] POST {}", url);
        let resp = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn generate_content(
        &self,
        model: &str,
        image: &ReferenceImage,
        instruction: &str,
        generation_config: Option<Value>,
    ) -> Result<GenerateContentResponse> {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inline_data": { "mime_type": image.mime_type, "data": BASE64.encode(&image.bytes) } },
                    { "text": instruction }
                ]
            }]
        });
        if let Some(config) = generation_config {
            body["generationConfig"] = config;
        }

        let value = self
            .post_json(&self.model_url(model, "generateContent"), &body)
            .await?;
        serde_json::from_value(value).map_err(|e| WallpaperError::Parse(e.to_string()))
    }
}

async fn read_json(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(WallpaperError::Service {
            status: status.as_u16(),
            body: truncate(&body, 200),
        });
    }
    resp.json::<Value>()
        .await
        .map_err(|e| WallpaperError::Parse(e.to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// --- Wire shapes ---

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, alias = "generated_images")]
    generated_images: Vec<WireGeneratedImage>,
    #[serde(default)]
    predictions: Vec<WirePrediction>,
    #[serde(default, alias = "prompt_feedback")]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    #[serde(alias = "inline_data")]
    inline_data: Option<WireBlob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    #[serde(default, alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct WireGeneratedImage {
    image: WireImage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireImage {
    #[serde(alias = "image_bytes")]
    image_bytes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePrediction {
    bytes_base64_encoded: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    name: Option<String>,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<VideoSample>,
}

#[derive(Debug, Deserialize)]
struct VideoSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

fn decode_base64(data: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(data.trim())
        .map_err(|e| WallpaperError::Parse(format!("invalid base64 payload: {}", e)))
}

fn decode_synthesis(resp: GenerateContentResponse) -> Result<SynthesisResponse> {
    if !resp.generated_images.is_empty() {
        let images = resp
            .generated_images
            .iter()
            .map(|g| decode_base64(&g.image.image_bytes).map(|bytes| GeneratedImage { bytes }))
            .collect::<Result<Vec<_>>>()?;
        return Ok(SynthesisResponse::ImageList(images));
    }

    let predictions: Vec<&str> = resp
        .predictions
        .iter()
        .filter_map(|p| p.bytes_base64_encoded.as_deref())
        .collect();
    if !predictions.is_empty() {
        let images = predictions
            .into_iter()
            .map(|b64| decode_base64(b64).map(|bytes| GeneratedImage { bytes }))
            .collect::<Result<Vec<_>>>()?;
        return Ok(SynthesisResponse::ImageList(images));
    }

    if let Some(feedback) = &resp.prompt_feedback {
        debug!("[GEMINI] Prompt feedback: {}", feedback);
    }

    let parts = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .map(|part| match (part.inline_data, part.text) {
            (Some(blob), _) => decode_base64(&blob.data).map(|data| ContentPart::InlineData {
                mime_type: blob.mime_type,
                data,
            }),
            (None, text) => Ok(ContentPart::Text(text.unwrap_or_default())),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SynthesisResponse::InlineParts(parts))
}

fn first_text(resp: &GenerateContentResponse) -> Result<String> {
    resp.candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| WallpaperError::Parse("no text in response".to_string()))
}

fn decode_operation(op: Operation) -> JobStatus {
    if let Some(err) = op.error {
        return JobStatus::Failed(err.message);
    }
    if !op.done {
        return JobStatus::Running;
    }
    let video_uri = op
        .response
        .and_then(|r| r.generate_video_response)
        .and_then(|r| r.generated_samples.into_iter().next())
        .and_then(|s| s.video)
        .and_then(|v| v.uri);
    JobStatus::Done { video_uri }
}

#[async_trait]
impl VisionService for GeminiClient {
    async fn describe(
        &self,
        model: &str,
        image: &ReferenceImage,
        instruction: &str,
        json_output: bool,
    ) -> Result<String> {
        let config = json_output.then(|| json!({ "responseMimeType": "application/json" }));
        let resp = self.generate_content(model, image, instruction, config).await?;
        first_text(&resp)
    }
}

#[async_trait]
impl ImageSynthesisService for GeminiClient {
    async fn synthesize(
        &self,
        model: &str,
        reference: &ReferenceImage,
        instruction: &str,
    ) -> Result<SynthesisResponse> {
        let resp = self.generate_content(model, reference, instruction, None).await?;
        decode_synthesis(resp)
    }

    async fn generate_images(
        &self,
        model: &str,
        prompt: &str,
        aspect_ratio: &str,
    ) -> Result<SynthesisResponse> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": aspect_ratio,
                "safetySetting": SAFETY_FILTER_LEVEL,
                "personGeneration": PERSON_GENERATION
            }
        });
        let value = self.post_json(&self.model_url(model, "predict"), &body).await?;
        let resp: GenerateContentResponse =
            serde_json::from_value(value).map_err(|e| WallpaperError::Parse(e.to_string()))?;
        decode_synthesis(resp)
    }
}

#[async_trait]
impl VideoSynthesisService for GeminiClient {
    async fn submit(&self, model: &str, request: &VideoRequest) -> Result<JobHandle> {
        let body = json!({
            "instances": [{
                "prompt": request.prompt,
                "image": {
                    "bytesBase64Encoded": BASE64.encode(&request.image.bytes),
                    "mimeType": request.image.mime_type
                }
            }],
            "parameters": {
                "aspectRatio": request.aspect_ratio,
                "durationSeconds": request.duration_secs
            }
        });
        let value = self
            .post_json(&self.model_url(model, "predictLongRunning"), &body)
            .await?;
        let op: Operation =
            serde_json::from_value(value).map_err(|e| WallpaperError::Parse(e.to_string()))?;
        let name = op
            .name
            .ok_or_else(|| WallpaperError::Parse("operation handle missing name".to_string()))?;
        info!("[GEMINI] Video job submitted: {}", name);
        Ok(JobHandle { name })
    }

    async fn poll(&self, job: &JobHandle) -> Result<JobStatus> {
        let url = format!("{}/{}", self.base(), job.name.trim_start_matches('/'));
        let resp = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let value = read_json(resp).await?;
        let op: Operation =
            serde_json::from_value(value).map_err(|e| WallpaperError::Parse(e.to_string()))?;
        Ok(decode_operation(op))
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WallpaperError::Service {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}
