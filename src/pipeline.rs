// SYNOID Wallpaper - Pipeline Controller
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Photo in, wallpapers out: analyze once, then mix and generate per
// recommended style, strictly in recommendation order. One style failing
// never stops the others.

use crate::analyzer::AnalysisClient;
use crate::error::{Outcome, Result, WallpaperError};
use crate::generator::GenerationClient;
use crate::imaging;
use crate::mixer::PromptMixer;
use crate::motion::MotionDirector;
use crate::types::{GeneratedArtifact, MotionScript};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct PipelineReport {
    pub description: String,
    pub reasoning: String,
    pub analysis_recovered: bool,
    /// Number of styles the analysis asked for.
    pub recommended: usize,
    pub artifacts: Vec<GeneratedArtifact>,
    pub failures: Vec<(String, WallpaperError)>,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn artifact_paths(&self) -> Vec<&Path> {
        self.artifacts.iter().map(|a| a.path.as_path()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Which synthesis path turns a recommendation into an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationEngine {
    /// Restyle the input photo itself.
    #[default]
    Reference,
    /// Render from the mixed text prompt only.
    TextOnly,
}

/// Result of animating one artifact.
#[derive(Debug)]
pub struct MotionRun {
    pub script: MotionScript,
    pub video: Outcome<PathBuf>,
}

pub struct PipelineController {
    analyzer: AnalysisClient,
    mixer: PromptMixer,
    generator: GenerationClient,
    engine: GenerationEngine,
    director: Option<MotionDirector>,
}

impl PipelineController {
    pub fn new(analyzer: AnalysisClient, mixer: PromptMixer, generator: GenerationClient) -> Self {
        Self {
            analyzer,
            mixer,
            generator,
            engine: GenerationEngine::default(),
            director: None,
        }
    }

    pub fn with_engine(mut self, engine: GenerationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_director(mut self, director: MotionDirector) -> Self {
        self.director = Some(director);
        self
    }

    /// Analyze `input` and generate up to `top_k` restyled wallpapers.
    ///
    /// Only an unreadable input image aborts the run; everything after that
    /// is collected into the report.
    pub async fn run(&self, input: &Path, top_k: usize) -> Result<PipelineReport> {
        let started = Instant::now();
        info!("[PIPELINE] Processing {:?}", input);

        let reference = imaging::load_reference_image(input)?;

        let analysis = self.analyzer.analyze_and_recommend(&reference, top_k).await;
        let analysis_recovered = analysis.is_recovered();
        if let Outcome::Recovered { cause, .. } = &analysis {
            warn!("[PIPELINE] Using fallback plan ({})", cause);
        }
        let plan = analysis.into_result()?;

        info!("[PIPELINE] Description: {}", preview(&plan.description, 100));
        if !plan.reasoning.is_empty() {
            info!("[PIPELINE] Reasoning: {}", plan.reasoning);
        }

        let total = plan.recommendations.len();
        let mut artifacts = Vec::with_capacity(total);
        let mut failures = Vec::new();

        if total == 0 {
            warn!("[PIPELINE] Analysis returned no recommendations, nothing to generate");
        }

        for (i, item) in plan.recommendations.iter().enumerate() {
            info!(
                "[PIPELINE] [{}/{}] {} (creativity: {})",
                i + 1,
                total,
                item.style_key,
                item.creativity
            );
            let bundle = self
                .mixer
                .mix(&item.style_key, &plan.description)
                .with_creativity(item.creativity);

            let outcome = match self.engine {
                GenerationEngine::Reference => {
                    self.generator
                        .generate_with_reference(input, &reference, &bundle)
                        .await
                }
                GenerationEngine::TextOnly => self.generator.generate_from_text(input, &bundle).await,
            };
            match outcome {
                Outcome::Fresh(artifact) | Outcome::Recovered { value: artifact, .. } => {
                    artifacts.push(artifact)
                }
                Outcome::Fatal(e) => {
                    error!("[PIPELINE] Skipping {}: {}", item.style_key, e);
                    failures.push((item.style_key.clone(), e));
                }
            }
        }

        let elapsed = started.elapsed();
        info!(
            "[PIPELINE] Done in {:.1}s: {} generated, {} failed",
            elapsed.as_secs_f64(),
            artifacts.len(),
            failures.len()
        );

        Ok(PipelineReport {
            description: plan.description,
            reasoning: plan.reasoning,
            analysis_recovered,
            recommended: total,
            artifacts,
            failures,
            elapsed,
        })
    }

    /// Animate every artifact in `report`, in order. No-op without a director.
    pub async fn animate(
        &mut self,
        report: &PipelineReport,
        cancel: &CancellationToken,
    ) -> Vec<MotionRun> {
        let Some(director) = self.director.as_mut() else {
            return Vec::new();
        };

        let mut runs = Vec::with_capacity(report.artifacts.len());
        for artifact in &report.artifacts {
            if cancel.is_cancelled() {
                warn!("[PIPELINE] Animation cancelled");
                break;
            }
            let script = director.create_motion_script(&artifact.path).await;
            let video = director
                .generate_video(&artifact.path, &script.video_prompt, cancel)
                .await;
            runs.push(MotionRun { script, video });
        }
        runs
    }
}

/// First `max` characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}
