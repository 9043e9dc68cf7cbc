// SYNOID Wallpaper - Motion Director
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Turns a generated still into a short loopable clip:
//   Idle -> StyleParsed -> PromptGenerated -> JobSubmitted -> Polling* -> Downloaded | Failed
// Style recovery and prompt synthesis degrade to safe fallbacks; a failed
// submission, poll or download ends that single motion request.

use crate::config::PollPolicy;
use crate::error::{Outcome, Result, WallpaperError};
use crate::imaging::{self, ReferenceImage};
use crate::layout::{self, DEFAULT_STYLE_KEY};
use crate::services::{JobHandle, JobStatus, VideoRequest, VideoSynthesisService, VisionService};
use crate::styles::{StyleCatalog, DEFAULT_MOTION_GUIDE};
use crate::types::MotionScript;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const FALLBACK_VIDEO_PROMPT: &str =
    "Cinemagraph, static camera, subtle ambient motion, high quality, loopable.";
pub const VIDEO_ASPECT_RATIO: &str = "16:9";
pub const VIDEO_DURATION_SECS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotionStage {
    Idle,
    StyleParsed,
    PromptGenerated,
    JobSubmitted,
    Polling { attempt: u32 },
    Downloaded,
    Failed,
}

impl MotionStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Downloaded | Self::Failed)
    }
}

pub struct MotionDirector {
    catalog: Arc<StyleCatalog>,
    vision: Arc<dyn VisionService>,
    video: Arc<dyn VideoSynthesisService>,
    vision_model: String,
    video_model: String,
    poll: PollPolicy,
    stage: MotionStage,
}

impl MotionDirector {
    pub fn new(
        catalog: Arc<StyleCatalog>,
        vision: Arc<dyn VisionService>,
        video: Arc<dyn VideoSynthesisService>,
        vision_model: &str,
        video_model: &str,
        poll: PollPolicy,
    ) -> Self {
        Self {
            catalog,
            vision,
            video,
            vision_model: vision_model.to_string(),
            video_model: video_model.to_string(),
            poll,
            stage: MotionStage::Idle,
        }
    }

    pub fn stage(&self) -> &MotionStage {
        &self.stage
    }

    fn advance(&mut self, next: MotionStage) {
        debug!("[DIRECTOR] {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    /// Style key embedded in a generated artifact's filename, or `"default"`.
    pub fn parse_style_from_filename(&self, path: &Path) -> Outcome<String> {
        match layout::style_key_from_file_name(path) {
            Some(key) => Outcome::Fresh(key),
            None => {
                warn!("[DIRECTOR] No style marker in {:?}, using '{}'", path, DEFAULT_STYLE_KEY);
                Outcome::recovered(
                    DEFAULT_STYLE_KEY.to_string(),
                    WallpaperError::Parse(format!("no generated-style marker in {:?}", path)),
                )
            }
        }
    }

    pub fn build_director_prompt(&self, style_key: &str) -> String {
        let motion_guide = self
            .catalog
            .lookup(style_key)
            .map(|s| s.motion_guide.as_str())
            .unwrap_or(DEFAULT_MOTION_GUIDE);

        format!(
            r#"# Role: Elite Multi-Style AI Motion Director

# Style Logic:
Respect the medium (Painting/Anime/3D/Photo). Style Principle: {motion_guide}

# Core Mission:
Design a "Living Moment" for a wallpaper. It must have a subtle "Story" behind the motion.

# Motion Strategy (The "10% Rule"):
1. **Stable World**: Start with "Cinemagraph, Static Camera." The environment is the stage, it must remain steady.
2. **Purposeful Subject Motion**: Characters or animals should NOT be frozen.
   - Allow micro-interactions: two subjects might glance at each other, a dog might tilt its head, a bird might preen its feathers.
   - Movement stays within a small 10% radius of the original spot.
   - Movements are intentional (e.g. "looking at the horizon"), never random jitter.
3. **Artistic Secondary Motion**:
   - In paintings (e.g. ink, Van Gogh): animate the texture or brushstrokes as if the paint is alive.
   - In nature: wind and light complement the subjects' actions.
4. **Loopability**: All movements must resolve back to the starting pose smoothly for a perfect infinite loop.

# Output Format:
Provide ONLY the final video prompt in a single English paragraph. Focus on the interaction and the story of the micro-movements."#
        )
    }

    /// Ask the vision service for a short, loopable motion description.
    pub async fn analyze_scene_for_motion(
        &self,
        image: &ReferenceImage,
        style_key: &str,
    ) -> Outcome<String> {
        info!("[DIRECTOR] Analyzing scene dynamics (style: {})...", style_key);
        let instruction = self.build_director_prompt(style_key);
        match self
            .vision
            .describe(&self.vision_model, image, &instruction, false)
            .await
        {
            Ok(text) if !text.trim().is_empty() => {
                let prompt = text.trim().to_string();
                info!("[DIRECTOR] Script: {}", prompt);
                Outcome::Fresh(prompt)
            }
            Ok(_) => Outcome::recovered(
                FALLBACK_VIDEO_PROMPT.to_string(),
                WallpaperError::Parse("empty motion prompt".to_string()),
            ),
            Err(e) => {
                error!("[DIRECTOR] Motion analysis failed: {}", e);
                Outcome::recovered(FALLBACK_VIDEO_PROMPT.to_string(), e)
            }
        }
    }

    /// Style recovery plus prompt synthesis for one artifact.
    pub async fn create_motion_script(&mut self, artifact: &Path) -> MotionScript {
        self.advance(MotionStage::Idle);
        let style_detected = self
            .parse_style_from_filename(artifact)
            .into_value()
            .unwrap_or_else(|| DEFAULT_STYLE_KEY.to_string());
        self.advance(MotionStage::StyleParsed);

        let video_prompt = match imaging::load_reference_image(artifact) {
            Ok(image) => self
                .analyze_scene_for_motion(&image, &style_detected)
                .await
                .into_value()
                .unwrap_or_else(|| FALLBACK_VIDEO_PROMPT.to_string()),
            Err(e) => {
                error!("[DIRECTOR] Cannot load {:?}: {}", artifact, e);
                FALLBACK_VIDEO_PROMPT.to_string()
            }
        };
        self.advance(MotionStage::PromptGenerated);

        MotionScript {
            source_image: artifact.to_path_buf(),
            style_detected,
            video_prompt,
        }
    }

    /// Submit the video job, poll it to completion and save the clip next to
    /// the source artifact.
    pub async fn generate_video(
        &mut self,
        artifact: &Path,
        video_prompt: &str,
        cancel: &CancellationToken,
    ) -> Outcome<PathBuf> {
        info!("[DIRECTOR] Rolling camera on {:?}", artifact);
        match self.run_video_job(artifact, video_prompt, cancel).await {
            Ok(path) => {
                self.advance(MotionStage::Downloaded);
                info!("[DIRECTOR] Video saved: {:?}", path);
                Outcome::Fresh(path)
            }
            Err(e) => {
                self.advance(MotionStage::Failed);
                error!("[DIRECTOR] Video generation failed: {}", e);
                Outcome::Fatal(e)
            }
        }
    }

    async fn run_video_job(
        &mut self,
        artifact: &Path,
        video_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let bytes = tokio::fs::read(artifact)
            .await
            .map_err(|e| WallpaperError::io(artifact, e))?;
        let request = VideoRequest {
            image: ReferenceImage::new(bytes, imaging::mime_for_path(artifact)),
            prompt: video_prompt.to_string(),
            aspect_ratio: VIDEO_ASPECT_RATIO.to_string(),
            duration_secs: VIDEO_DURATION_SECS,
        };

        let job = until_cancelled(cancel, self.video.submit(&self.video_model, &request)).await?;
        self.advance(MotionStage::JobSubmitted);
        info!("[DIRECTOR] Job submitted ({}), rendering in the cloud...", job.name);

        let uri = self.wait_for_job(&job, cancel).await?;
        info!("[DIRECTOR] Download link: {}", uri);

        let video = until_cancelled(cancel, self.video.download(&uri)).await?;
        let output = layout::video_path_for(artifact);
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WallpaperError::io(parent, e))?;
        }
        tokio::fs::write(&output, video)
            .await
            .map_err(|e| WallpaperError::io(&output, e))?;
        Ok(output)
    }

    /// Poll until the job reports done, bounded by attempts, wall clock and
    /// the cancellation token. A failed poll uses up an attempt.
    async fn wait_for_job(&mut self, job: &JobHandle, cancel: &CancellationToken) -> Result<String> {
        let started = Instant::now();
        let deadline = started + self.poll.timeout;
        let mut attempt: u32 = 0;

        loop {
            let now = Instant::now();
            if attempt >= self.poll.max_attempts || now >= deadline {
                return Err(timed_out(job, attempt, started));
            }

            let delay = self.poll.delay_for(attempt).min(deadline - now);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("[DIRECTOR] Job {} cancelled after {} polls", job.name, attempt);
                    return Err(WallpaperError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
            self.advance(MotionStage::Polling { attempt });
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("[DIRECTOR] Job {} cancelled during poll {}", job.name, attempt);
                    return Err(WallpaperError::Cancelled);
                }
                status = self.video.poll(job) => status,
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(timed_out(job, attempt, started));
                }
            };

            match status {
                Ok(JobStatus::Running) => continue,
                Ok(JobStatus::Done {
                    video_uri: Some(uri),
                }) => return Ok(uri),
                Ok(JobStatus::Done { video_uri: None }) => {
                    return Err(WallpaperError::JobFailed {
                        job: job.name.clone(),
                        reason: "job finished without a video".to_string(),
                    })
                }
                Ok(JobStatus::Failed(reason)) => {
                    return Err(WallpaperError::JobFailed {
                        job: job.name.clone(),
                        reason,
                    })
                }
                Err(e) => {
                    warn!("[DIRECTOR] Poll {} of {} failed, retrying: {}", attempt, job.name, e);
                }
            }
        }
    }
}

/// Run a service request unless the token fires first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    request: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WallpaperError::Cancelled),
        result = request => result,
    }
}

fn timed_out(job: &JobHandle, attempts: u32, started: Instant) -> WallpaperError {
    WallpaperError::JobTimedOut {
        job: job.name.clone(),
        attempts,
        elapsed_secs: started.elapsed().as_secs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct EchoVision {
        answer: Result<String>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VisionService for EchoVision {
        async fn describe(
            &self,
            _model: &str,
            _image: &ReferenceImage,
            instruction: &str,
            _json_output: bool,
        ) -> Result<String> {
            self.seen.lock().unwrap().push(instruction.to_string());
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(WallpaperError::Service {
                    status: 500,
                    body: "down".into(),
                }),
            }
        }
    }

    struct ScriptedVideo {
        statuses: Mutex<VecDeque<JobStatus>>,
        download: Result<Vec<u8>>,
        polls: Mutex<u32>,
        failing_polls: Mutex<u32>,
        hang_polls: bool,
    }

    #[async_trait]
    impl VideoSynthesisService for ScriptedVideo {
        async fn submit(&self, _model: &str, request: &VideoRequest) -> Result<JobHandle> {
            assert_eq!(request.aspect_ratio, "16:9");
            assert_eq!(request.duration_secs, 4);
            Ok(JobHandle {
                name: "operations/test".into(),
            })
        }

        async fn poll(&self, _job: &JobHandle) -> Result<JobStatus> {
            *self.polls.lock().unwrap() += 1;
            if self.hang_polls {
                std::future::pending::<()>().await;
            }
            {
                let mut failing = self.failing_polls.lock().unwrap();
                if *failing > 0 {
                    *failing -= 1;
                    return Err(WallpaperError::Service {
                        status: 503,
                        body: "busy".into(),
                    });
                }
            }
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(JobStatus::Running))
        }

        async fn download(&self, _uri: &str) -> Result<Vec<u8>> {
            match &self.download {
                Ok(bytes) => Ok(bytes.clone()),
                Err(_) => Err(WallpaperError::Service {
                    status: 403,
                    body: "forbidden".into(),
                }),
            }
        }
    }

    fn fast_poll(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            backoff: 1.0,
            max_attempts,
            timeout: Duration::from_secs(5),
        }
    }

    fn catalog() -> Arc<StyleCatalog> {
        Arc::new(
            StyleCatalog::from_yaml_str(
                "styles:\n  new_chinese_ink:\n    name: Ink\n    motion_guide: \"Ink diffuses like breathing.\"\n",
            )
            .unwrap(),
        )
    }

    fn director(
        vision_answer: Result<String>,
        statuses: Vec<JobStatus>,
        download: Result<Vec<u8>>,
        poll: PollPolicy,
    ) -> (MotionDirector, Arc<EchoVision>, Arc<ScriptedVideo>) {
        let vision = Arc::new(EchoVision {
            answer: vision_answer,
            seen: Mutex::new(Vec::new()),
        });
        let video = Arc::new(ScriptedVideo {
            statuses: Mutex::new(statuses.into()),
            download,
            polls: Mutex::new(0),
            failing_polls: Mutex::new(0),
            hang_polls: false,
        });
        let director = MotionDirector::new(catalog(), vision.clone(), video.clone(), "v", "veo", poll);
        (director, vision, video)
    }

    fn write_png(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_parse_style_from_filename() {
        let (d, _, _) = director(Ok("x".into()), vec![], Ok(vec![]), fast_poll(1));
        let key = d.parse_style_from_filename(Path::new("cat_gen_makoto_shinkai_1737244800.png"));
        assert!(matches!(&key, Outcome::Fresh(k) if k == "makoto_shinkai"));

        let key = d.parse_style_from_filename(Path::new("cat.png"));
        assert!(key.is_recovered());
        assert_eq!(key.into_value().unwrap(), "default");
    }

    #[test]
    fn test_director_prompt_uses_motion_guide() {
        let (d, _, _) = director(Ok("x".into()), vec![], Ok(vec![]), fast_poll(1));
        let prompt = d.build_director_prompt("new_chinese_ink");
        assert!(prompt.contains("Ink diffuses like breathing."));
        assert!(prompt.contains("Static Camera"));
        assert!(prompt.contains("10%"));
        assert!(prompt.contains("Loopability"));

        let prompt = d.build_director_prompt("default");
        assert!(prompt.contains(DEFAULT_MOTION_GUIDE));
    }

    #[tokio::test]
    async fn test_motion_script_from_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("bird_gen_new_chinese_ink_1768549683.png");
        write_png(&artifact);

        let (mut d, vision, _) = director(
            Ok("  The bird preens, then settles back.  ".into()),
            vec![],
            Ok(vec![]),
            fast_poll(1),
        );
        let script = d.create_motion_script(&artifact).await;
        assert_eq!(script.style_detected, "new_chinese_ink");
        assert_eq!(script.video_prompt, "The bird preens, then settles back.");
        assert_eq!(d.stage(), &MotionStage::PromptGenerated);
        assert!(vision.seen.lock().unwrap()[0].contains("Ink diffuses"));
    }

    #[tokio::test]
    async fn test_vision_failure_uses_fallback_prompt() {
        let (d, _, _) = director(
            Err(WallpaperError::Cancelled),
            vec![],
            Ok(vec![]),
            fast_poll(1),
        );
        let outcome = d
            .analyze_scene_for_motion(&ReferenceImage::new(vec![0], "image/png"), "default")
            .await;
        assert!(outcome.is_recovered());
        assert_eq!(outcome.into_value().unwrap(), FALLBACK_VIDEO_PROMPT);
    }

    #[tokio::test]
    async fn test_video_polls_until_done_and_downloads() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("Dog_gen_monet_impressionism_1768752448.png");
        write_png(&artifact);

        let (mut d, _, video) = director(
            Ok("x".into()),
            vec![
                JobStatus::Running,
                JobStatus::Running,
                JobStatus::Done {
                    video_uri: Some("https://files/v.mp4".into()),
                },
            ],
            Ok(b"mp4 bytes".to_vec()),
            fast_poll(10),
        );
        let outcome = d
            .generate_video(&artifact, "prompt", &CancellationToken::new())
            .await;
        let path = outcome.into_result().unwrap();
        assert_eq!(path, tmp.path().join("Dog_gen_monet_impressionism_1768752448_raw.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"mp4 bytes");
        assert_eq!(*video.polls.lock().unwrap(), 3);
        assert_eq!(d.stage(), &MotionStage::Downloaded);
    }

    #[tokio::test]
    async fn test_poll_gives_up_after_max_attempts() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("a_gen_x_1.png");
        write_png(&artifact);

        let (mut d, _, video) = director(Ok("x".into()), vec![], Ok(vec![]), fast_poll(3));
        let outcome = d
            .generate_video(&artifact, "prompt", &CancellationToken::new())
            .await;
        assert!(matches!(
            outcome,
            Outcome::Fatal(WallpaperError::JobTimedOut { attempts: 3, .. })
        ));
        assert_eq!(*video.polls.lock().unwrap(), 3);
        assert!(d.stage().is_terminal());
    }

    #[tokio::test]
    async fn test_cancelled_job_stops_polling() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("a_gen_x_1.png");
        write_png(&artifact);

        let (mut d, _, video) = director(Ok("x".into()), vec![], Ok(vec![]), fast_poll(1000));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = d.generate_video(&artifact, "prompt", &cancel).await;
        assert!(matches!(outcome, Outcome::Fatal(WallpaperError::Cancelled)));
        assert_eq!(*video.polls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_job_without_video_or_bad_download_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("a_gen_x_1.png");
        write_png(&artifact);

        let (mut d, _, _) = director(
            Ok("x".into()),
            vec![JobStatus::Done { video_uri: None }],
            Ok(vec![]),
            fast_poll(5),
        );
        let outcome = d.generate_video(&artifact, "p", &CancellationToken::new()).await;
        assert!(matches!(outcome, Outcome::Fatal(WallpaperError::JobFailed { .. })));

        let (mut d, _, _) = director(
            Ok("x".into()),
            vec![JobStatus::Done {
                video_uri: Some("https://files/v.mp4".into()),
            }],
            Err(WallpaperError::Cancelled),
            fast_poll(5),
        );
        let outcome = d.generate_video(&artifact, "p", &CancellationToken::new()).await;
        assert!(matches!(
            outcome,
            Outcome::Fatal(WallpaperError::Service { status: 403, .. })
        ));
        assert!(!tmp.path().join("a_gen_x_1_raw.mp4").exists());
    }

    #[tokio::test]
    async fn test_failed_polls_are_retried() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("a_gen_x_1.png");
        write_png(&artifact);

        let (mut d, _, video) = director(
            Ok("x".into()),
            vec![JobStatus::Done {
                video_uri: Some("https://files/v.mp4".into()),
            }],
            Ok(b"clip".to_vec()),
            fast_poll(5),
        );
        *video.failing_polls.lock().unwrap() = 2;

        let path = d
            .generate_video(&artifact, "p", &CancellationToken::new())
            .await
            .into_result()
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"clip");
        assert_eq!(*video.polls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_polls_still_use_up_attempts() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("a_gen_x_1.png");
        write_png(&artifact);

        let (mut d, _, video) = director(Ok("x".into()), vec![], Ok(vec![]), fast_poll(2));
        *video.failing_polls.lock().unwrap() = 10;

        let outcome = d.generate_video(&artifact, "p", &CancellationToken::new()).await;
        assert!(matches!(
            outcome,
            Outcome::Fatal(WallpaperError::JobTimedOut { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_wall_clock_bound_cuts_long_backoff() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("a_gen_x_1.png");
        write_png(&artifact);

        let poll = PollPolicy {
            interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(30),
            backoff: 1.0,
            max_attempts: 100,
            timeout: Duration::from_millis(50),
        };
        let (mut d, _, _) = director(Ok("x".into()), vec![], Ok(vec![]), poll);

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            d.generate_video(&artifact, "p", &CancellationToken::new()),
        )
        .await
        .expect("deadline honoured");
        assert!(matches!(outcome, Outcome::Fatal(WallpaperError::JobTimedOut { .. })));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_poll() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("a_gen_x_1.png");
        write_png(&artifact);

        let vision = Arc::new(EchoVision {
            answer: Ok("x".into()),
            seen: Mutex::new(Vec::new()),
        });
        let video = Arc::new(ScriptedVideo {
            statuses: Mutex::new(VecDeque::new()),
            download: Ok(vec![]),
            polls: Mutex::new(0),
            failing_polls: Mutex::new(0),
            hang_polls: true,
        });
        let mut d = MotionDirector::new(catalog(), vision, video.clone(), "v", "veo", fast_poll(10));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            d.generate_video(&artifact, "p", &cancel),
        )
        .await
        .expect("cancellation honoured");
        assert!(matches!(outcome, Outcome::Fatal(WallpaperError::Cancelled)));
        assert_eq!(*video.polls.lock().unwrap(), 1);
    }
}
