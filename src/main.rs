// SYNOID Wallpaper - Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use synoid_wallpaper::analyzer::AnalysisClient;
use synoid_wallpaper::config::AppConfig;
use synoid_wallpaper::generator::GenerationClient;
use synoid_wallpaper::layout::OutputLayout;
use synoid_wallpaper::mixer::PromptMixer;
use synoid_wallpaper::motion::MotionDirector;
use synoid_wallpaper::pipeline::{preview, GenerationEngine, PipelineController, PipelineReport};
use synoid_wallpaper::services::GeminiClient;
use synoid_wallpaper::styles::StyleCatalog;
use synoid_wallpaper::Outcome;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "synoid-wallpaper")]
#[command(about = "SYNOID Wallpaper: restyle a photo into AI wallpapers", long_about = None)]
#[command(subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input image (JPEG/PNG/HEIC)
    #[arg(short, long, required = true)]
    input: Option<PathBuf>,

    /// Number of styles to recommend and generate
    #[arg(long = "top_k", visible_alias = "top-k", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..))]
    top_k: u32,

    /// Also turn every generated wallpaper into a short loop
    #[arg(long)]
    animate: bool,

    /// Restyle the photo itself, or render each style from text only
    #[arg(long, value_enum, default_value_t = Engine::Reference)]
    engine: Engine,
}

#[derive(Clone, Copy, ValueEnum)]
enum Engine {
    Reference,
    Imagen,
}

impl From<Engine> for GenerationEngine {
    fn from(engine: Engine) -> Self {
        match engine {
            Engine::Reference => GenerationEngine::Reference,
            Engine::Imagen => GenerationEngine::TextOnly,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Animate an existing generated wallpaper
    Motion {
        /// Generated artifact (e.g. Dog_gen_monet_impressionism_1768752448.png)
        #[arg(short, long)]
        input: PathBuf,

        /// Only write the motion script, skip the video job
        #[arg(long)]
        script_only: bool,
    },
}

/// Everything that talks to the outside world, built once per run.
struct Runtime {
    config: AppConfig,
    catalog: Arc<StyleCatalog>,
    gemini: Arc<GeminiClient>,
}

impl Runtime {
    fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env().context("loading configuration")?;
        let catalog = Arc::new(
            StyleCatalog::load(&config.styles_path)
                .with_context(|| format!("loading styles from {:?}", config.styles_path))?,
        );
        let gemini = Arc::new(GeminiClient::new(&config).context("building Gemini client")?);
        info!(
            "[INIT] {} styles loaded, API base {}",
            catalog.len(),
            config.api_base
        );
        Ok(Self {
            config,
            catalog,
            gemini,
        })
    }

    fn director(&self) -> MotionDirector {
        MotionDirector::new(
            self.catalog.clone(),
            self.gemini.clone(),
            self.gemini.clone(),
            &self.config.models.motion,
            &self.config.models.video,
            self.config.poll.clone(),
        )
    }

    fn controller(&self, engine: GenerationEngine) -> PipelineController {
        let analyzer = AnalysisClient::new(
            self.gemini.clone(),
            self.catalog.clone(),
            &self.config.models.analysis,
        );
        let mixer = PromptMixer::new(self.catalog.clone());
        let generator = GenerationClient::new(
            self.gemini.clone(),
            OutputLayout::new(self.config.roots.clone()),
            &self.config.models.image,
        )
        .with_text_model(&self.config.models.text_image);
        PipelineController::new(analyzer, mixer, generator).with_engine(engine)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,hyper=warn,reqwest=warn");
    }
    tracing_subscriber::fmt::init();

    info!("--- SYNOID WALLPAPER v{} ---", env!("CARGO_PKG_VERSION"));

    let args = Cli::parse();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("[SIGNAL] Ctrl-C received, cancelling running jobs");
            on_ctrl_c.cancel();
        }
    });

    match args.command {
        Some(Commands::Motion { input, script_only }) => {
            if !input.exists() {
                println!("❌ Artifact not found: {:?}", input);
                return Ok(());
            }
            let Some(runtime) = init_or_report() else {
                return Ok(());
            };
            run_motion(&runtime, &input, script_only, &cancel).await;
        }
        None => {
            let Some(input) = args.input else {
                println!("❌ --input is required");
                return Ok(());
            };
            if !input.exists() {
                println!("❌ Input not found: {:?}", input);
                return Ok(());
            }
            let Some(runtime) = init_or_report() else {
                return Ok(());
            };

            let mut controller = runtime.controller(args.engine.into());
            if args.animate {
                controller = controller.with_director(runtime.director());
            }

            println!("🎨 Analyzing {:?} (top {} styles)...", input, args.top_k);
            let report = match controller.run(&input, args.top_k as usize).await {
                Ok(report) => report,
                Err(e) => {
                    println!("❌ Could not process {:?}: {}", input, e);
                    return Ok(());
                }
            };
            print_report(&report);

            if args.animate && !report.is_empty() {
                println!("\n🎬 Animating {} wallpaper(s)...", report.artifacts.len());
                for run in controller.animate(&report, &cancel).await {
                    print_motion(&run.script.source_image, &run.video);
                }
            }
        }
    }

    Ok(())
}

fn init_or_report() -> Option<Runtime> {
    match Runtime::init() {
        Ok(runtime) => Some(runtime),
        Err(e) => {
            println!("❌ Initialization failed: {:#}", e);
            println!("💡 Check your .env file (GOOGLE_API_KEY, WALLPAPER_STYLES).");
            None
        }
    }
}

async fn run_motion(runtime: &Runtime, input: &Path, script_only: bool, cancel: &CancellationToken) {
    let mut director = runtime.director();
    let script = director.create_motion_script(input).await;
    println!("🎞️ Style detected: {}", script.style_detected);
    println!("📝 Motion script: {}", script.video_prompt);

    if script_only {
        return;
    }
    let video = director
        .generate_video(input, &script.video_prompt, cancel)
        .await;
    print_motion(input, &video);
}

fn print_report(report: &PipelineReport) {
    println!("\n📋 Description: {}", preview(&report.description, 100));
    if report.analysis_recovered {
        println!("⚠️ Analysis unavailable, using default style plan.");
    }
    println!("🎯 Recommended styles: {}", report.recommended);
    if !report.reasoning.is_empty() {
        println!("🧠 Reasoning: {}", report.reasoning);
    }

    if report.recommended == 0 {
        println!("🛑 No styles were recommended, nothing to generate.");
        return;
    }

    for (style, e) in &report.failures {
        println!("   ❌ {}: {}", style, e);
    }

    println!("\n⏱️ Total time: {:.1}s", report.elapsed.as_secs_f64());
    if report.is_empty() {
        println!("❌ No wallpapers were generated.");
    } else {
        println!("✅ Generated {} wallpaper(s):", report.artifacts.len());
        for path in report.artifact_paths() {
            println!("   - {}", path.display());
        }
    }
}

fn print_motion(source: &Path, video: &Outcome<PathBuf>) {
    match video {
        Outcome::Fresh(path) | Outcome::Recovered { value: path, .. } => {
            println!("✅ {} -> {}", source.display(), path.display())
        }
        Outcome::Fatal(e) => println!("❌ {}: {}", source.display(), e),
    }
}
