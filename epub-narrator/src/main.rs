//! epub-narrator - Narrate EPUB chapters into audio files with text-to-speech

mod chapters;
mod config;
mod dispatch;
mod epub;
mod pipeline;
mod range;
mod text;

use crate::epub::{EpubSource, HtmlConverter};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::NarratorConfig;
use dispatch::{JoinStrategy, VoiceConfig};
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::{PipelineEvent, PipelineOptions};
use range::ChapterRange;
use std::cell::RefCell;
use std::path::PathBuf;
use tts_client::BackendKind;

#[derive(Parser, Debug)]
#[command(name = "epub-narrator")]
#[command(about = "Narrate EPUB chapters into audio files using text-to-speech", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the EPUB file
    epub_file: Option<PathBuf>,

    /// Voice to use (default: en-US-JennyNeural)
    #[arg(long)]
    voice: Option<String>,

    /// Speaking rate adjustment (e.g. "+10%", "-5%")
    #[arg(long, allow_hyphen_values = true)]
    rate: Option<String>,

    /// Pitch adjustment (e.g. "+5Hz", "-10Hz")
    #[arg(long, allow_hyphen_values = true)]
    pitch: Option<String>,

    /// Volume adjustment (e.g. "+20%", "-10%")
    #[arg(long, allow_hyphen_values = true)]
    volume: Option<String>,

    /// First chapter to narrate (1-based)
    #[arg(long, default_value_t = 1)]
    start_chapter: usize,

    /// Last chapter to narrate (inclusive, default: end of book)
    #[arg(long)]
    end_chapter: Option<usize>,

    /// Synthesis backend (edge-tts, gtts)
    #[arg(short, long)]
    backend: Option<String>,

    /// Language for the gtts backend
    #[arg(long)]
    lang: Option<String>,

    /// Top-level domain (accent) for the gtts backend
    #[arg(long)]
    tld: Option<String>,

    /// Folder for the audio files (default: audio_chapters)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Maximum characters per request (default: 4000)
    #[arg(long)]
    max_chars: Option<usize>,

    /// Stop at the first failed request instead of finishing the chapter
    #[arg(long, default_value_t = false)]
    fail_fast: bool,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default voice
    SetVoice {
        /// Voice identifier (e.g. en-GB-SoniaNeural)
        voice: String,
    },
    /// Set default backend
    SetBackend {
        /// edge-tts or gtts
        backend: String,
    },
    /// Set default output folder
    SetOutputDir {
        /// Folder path
        path: PathBuf,
    },
    /// Set default maximum characters per request
    SetMaxChars {
        /// Value (at least 1)
        value: usize,
    },
}

/// Run settings after merging the config file with command-line flags
struct Settings {
    backend: BackendKind,
    lang: String,
    tld: String,
    voice: VoiceConfig,
    options: PipelineOptions,
}

impl Settings {
    fn resolve(args: &Args, config: NarratorConfig) -> Result<Self> {
        let backend = match &args.backend {
            Some(name) => name.parse()?,
            None => config.backend_kind()?,
        };

        let max_chars = args.max_chars.unwrap_or(config.max_chars);
        if max_chars == 0 {
            anyhow::bail!("--max-chars must be at least 1");
        }

        let range = ChapterRange::new(args.start_chapter, args.end_chapter)
            .context("Invalid chapter range")?;

        let strategy = if args.fail_fast || config.fail_fast {
            JoinStrategy::AbortOnFirstFailure
        } else {
            JoinStrategy::CollectAll
        };

        let voice = VoiceConfig::new(args.voice.clone().unwrap_or(config.voice))
            .with_rate(args.rate.clone().or(config.rate))
            .with_pitch(args.pitch.clone().or(config.pitch))
            .with_volume(args.volume.clone().or(config.volume));

        Ok(Self {
            backend,
            lang: args.lang.clone().unwrap_or(config.lang),
            tld: args.tld.clone().unwrap_or(config.tld),
            voice,
            options: PipelineOptions {
                output_dir: args.output_dir.clone().unwrap_or(config.output_dir),
                max_chars,
                range,
                strategy,
            },
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug {
        "epub_narrator=debug,tts_client=debug,warn"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // Handle subcommands
    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action);
    }

    // Require EPUB file for narration
    let epub_path = args.epub_file.clone().ok_or_else(|| {
        anyhow::anyhow!("EPUB file path is required. Run 'epub-narrator --help' for usage.")
    })?;

    if !epub_path.exists() {
        anyhow::bail!("EPUB file not found: {}", epub_path.display());
    }

    let config = NarratorConfig::load().context("Failed to load configuration")?;
    let settings = Settings::resolve(&args, config)?;

    if args.debug {
        eprintln!("EPUB: {}", epub_path.display());
        eprintln!("Backend: {}", settings.backend);
        eprintln!("Output: {}", settings.options.output_dir.display());
        eprintln!("Max chars: {}", settings.options.max_chars);
        eprintln!("Chapters: {}", settings.options.range);
        eprintln!("Join strategy: {:?}", settings.options.strategy);
    }

    if !settings.backend.supports_voice_overrides() && settings.voice.has_overrides() {
        log::warn!(
            "The {} backend ignores --voice, --rate, --pitch and --volume",
            settings.backend
        );
    }

    let backend = tts_client::create_backend(settings.backend, &settings.lang, &settings.tld)
        .context("Failed to initialize synthesis backend")?;

    let mut source = EpubSource::open(&epub_path).context("Failed to parse EPUB")?;
    let info = source.info();
    eprintln!(
        "Book: \"{}\" by {}",
        info.title,
        info.author.as_deref().unwrap_or("Unknown")
    );
    if settings.backend.supports_voice_overrides() {
        for line in settings.voice.summary_lines() {
            eprintln!("{}", line);
        }
    } else {
        eprintln!(
            "Using {}: lang={}, tld={}",
            settings.backend, settings.lang, settings.tld
        );
    }
    log::debug!("{} items in reading order", source.item_count());

    let progress = ConsoleProgress::new()?;
    let chapters = chapters::extract(source.items(), HtmlConverter);
    let report = pipeline::run(
        chapters,
        backend.as_ref(),
        &settings.voice,
        &settings.options,
        |event| progress.handle(event),
    )
    .await?;

    if let Some(path) = &args.report {
        report.write_json(path)?;
        eprintln!("Report written to {}", path.display());
    }

    if report.chapters.is_empty() {
        eprintln!("No chapters in range {}", settings.options.range);
    }

    if !report.is_success() {
        eprintln!("\n{} segment(s) failed:", report.failures.len());
        for failure in &report.failures {
            eprintln!(
                "  Chapter {} part {} ({}): {}",
                failure.chapter,
                failure.ordinal,
                failure.path.display(),
                failure.message
            );
        }
        anyhow::bail!(
            "{} of {} segment(s) failed",
            report.failures.len(),
            report.failures.len() + report.files_written()
        );
    }

    eprintln!(
        "Done! All chapters saved in '{}'",
        report.output_dir.display()
    );

    Ok(())
}

/// Console rendering of pipeline progress: a line per chapter and a bar
/// over the chapter's segments.
struct ConsoleProgress {
    style: ProgressStyle,
    bar: RefCell<Option<ProgressBar>>,
}

impl ConsoleProgress {
    fn new() -> Result<Self> {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-");
        Ok(Self {
            style,
            bar: RefCell::new(None),
        })
    }

    fn handle(&self, event: &PipelineEvent<'_>) {
        match event {
            PipelineEvent::ChapterStarted { chapter, segments } => {
                eprintln!(
                    "Processing chapter {} ({} chars): {}",
                    chapter.number,
                    chapter.char_count(),
                    chapter.title
                );
                let pb = ProgressBar::new(*segments as u64);
                pb.set_style(self.style.clone());
                *self.bar.borrow_mut() = Some(pb);
            }
            PipelineEvent::SegmentFinished { success, .. } => {
                if let Some(pb) = self.bar.borrow().as_ref() {
                    pb.inc(1);
                    if !success {
                        pb.set_message("with failures");
                    }
                }
            }
            PipelineEvent::ChapterFinished { written, failed, .. } => {
                if let Some(pb) = self.bar.borrow_mut().take() {
                    if *failed == 0 {
                        pb.finish_with_message(format!("{} file(s)", written));
                    } else {
                        pb.abandon_with_message(format!("{} written, {} failed", written, failed));
                    }
                }
            }
            PipelineEvent::RangeEnded { last_chapter } => {
                log::debug!("Range ends at chapter {}", last_chapter);
            }
        }
    }
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = NarratorConfig::load()?;
            println!("Configuration file: {:?}", NarratorConfig::config_path()?);
            println!();
            println!("backend = \"{}\"", config.backend);
            println!("voice = \"{}\"", config.voice);
            for (name, value) in [
                ("rate", &config.rate),
                ("pitch", &config.pitch),
                ("volume", &config.volume),
            ] {
                match value {
                    Some(v) => println!("{} = \"{}\"", name, v),
                    None => println!("{} = (voice default)", name),
                }
            }
            println!("output_dir = \"{}\"", config.output_dir.display());
            println!("max_chars = {}", config.max_chars);
            println!("lang = \"{}\"", config.lang);
            println!("tld = \"{}\"", config.tld);
            println!("fail_fast = {}", config.fail_fast);
        }
        ConfigAction::SetVoice { voice } => {
            let mut config = NarratorConfig::load()?;
            config.voice = voice.clone();
            config.save()?;
            println!("Default voice set to: {}", voice);
        }
        ConfigAction::SetBackend { backend } => {
            let kind: BackendKind = backend.parse()?;
            let mut config = NarratorConfig::load()?;
            config.backend = kind.as_str().to_string();
            config.save()?;
            println!("Default backend set to: {}", kind);
        }
        ConfigAction::SetOutputDir { path } => {
            let mut config = NarratorConfig::load()?;
            config.output_dir = path.clone();
            config.save()?;
            println!("Default output folder set to: {}", path.display());
        }
        ConfigAction::SetMaxChars { value } => {
            let mut config = NarratorConfig::load()?;
            config.max_chars = (*value).max(1);
            config.save()?;
            println!("Default max chars set to: {}", config.max_chars);
        }
    }
    Ok(())
}
