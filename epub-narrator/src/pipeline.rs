//! Driving chapters through segmentation and synthesis, one chapter at a time.

use crate::chapters::Chapter;
use crate::dispatch::{Dispatcher, JoinStrategy, SegmentFailure, VoiceConfig};
use crate::range::{ChapterRange, RangeDecision};
use crate::text::{segmenter::DEFAULT_MAX_CHARS, split_chapter};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tts_client::SynthesisBackend;

/// Default output folder, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "audio_chapters";

/// Settings for one run. Fixed before the walk starts.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    /// Maximum segment length in characters
    pub max_chars: usize,
    pub range: ChapterRange,
    pub strategy: JoinStrategy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_chars: DEFAULT_MAX_CHARS,
            range: ChapterRange::default(),
            strategy: JoinStrategy::default(),
        }
    }
}

/// Progress notifications emitted during a run.
#[derive(Debug)]
pub enum PipelineEvent<'a> {
    /// A chapter passed the range filter and its batch is about to start
    ChapterStarted { chapter: &'a Chapter, segments: usize },
    /// One request of the current batch finished
    SegmentFinished {
        chapter: usize,
        ordinal: usize,
        success: bool,
    },
    /// The current batch resolved
    ChapterFinished {
        chapter: usize,
        written: usize,
        failed: usize,
    },
    /// The walk ended because the range was exhausted
    RangeEnded { last_chapter: usize },
}

/// Summary of one processed chapter.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterReport {
    pub number: usize,
    pub title: String,
    pub characters: usize,
    pub files: Vec<PathBuf>,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output_dir: PathBuf,
    pub chapters: Vec<ChapterReport>,
    pub failures: Vec<SegmentFailure>,
    /// Whether the walk ended at the range's end rather than the book's
    pub stopped_early: bool,
}

impl RunReport {
    fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            chapters: Vec::new(),
            failures: Vec::new(),
            stopped_early: false,
        }
    }

    /// Whether every segment was synthesized
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of audio files written
    pub fn files_written(&self) -> usize {
        self.chapters.iter().map(|c| c.files.len()).sum()
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).context("Failed to write report JSON")?;
        Ok(())
    }
}

/// Process chapters in order.
///
/// Each chapter in range is split into segments and its whole batch is
/// synthesized before the next chapter is pulled from `chapters`. The walk
/// ends when the chapters run out or the range is exhausted; in the latter
/// case the chapter after the last one in range is never pulled.
pub async fn run<I, F>(
    chapters: I,
    backend: &dyn SynthesisBackend,
    voice: &VoiceConfig,
    options: &PipelineOptions,
    on_event: F,
) -> Result<RunReport>
where
    I: IntoIterator<Item = Result<Chapter>>,
    F: Fn(&PipelineEvent<'_>),
{
    tokio::fs::create_dir_all(&options.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory {}",
                options.output_dir.display()
            )
        })?;

    let dispatcher = Dispatcher::new(backend, voice, &options.output_dir, options.strategy);
    let mut report = RunReport::new(&options.output_dir);

    for chapter in chapters {
        let chapter = chapter?;

        match options.range.decide(chapter.number) {
            RangeDecision::Skip => {
                log::debug!("Skipping chapter {} ({})", chapter.number, chapter.title);
                continue;
            }
            RangeDecision::Stop => {
                report.stopped_early = true;
                on_event(&PipelineEvent::RangeEnded {
                    last_chapter: chapter.number - 1,
                });
                break;
            }
            RangeDecision::Process => {}
        }

        let segments = split_chapter(chapter.number, &chapter.text, options.max_chars);
        on_event(&PipelineEvent::ChapterStarted {
            chapter: &chapter,
            segments: segments.len(),
        });

        let number = chapter.number;
        let on_segment = |ordinal: usize, success: bool| {
            on_event(&PipelineEvent::SegmentFinished {
                chapter: number,
                ordinal,
                success,
            })
        };
        let outcome = dispatcher.dispatch(&chapter, &segments, &on_segment).await?;

        on_event(&PipelineEvent::ChapterFinished {
            chapter: number,
            written: outcome.written.len(),
            failed: outcome.failures.len(),
        });

        report.chapters.push(ChapterReport {
            number,
            characters: chapter.char_count(),
            title: chapter.title,
            files: outcome.written,
        });
        report.failures.extend(outcome.failures);

        // Numbers are consecutive, so the next chapter's decision is known
        // without reading it
        if options.range.decide(number + 1) == RangeDecision::Stop {
            report.stopped_early = true;
            on_event(&PipelineEvent::RangeEnded {
                last_chapter: number,
            });
            break;
        }
    }

    Ok(report)
}
