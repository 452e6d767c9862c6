//! Submitting a chapter's segments to the synthesis backend.
//!
//! All segments of one chapter are in flight together on the current task;
//! the call returns once every request has finished, or as soon as one fails
//! under [`JoinStrategy::AbortOnFirstFailure`].

use crate::chapters::Chapter;
use crate::text::Segment;
use futures_util::future::{join_all, try_join_all};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tts_client::{SynthesisBackend, SynthesisRequest, TtsError};

/// Extension of every output file
pub const AUDIO_EXTENSION: &str = "mp3";

/// Voice settings shared by every request of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConfig {
    pub voice: String,
    /// Only forwarded when set
    pub rate: Option<String>,
    /// Only forwarded when set
    pub pitch: Option<String>,
    /// Only forwarded when set
    pub volume: Option<String>,
}

impl VoiceConfig {
    pub fn new(voice: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            rate: None,
            pitch: None,
            volume: None,
        }
    }

    pub fn with_rate(mut self, rate: Option<String>) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_pitch(mut self, pitch: Option<String>) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_volume(mut self, volume: Option<String>) -> Self {
        self.volume = volume;
        self
    }

    /// Whether any of rate, pitch or volume is set
    pub fn has_overrides(&self) -> bool {
        self.rate.is_some() || self.pitch.is_some() || self.volume.is_some()
    }

    /// Console lines describing the voice: always the voice, then each
    /// override that is set.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Using voice: {}", self.voice)];
        for (label, value) in [
            ("Rate", &self.rate),
            ("Pitch", &self.pitch),
            ("Volume", &self.volume),
        ] {
            if let Some(value) = value {
                lines.push(format!("{}: {}", label, value));
            }
        }
        lines
    }

    /// Build the request for one piece of text.
    pub fn request(&self, text: &str, output_path: PathBuf) -> SynthesisRequest {
        SynthesisRequest::new(text, self.voice.clone(), output_path)
            .with_rate(self.rate.clone())
            .with_pitch(self.pitch.clone())
            .with_volume(self.volume.clone())
    }
}

/// How a chapter's concurrent batch reacts to a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinStrategy {
    /// Return the first error and drop the requests still in flight.
    AbortOnFirstFailure,
    /// Let every request finish and record failures.
    #[default]
    CollectAll,
}

/// A request that the backend rejected or could not complete.
#[derive(Debug, Error)]
#[error("Chapter {chapter} part {ordinal} ({}) failed: {source}", .path.display())]
pub struct DispatchError {
    pub chapter: usize,
    pub ordinal: usize,
    pub path: PathBuf,
    #[source]
    pub source: TtsError,
}

/// Record of a failed segment kept for the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentFailure {
    pub chapter: usize,
    pub ordinal: usize,
    pub path: PathBuf,
    pub message: String,
}

impl From<DispatchError> for SegmentFailure {
    fn from(err: DispatchError) -> Self {
        Self {
            message: err.source.to_string(),
            chapter: err.chapter,
            ordinal: err.ordinal,
            path: err.path,
        }
    }
}

/// Result of one chapter's batch.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Files written, in segment order
    pub written: Vec<PathBuf>,
    /// Failed segments, in segment order
    pub failures: Vec<SegmentFailure>,
}

/// Destination of segment `ordinal` out of `total` for a chapter title.
///
/// A single-segment chapter is `<title>.mp3`; otherwise each segment is
/// `<title>_part<ordinal>.mp3`.
pub fn output_path(output_dir: &Path, title: &str, ordinal: usize, total: usize) -> PathBuf {
    let file_name = if total > 1 {
        format!("{}_part{}.{}", title, ordinal, AUDIO_EXTENSION)
    } else {
        format!("{}.{}", title, AUDIO_EXTENSION)
    };
    output_dir.join(file_name)
}

/// Sends segments to a backend with a fixed voice, folder and strategy.
pub struct Dispatcher<'a> {
    backend: &'a dyn SynthesisBackend,
    voice: &'a VoiceConfig,
    output_dir: &'a Path,
    strategy: JoinStrategy,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        backend: &'a dyn SynthesisBackend,
        voice: &'a VoiceConfig,
        output_dir: &'a Path,
        strategy: JoinStrategy,
    ) -> Self {
        Self {
            backend,
            voice,
            output_dir,
            strategy,
        }
    }

    /// Synthesize every segment of `chapter` concurrently.
    ///
    /// `on_finished` is called with the ordinal and success of each request
    /// as it completes.
    pub async fn dispatch(
        &self,
        chapter: &Chapter,
        segments: &[Segment],
        on_finished: &dyn Fn(usize, bool),
    ) -> Result<DispatchOutcome, DispatchError> {
        let total = segments.len();
        let jobs = segments
            .iter()
            .map(|segment| self.synthesize_segment(chapter, segment, total, on_finished));

        match self.strategy {
            JoinStrategy::AbortOnFirstFailure => {
                let written = try_join_all(jobs).await?;
                Ok(DispatchOutcome {
                    written,
                    failures: Vec::new(),
                })
            }
            JoinStrategy::CollectAll => {
                let mut outcome = DispatchOutcome::default();
                for result in join_all(jobs).await {
                    match result {
                        Ok(path) => outcome.written.push(path),
                        Err(err) => {
                            log::warn!("{}", err);
                            outcome.failures.push(err.into());
                        }
                    }
                }
                Ok(outcome)
            }
        }
    }

    async fn synthesize_segment(
        &self,
        chapter: &Chapter,
        segment: &Segment,
        total: usize,
        on_finished: &dyn Fn(usize, bool),
    ) -> Result<PathBuf, DispatchError> {
        let path = output_path(self.output_dir, &chapter.title, segment.ordinal, total);
        let request = self.voice.request(&segment.text, path);

        log::debug!(
            "Chapter {} part {}/{}: {} chars -> {}",
            chapter.number,
            segment.ordinal,
            total,
            segment.text.chars().count(),
            request.output_path.display()
        );

        let result = self.backend.synthesize(&request).await;
        on_finished(segment.ordinal, result.is_ok());

        result
            .map(|()| request.output_path.clone())
            .map_err(|source| DispatchError {
                chapter: chapter.number,
                ordinal: segment.ordinal,
                path: request.output_path,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::split_chapter;
    use std::cell::RefCell;
    use tts_client::MockBackend;

    fn chapter(title: &str, text: &str) -> Chapter {
        Chapter {
            number: 1,
            title: title.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_output_path_single_segment() {
        let path = output_path(Path::new("audio_chapters"), "My Title", 1, 1);
        assert_eq!(path, PathBuf::from("audio_chapters/My Title.mp3"));
    }

    #[test]
    fn test_output_path_multiple_segments() {
        let dir = Path::new("audio_chapters");
        assert_eq!(
            output_path(dir, "My Title", 1, 2),
            PathBuf::from("audio_chapters/My Title_part1.mp3")
        );
        assert_eq!(
            output_path(dir, "My Title", 2, 2),
            PathBuf::from("audio_chapters/My Title_part2.mp3")
        );
    }

    #[test]
    fn test_voice_request_omits_unset_overrides() {
        let voice = VoiceConfig::new("en-US-JennyNeural").with_pitch(Some("+5Hz".to_string()));
        let request = voice.request("Hi.", PathBuf::from("x.mp3"));
        assert_eq!(request.voice, "en-US-JennyNeural");
        assert_eq!(request.rate, None);
        assert_eq!(request.pitch.as_deref(), Some("+5Hz"));
        assert_eq!(request.volume, None);
        assert!(voice.has_overrides());
        assert!(!VoiceConfig::new("v").has_overrides());
    }

    #[test]
    fn test_voice_summary_lists_only_set_overrides() {
        assert_eq!(
            VoiceConfig::new("en-US-JennyNeural").summary_lines(),
            vec!["Using voice: en-US-JennyNeural"]
        );

        let voice = VoiceConfig::new("en-GB-RyanNeural")
            .with_rate(Some("-10%".to_string()))
            .with_volume(Some("+20%".to_string()));
        assert_eq!(
            voice.summary_lines(),
            vec!["Using voice: en-GB-RyanNeural", "Rate: -10%", "Volume: +20%"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_writes_one_file_per_segment() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::always_succeeds();
        let voice = VoiceConfig::new("en-US-JennyNeural");
        let dispatcher = Dispatcher::new(&backend, &voice, dir.path(), JoinStrategy::CollectAll);

        let chapter = chapter("My Title", "One. Two.");
        let segments = split_chapter(1, &chapter.text, 5);
        assert_eq!(segments.len(), 2);

        let finished = RefCell::new(Vec::new());
        let outcome = dispatcher
            .dispatch(&chapter, &segments, &|ordinal, ok| finished.borrow_mut().push((ordinal, ok)))
            .await
            .unwrap();

        assert_eq!(
            outcome.written,
            vec![
                dir.path().join("My Title_part1.mp3"),
                dir.path().join("My Title_part2.mp3"),
            ]
        );
        assert!(outcome.failures.is_empty());
        assert!(outcome.written.iter().all(|p| p.exists()));

        let mut finished = finished.into_inner();
        finished.sort();
        assert_eq!(finished, vec![(1, true), (2, true)]);

        let texts: Vec<String> = backend.requests().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["One.", "Two."]);
    }

    #[tokio::test]
    async fn test_dispatch_forwards_voice_settings() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::always_succeeds();
        let voice = VoiceConfig::new("en-GB-RyanNeural").with_rate(Some("-10%".to_string()));
        let dispatcher = Dispatcher::new(&backend, &voice, dir.path(), JoinStrategy::CollectAll);

        let chapter = chapter("Solo", "Only one segment.");
        let segments = split_chapter(1, &chapter.text, 4000);
        dispatcher.dispatch(&chapter, &segments, &|_, _| {}).await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].voice, "en-GB-RyanNeural");
        assert_eq!(requests[0].rate.as_deref(), Some("-10%"));
        assert_eq!(requests[0].pitch, None);
        assert_eq!(requests[0].output_path, dir.path().join("Solo.mp3"));
    }

    #[tokio::test]
    async fn test_dispatch_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Solo.mp3");
        std::fs::write(&existing, b"old contents that are longer than the payload").unwrap();

        let backend = MockBackend::always_succeeds();
        let voice = VoiceConfig::new("v");
        let dispatcher = Dispatcher::new(&backend, &voice, dir.path(), JoinStrategy::CollectAll);
        let chapter = chapter("Solo", "Text.");
        let segments = split_chapter(1, &chapter.text, 4000);
        dispatcher.dispatch(&chapter, &segments, &|_, _| {}).await.unwrap();

        assert_eq!(std::fs::read(&existing).unwrap(), tts_client::providers::mock::MOCK_PAYLOAD);
    }

    #[tokio::test]
    async fn test_collect_all_keeps_successful_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::fails_on_text("Bad", "rejected");
        let voice = VoiceConfig::new("v");
        let dispatcher = Dispatcher::new(&backend, &voice, dir.path(), JoinStrategy::CollectAll);

        let chapter = chapter("Mixed", "Bad. Good. Fine.");
        let segments = split_chapter(1, &chapter.text, 6);
        assert_eq!(segments.len(), 3);

        let outcome = dispatcher.dispatch(&chapter, &segments, &|_, _| {}).await.unwrap();

        assert_eq!(backend.call_count(), 3);
        assert_eq!(outcome.written.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        let failure = &outcome.failures[0];
        assert_eq!(failure.chapter, 1);
        assert_eq!(failure.ordinal, 1);
        assert_eq!(failure.path, dir.path().join("Mixed_part1.mp3"));
        assert!(failure.message.contains("rejected"));
        assert!(dir.path().join("Mixed_part2.mp3").exists());
        assert!(dir.path().join("Mixed_part3.mp3").exists());
    }

    #[tokio::test]
    async fn test_abort_on_first_failure_drops_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::fails_on_text("Bad", "rejected");
        let voice = VoiceConfig::new("v");
        let dispatcher =
            Dispatcher::new(&backend, &voice, dir.path(), JoinStrategy::AbortOnFirstFailure);

        let chapter = chapter("Strict", "Bad. Good. Fine.");
        let segments = split_chapter(1, &chapter.text, 6);

        let err = dispatcher
            .dispatch(&chapter, &segments, &|_, _| {})
            .await
            .unwrap_err();

        assert_eq!(err.chapter, 1);
        assert_eq!(err.ordinal, 1);
        assert!(err.to_string().contains("rejected"));
        assert_eq!(backend.completed_count(), 0);
        assert!(!dir.path().join("Strict_part2.mp3").exists());
        assert!(!dir.path().join("Strict_part3.mp3").exists());
    }
}
