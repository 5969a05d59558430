use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::audio::AudioExtractor;
use crate::config::Config;
use crate::llm::notes::NoteGenerator;
use crate::output::TranscriptWriter;
use crate::transcription::WhisperTranscriber;
use crate::video::{VideoInfo, VideoProber};

/// A single transcription request
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Input video file
    pub video_path: PathBuf,
    /// Explicit output path; derived from the video name when unset
    pub output_path: Option<PathBuf>,
    /// Keep the extracted audio file next to the transcript
    pub keep_audio: bool,
    /// Generate tutorial notes after transcription
    pub generate_notes: bool,
}

impl PipelineRequest {
    pub fn new(video_path: impl Into<PathBuf>) -> Self {
        Self {
            video_path: video_path.into(),
            output_path: None,
            keep_audio: false,
            generate_notes: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum ProcessingStage {
    Probe,
    AudioExtraction,
    Transcription,
    NoteGeneration,
    Write,
}

/// Report of a completed pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub video_info: VideoInfo,
    pub segment_count: usize,
    pub language: Option<String>,
    pub output_path: PathBuf,
    pub notes_path: Option<PathBuf>,
    pub processing_time: Duration,
    pub stages_completed: Vec<ProcessingStage>,
    pub finished_at: DateTime<Utc>,
}

/// Sequential transcription pipeline: probe, extract, transcribe,
/// optionally generate notes, then write
pub struct Pipeline {
    config: Config,
    prober: VideoProber,
    extractor: AudioExtractor,
    transcriber: WhisperTranscriber,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let extractor = AudioExtractor::new().with_sample_rate(config.audio.target_sample_rate);
        let transcriber = WhisperTranscriber::new(config.transcription.clone());

        Self {
            config,
            prober: VideoProber::new(),
            extractor,
            transcriber,
        }
    }

    /// Run the full pipeline for one video. The output file is written only
    /// after every upstream stage has succeeded.
    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineReport> {
        let start_time = Instant::now();
        let mut stages_completed = Vec::new();

        info!("🚀 Processing '{}'...", request.video_path.display());

        if !self.prober.is_supported(&request.video_path) {
            warn!(
                "Unrecognized video extension for {}, attempting anyway",
                request.video_path.display()
            );
        }

        // Stage 1: Probe
        let video_info = self.prober.probe(&request.video_path).await?;
        stages_completed.push(ProcessingStage::Probe);

        let output_path = request.output_path.clone().unwrap_or_else(|| {
            TranscriptWriter::default_output_path(&request.video_path, self.config.output.format)
        });

        // Scratch space for the extracted WAV and backend output files.
        // Dropped on every exit path; only the kept-audio copy below outlives a failure.
        let scratch = tempfile::tempdir()?;

        // Stage 2: Audio extraction
        let audio_info = self
            .extractor
            .extract_for_transcription(&request.video_path, scratch.path())
            .await?;
        stages_completed.push(ProcessingStage::AudioExtraction);

        // Persist the WAV right away so --keep-audio survives later stage failures
        if request.keep_audio {
            let kept_path = output_path.with_extension("wav");
            if let Some(parent) = kept_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::copy(&audio_info.path, &kept_path).await?;
            info!("🎧 Kept extracted audio: {}", kept_path.display());
        }

        // Stage 3: Transcription
        let transcription = self.transcriber.transcribe(&audio_info, scratch.path()).await?;
        stages_completed.push(ProcessingStage::Transcription);

        // Stage 4: Note generation (optional)
        let notes = if request.generate_notes {
            let generator = NoteGenerator::new(
                self.config.notes.llm_config(),
                self.config.notes.chunk_size,
                self.config.notes.chunk_overlap,
            )
            .await?;

            let notes = generator.generate(&transcription.text).await?;
            stages_completed.push(ProcessingStage::NoteGeneration);
            Some(notes)
        } else {
            None
        };

        // Stage 5: Write
        let writer = TranscriptWriter::new(self.config.output.format);
        writer.write(&transcription, &output_path).await?;

        let notes_path = if let Some(ref notes) = notes {
            let notes_path = TranscriptWriter::notes_path(&output_path);
            writer.write_notes(notes, &notes_path).await?;
            Some(notes_path)
        } else {
            None
        };
        stages_completed.push(ProcessingStage::Write);

        if !request.keep_audio {
            self.extractor.cleanup(&audio_info.path).await;
        }

        let report = PipelineReport {
            segment_count: transcription.segments.len(),
            language: transcription.language.clone(),
            video_info,
            output_path: output_path.clone(),
            notes_path,
            processing_time: start_time.elapsed(),
            stages_completed,
            finished_at: Utc::now(),
        };

        info!(
            "🎉 Done in {:.1}s! Transcript saved to '{}' ({} segments)",
            report.processing_time.as_secs_f64(),
            output_path.display(),
            report.segment_count
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = PipelineRequest::new("/videos/lecture.mp4");
        assert_eq!(request.video_path, PathBuf::from("/videos/lecture.mp4"));
        assert!(request.output_path.is_none());
        assert!(!request.keep_audio);
        assert!(!request.generate_notes);
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_extraction() {
        let pipeline = Pipeline::new(Config::default());
        let request = PipelineRequest::new("/nonexistent/video.mp4");

        let result = pipeline.run(&request).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&ProcessingStage::AudioExtraction).unwrap();
        assert_eq!(json, "\"AudioExtraction\"");
    }
}
