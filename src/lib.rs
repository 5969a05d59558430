//! Video transcription pipeline: extract the audio track from a video file,
//! transcribe it with a Whisper backend and optionally turn the transcript
//! into tutorial-style notes through a locally running LLM server.

pub mod audio;
pub mod config;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod transcription;
pub mod video;

// Re-export main types for easy access
pub use crate::audio::{AudioExtractor, AudioInfo};
pub use crate::config::Config;
pub use crate::llm::notes::NoteGenerator;
pub use crate::llm::{LlmConfig, LlmProvider};
pub use crate::output::{TranscriptFormat, TranscriptWriter};
pub use crate::pipeline::{Pipeline, PipelineReport, PipelineRequest, ProcessingStage};
pub use crate::transcription::{TranscriptionResult, TranscriptionSegment, WhisperTranscriber};
pub use crate::video::{VideoInfo, VideoProber};
