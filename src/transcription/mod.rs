pub mod whisper;

pub use whisper::{TranscriptionResult, TranscriptionSegment, WhisperTranscriber};
