use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::transcription::{TranscriptionResult, TranscriptionSegment};

/// Output format for the transcript file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    Markdown,
    Json,
}

impl TranscriptFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TranscriptFormat::Markdown => "md",
            TranscriptFormat::Json => "json",
        }
    }
}

impl FromStr for TranscriptFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(TranscriptFormat::Markdown),
            "json" => Ok(TranscriptFormat::Json),
            other => Err(anyhow!("Unknown output format: {}", other)),
        }
    }
}

/// Segment record as it appears in JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub start: String,
    pub end: String,
    pub text: String,
}

impl From<&TranscriptionSegment> for TranscriptRecord {
    fn from(segment: &TranscriptionSegment) -> Self {
        Self {
            start: format_clock(segment.start),
            end: format_clock(segment.end),
            text: segment.text.clone(),
        }
    }
}

/// Serializes transcripts (and notes) to disk
pub struct TranscriptWriter {
    format: TranscriptFormat,
}

impl TranscriptWriter {
    pub fn new(format: TranscriptFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> TranscriptFormat {
        self.format
    }

    /// Default output path: `<video stem>.<ext>` in the current directory
    pub fn default_output_path(video_path: &Path, format: TranscriptFormat) -> PathBuf {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "transcript".to_string());
        PathBuf::from(format!("{}.{}", stem, format.extension()))
    }

    /// Notes land next to the transcript as `<stem>_notes.md`
    pub fn notes_path(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "transcript".to_string());
        output_path.with_file_name(format!("{}_notes.md", stem))
    }

    /// Render the transcript in the configured format
    pub fn render(&self, result: &TranscriptionResult) -> Result<String> {
        match self.format {
            TranscriptFormat::Markdown => Ok(Self::render_markdown(&result.segments)),
            TranscriptFormat::Json => Self::render_json(&result.segments),
        }
    }

    fn render_markdown(segments: &[TranscriptionSegment]) -> String {
        let mut content = String::from("# Video Transcript\n\n");
        for segment in segments {
            content.push_str(&format!(
                "**{} - {}**: {}\n",
                format_clock(segment.start),
                format_clock(segment.end),
                segment.text
            ));
        }
        content
    }

    fn render_json(segments: &[TranscriptionSegment]) -> Result<String> {
        let records: Vec<TranscriptRecord> = segments.iter().map(TranscriptRecord::from).collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Write the transcript file
    pub async fn write(&self, result: &TranscriptionResult, output_path: &Path) -> Result<()> {
        let content = self.render(result)?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(output_path, content).await?;
        info!(
            "💾 Transcript saved: {} ({} segments)",
            output_path.display(),
            result.segments.len()
        );

        Ok(())
    }

    /// Write the generated notes document
    pub async fn write_notes(&self, notes: &str, notes_path: &Path) -> Result<()> {
        tokio::fs::write(notes_path, notes).await?;
        info!("💾 Notes saved: {} ({} characters)", notes_path.display(), notes.len());
        Ok(())
    }
}

/// Format seconds as an MM:SS clock string (minutes unbounded)
pub fn format_clock(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let minutes = total_seconds / 60;
    let remainder = total_seconds % 60;
    format!("{:02}:{:02}", minutes, remainder)
}
