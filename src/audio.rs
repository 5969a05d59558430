use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Information about an extracted audio file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u32,
    pub format: String,
    pub file_size: u64,
}

/// Pulls the audio track out of a video with ffmpeg
#[derive(Clone)]
pub struct AudioExtractor {
    /// Default sample rate for transcription (Whisper optimal)
    pub target_sample_rate: u32,
    /// Target audio format for processing
    pub target_format: String,
}

impl AudioExtractor {
    pub fn new() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz optimal for Whisper
            target_format: "wav".to_string(),
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.target_sample_rate = sample_rate;
        self
    }

    /// Target path of the extracted audio for a given video
    pub fn audio_output_path(&self, video_path: &Path, work_dir: &Path) -> PathBuf {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        work_dir.join(format!("{}.{}", stem, self.target_format))
    }

    /// Extract audio from video with optimal settings for transcription
    pub async fn extract_for_transcription(
        &self,
        video_path: &Path,
        work_dir: &Path,
    ) -> Result<AudioInfo> {
        let audio_path = self.audio_output_path(video_path, work_dir);

        info!("🎵 Extracting audio for transcription: {}", video_path.display());

        tokio::fs::create_dir_all(work_dir).await?;

        let output = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(video_path)
            .args([
                "-vn", // No video stream
                "-acodec", "pcm_s16le", // 16-bit PCM
                "-ar", &self.target_sample_rate.to_string(),
                "-ac", "1", // Mono channel
                "-f", "wav",
                "-y", // Overwrite existing
            ])
            .arg(&audio_path)
            .output()
            .await
            .map_err(|e| anyhow!("Failed to run ffmpeg (is FFmpeg installed?): {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(5)..].join("\n");
            return Err(anyhow!(
                "Audio extraction failed for {}: {}",
                video_path.display(),
                tail
            ));
        }

        let audio_info = self.audio_info(&audio_path).await?;

        info!(
            "✅ Audio extracted: {} ({:.1}s, {}Hz)",
            audio_info.path.display(),
            audio_info.duration.as_secs_f64(),
            audio_info.sample_rate
        );

        Ok(audio_info)
    }

    /// Get detailed audio information via ffprobe
    pub async fn audio_info(&self, audio_path: &Path) -> Result<AudioInfo> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
                "-select_streams", "a:0", // First audio stream
            ])
            .arg(audio_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", audio_path.display()));
        }

        let json_str = String::from_utf8(output.stdout)?;
        let ffprobe_data: serde_json::Value = serde_json::from_str(&json_str)?;

        let format = &ffprobe_data["format"];
        let audio_stream = ffprobe_data["streams"]
            .as_array()
            .and_then(|streams| streams.first())
            .ok_or_else(|| anyhow!("No audio stream found in {}", audio_path.display()))?;

        let duration_seconds: f64 = format["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let file_size = tokio::fs::metadata(audio_path).await?.len();

        Ok(AudioInfo {
            path: audio_path.to_path_buf(),
            duration: Duration::from_secs_f64(duration_seconds),
            sample_rate: audio_stream["sample_rate"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(self.target_sample_rate),
            channels: audio_stream["channels"].as_u64().unwrap_or(1) as u32,
            format: audio_stream["codec_name"].as_str().unwrap_or("unknown").to_string(),
            file_size,
        })
    }

    /// Remove a temporary audio file, logging instead of failing on error
    pub async fn cleanup(&self, audio_path: &Path) {
        if audio_path.exists() {
            if let Err(e) = tokio::fs::remove_file(audio_path).await {
                warn!("Failed to remove temp audio file {}: {}", audio_path.display(), e);
            } else {
                info!("🧹 Cleaned up temporary audio file: {}", audio_path.display());
            }
        }
    }
}

impl Default for AudioExtractor {
    fn default() -> Self {
        Self::new()
    }
}
