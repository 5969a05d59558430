use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Video information extracted from file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub filename: String,
    pub duration: Duration,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub format: String,
    pub file_size: u64,
    pub audio_streams: Vec<AudioStreamInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
}

/// Probes input videos with ffprobe before the pipeline touches them
#[derive(Clone)]
pub struct VideoProber {
    supported_extensions: Vec<String>,
}

impl VideoProber {
    pub fn new() -> Self {
        Self {
            supported_extensions: vec![
                "mp4".to_string(),
                "mkv".to_string(),
                "avi".to_string(),
                "mov".to_string(),
                "webm".to_string(),
                "m4v".to_string(),
            ],
        }
    }

    /// Check whether the file extension is a known video container
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.supported_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Extract video information using ffprobe
    pub async fn probe(&self, video_path: &Path) -> Result<VideoInfo> {
        if !video_path.exists() {
            return Err(anyhow!("Input file '{}' does not exist", video_path.display()));
        }

        let output = tokio::process::Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(video_path)
            .output()
            .await
            .map_err(|e| anyhow!("Failed to run ffprobe (is FFmpeg installed?): {}", e))?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", video_path.display()));
        }

        let json_str = String::from_utf8(output.stdout)?;
        let ffprobe_data: serde_json::Value = serde_json::from_str(&json_str)?;

        let format = &ffprobe_data["format"];
        let streams = ffprobe_data["streams"]
            .as_array()
            .ok_or_else(|| anyhow!("ffprobe returned no streams for {}", video_path.display()))?;

        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"] == "video")
            .ok_or_else(|| anyhow!("No video stream found in {}", video_path.display()))?;

        let audio_streams: Vec<AudioStreamInfo> = streams
            .iter()
            .filter(|s| s["codec_type"] == "audio")
            .enumerate()
            .map(|(index, stream)| AudioStreamInfo {
                index,
                codec: stream["codec_name"].as_str().unwrap_or("unknown").to_string(),
                sample_rate: stream["sample_rate"]
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(44100),
                channels: stream["channels"].as_u64().unwrap_or(2) as u32,
            })
            .collect();

        if audio_streams.is_empty() {
            return Err(anyhow!(
                "No audio stream found in {} - nothing to transcribe",
                video_path.display()
            ));
        }

        let duration_seconds: f64 = format["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let file_size = tokio::fs::metadata(video_path).await?.len();

        let video_info = VideoInfo {
            path: video_path.to_path_buf(),
            filename: video_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            duration: Duration::from_secs_f64(duration_seconds),
            width: video_stream["width"].as_u64().unwrap_or(0) as u32,
            height: video_stream["height"].as_u64().unwrap_or(0) as u32,
            fps: video_stream["r_frame_rate"]
                .as_str()
                .and_then(|s| {
                    let parts: Vec<&str> = s.split('/').collect();
                    if parts.len() == 2 {
                        let num: f64 = parts[0].parse().ok()?;
                        let den: f64 = parts[1].parse().ok()?;
                        if den != 0.0 { Some(num / den) } else { None }
                    } else {
                        s.parse().ok()
                    }
                })
                .unwrap_or(0.0),
            format: format["format_name"].as_str().unwrap_or("unknown").to_string(),
            file_size,
            audio_streams,
        };

        info!(
            "📹 Analyzed video: {} ({}x{}, {:.1}fps, {:.1}s, {} audio stream(s))",
            video_info.filename,
            video_info.width,
            video_info.height,
            video_info.fps,
            video_info.duration.as_secs_f64(),
            video_info.audio_streams.len()
        );

        Ok(video_info)
    }
}

impl Default for VideoProber {
    fn default() -> Self {
        Self::new()
    }
}
