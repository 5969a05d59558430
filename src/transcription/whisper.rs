use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::audio::AudioInfo;
use crate::config::TranscriptionConfig;

/// Transcription segment from Whisper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    /// Segment ID
    pub id: u32,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Transcribed text
    pub text: String,
}

/// Complete transcription result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Full transcription text
    pub text: String,
    /// Detected language
    pub language: Option<String>,
    /// Individual segments with timestamps
    pub segments: Vec<TranscriptionSegment>,
    /// Processing duration
    pub processing_time: Duration,
    /// Model used for transcription
    pub model_used: String,
}

/// Drives a Whisper command-line backend
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    config: TranscriptionConfig,
    model: String,
    use_gpu: bool,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        let model = config.model.clone();
        let use_gpu = config.use_gpu;

        Self {
            config,
            model,
            use_gpu,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Transcribe an extracted audio file, writing backend output under `work_dir`
    pub async fn transcribe(
        &self,
        audio_info: &AudioInfo,
        work_dir: &Path,
    ) -> Result<TranscriptionResult> {
        let start_time = std::time::Instant::now();

        info!("🎤 Starting Whisper transcription for: {}", audio_info.path.display());
        info!(
            "📊 Audio: {}Hz, {} channel(s), {:.1}s, {:.1} MB",
            audio_info.sample_rate,
            audio_info.channels,
            audio_info.duration.as_secs_f64(),
            audio_info.file_size as f64 / 1_000_000.0
        );
        info!("⚙️  Model: {}, GPU: {}", self.model, self.use_gpu);

        tokio::fs::create_dir_all(work_dir).await?;

        let whisper_output = self.run_backend(&audio_info.path, work_dir).await?;
        let result = self.process_output(whisper_output, start_time.elapsed());

        info!(
            "🎉 Transcription completed in {:.1}s: {} characters, {} segments",
            result.processing_time.as_secs_f64(),
            result.text.len(),
            result.segments.len()
        );

        Ok(result)
    }

    /// Run a Whisper backend, auto-detecting what is installed
    async fn run_backend(&self, audio_path: &Path, work_dir: &Path) -> Result<WhisperOutput> {
        // Preference order: whisper.cpp frontends first, Python reference CLI last
        let backends = [
            ("whisper-cli", true),
            ("whisper-cpp", true),
            ("whisper", false),
        ];

        for (cmd_name, is_cpp) in &backends {
            if Self::check_command_available(cmd_name).await {
                info!("✅ Using {} backend for transcription", cmd_name);
                return if *is_cpp {
                    self.run_whisper_cpp(cmd_name, audio_path, work_dir).await
                } else {
                    self.run_python_whisper(audio_path, work_dir).await
                };
            }
            debug!("{} not available", cmd_name);
        }

        Err(anyhow!(
            "No Whisper backend found. Please install whisper.cpp \
            (https://github.com/ggerganov/whisper.cpp) or OpenAI Whisper \
            (pip install openai-whisper)"
        ))
    }

    /// Run whisper.cpp (whisper-cli / whisper-cpp)
    async fn run_whisper_cpp(
        &self,
        cmd_name: &str,
        audio_path: &Path,
        work_dir: &Path,
    ) -> Result<WhisperOutput> {
        let stem = Self::file_stem(audio_path);
        let output_file = work_dir.join(&stem);

        let mut cmd = Command::new(cmd_name);
        cmd.arg("-f")
            .arg(audio_path)
            .arg("-oj") // JSON output
            .arg("-of")
            .arg(&output_file)
            .arg("-tp")
            .arg(self.config.temperature.to_string())
            .arg("-bs")
            .arg(self.config.beam_size.to_string());

        if let Some(model_path) = self.resolve_model_path() {
            cmd.arg("-m").arg(model_path);
        } else {
            warn!("⚠️  No ggml model file found for '{}', using backend default", self.model);
        }

        if let Some(language) = &self.config.language {
            cmd.arg("-l").arg(language);
        }

        info!("🚀 Running {}: {} model on {}", cmd_name, self.model, audio_path.display());
        debug!("Executing command: {:?}", cmd);

        self.execute_and_parse(cmd, work_dir, &stem, cmd_name).await
    }

    /// Run Python OpenAI Whisper (fallback)
    async fn run_python_whisper(
        &self,
        audio_path: &Path,
        work_dir: &Path,
    ) -> Result<WhisperOutput> {
        let stem = Self::file_stem(audio_path);

        let mut cmd = Command::new("whisper");
        cmd.arg(audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_dir")
            .arg(work_dir)
            .args(["--output_format", "json", "--verbose", "False"])
            .arg("--temperature")
            .arg(self.config.temperature.to_string())
            .arg("--beam_size")
            .arg(self.config.beam_size.to_string());

        if let Some(language) = &self.config.language {
            cmd.arg("--language").arg(language);
        }

        // whisper.cpp has no device flag; only the Python backend takes one
        if !self.use_gpu {
            cmd.args(["--device", "cpu", "--fp16", "False"]);
        }

        info!("🚀 Running Python Whisper: {} model on {}", self.model, audio_path.display());
        debug!("Executing command: {:?}", cmd);

        self.execute_and_parse(cmd, work_dir, &stem, "whisper").await
    }

    /// Execute backend command with a timeout and parse its JSON output file
    async fn execute_and_parse(
        &self,
        mut cmd: Command,
        work_dir: &Path,
        stem: &str,
        backend_name: &str,
    ) -> Result<WhisperOutput> {
        let timeout_duration = Duration::from_secs(self.config.timeout);

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn {} command: {}", backend_name, e))?;

        let output = match tokio::time::timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(anyhow!(
                    "{} command timed out after {} seconds",
                    backend_name,
                    self.config.timeout
                ));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            debug!("{} stderr: {}", backend_name, line);
        }

        if !output.status.success() {
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(5)..].join("\n");
            return Err(anyhow!(
                "{} transcription failed with exit code {}: {}",
                backend_name,
                output.status,
                tail
            ));
        }

        let json_path = self.find_output_json(work_dir, stem).await?;
        debug!("Parsing Whisper JSON output: {}", json_path.display());

        let json_content = tokio::fs::read_to_string(&json_path).await?;
        serde_json::from_str::<WhisperOutput>(&json_content)
            .map_err(|e| anyhow!("Failed to parse {} JSON output: {}", backend_name, e))
    }

    /// Locate the JSON file the backend produced
    async fn find_output_json(&self, work_dir: &Path, stem: &str) -> Result<PathBuf> {
        let expected = work_dir.join(format!("{}.json", stem));
        if expected.exists() {
            return Ok(expected);
        }

        // Some backends name the file differently; take any JSON in the work dir
        let mut entries = tokio::fs::read_dir(work_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                return Ok(path);
            }
        }

        Err(anyhow!("No Whisper JSON output found in {}", work_dir.display()))
    }

    /// Convert raw backend output into ordered segments
    fn process_output(&self, output: WhisperOutput, processing_time: Duration) -> TranscriptionResult {
        let (mut segments, language) = if !output.transcription.is_empty() {
            debug!(
                "Using whisper.cpp JSON format with {} segments",
                output.transcription.len()
            );

            let segments: Vec<TranscriptionSegment> = output
                .transcription
                .iter()
                .map(|seg| TranscriptionSegment {
                    id: 0,
                    start: Self::parse_timestamp(&seg.timestamps.from).unwrap_or(0.0),
                    end: Self::parse_timestamp(&seg.timestamps.to).unwrap_or(0.0),
                    text: seg.text.trim().to_string(),
                })
                .collect();

            let language = output
                .result
                .as_ref()
                .map(|r| r.language.clone())
                .or(output.language);

            (segments, language)
        } else {
            debug!("Using OpenAI Whisper JSON format with {} segments", output.segments.len());

            let segments: Vec<TranscriptionSegment> = output
                .segments
                .iter()
                .map(|seg| TranscriptionSegment {
                    id: 0,
                    start: seg.start,
                    end: seg.end,
                    text: seg.text.trim().to_string(),
                })
                .collect();

            (segments, output.language)
        };

        segments.retain(|seg| !seg.text.is_empty());
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        for (i, seg) in segments.iter_mut().enumerate() {
            seg.id = i as u32;
        }

        let text = output.text.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| {
            segments
                .iter()
                .map(|seg| seg.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });

        TranscriptionResult {
            text: text.trim().to_string(),
            language,
            segments,
            processing_time,
            model_used: self.model.clone(),
        }
    }

    /// Parse timestamp in "HH:MM:SS,mmm" format to seconds
    fn parse_timestamp(timestamp: &str) -> Result<f64> {
        let parts: Vec<&str> = timestamp.split(',').collect();
        if parts.len() != 2 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let milliseconds: f64 = parts[1].parse::<f64>()? / 1000.0;

        let time_components: Vec<&str> = parts[0].split(':').collect();
        if time_components.len() != 3 {
            return Err(anyhow!("Invalid time format: {}", parts[0]));
        }

        let hours: f64 = time_components[0].parse()?;
        let minutes: f64 = time_components[1].parse()?;
        let seconds: f64 = time_components[2].parse()?;

        Ok(hours * 3600.0 + minutes * 60.0 + seconds + milliseconds)
    }

    /// Resolve the ggml model file for whisper.cpp, if one exists locally
    fn resolve_model_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config.model_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!("Configured model path not found: {}", path.display());
        }

        let candidate = PathBuf::from(format!("models/ggml-{}.bin", self.model));
        if candidate.exists() {
            return Some(candidate);
        }

        None
    }

    fn file_stem(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string())
    }

    /// Check if a command is available
    async fn check_command_available(cmd_name: &str) -> bool {
        Command::new(cmd_name)
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Check if any Whisper backend is available
    pub async fn check_availability() -> Result<String> {
        let backends = [
            ("whisper-cli", "whisper.cpp (whisper-cli)"),
            ("whisper-cpp", "whisper.cpp"),
            ("whisper", "OpenAI Whisper (Python)"),
        ];

        for (cmd_name, description) in &backends {
            if Self::check_command_available(cmd_name).await {
                return Ok(format!("{} available", description));
            }
        }

        Err(anyhow!(
            "No Whisper backend found. Please install:\n\
            - whisper.cpp (recommended): https://github.com/ggerganov/whisper.cpp\n\
            - Or OpenAI Whisper: pip install openai-whisper"
        ))
    }
}

/// Whisper JSON output, accepting both whisper.cpp and OpenAI layouts
#[derive(Debug, Clone, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    transcription: Vec<CppSegment>,
    #[serde(default)]
    result: Option<CppResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct CppResult {
    language: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CppSegment {
    timestamps: CppTimestamps,
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CppTimestamps {
    from: String,
    to: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriptionConfig;

    fn test_transcriber() -> WhisperTranscriber {
        WhisperTranscriber::new(TranscriptionConfig::default())
    }

    #[test]
    fn test_transcriber_creation() {
        let transcriber = test_transcriber();
        assert_eq!(transcriber.model(), "medium");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(WhisperTranscriber::parse_timestamp("00:00:00,000").unwrap(), 0.0);
        let parsed = WhisperTranscriber::parse_timestamp("00:01:23,456").unwrap();
        assert!((parsed - 83.456).abs() < 1e-9);
        assert_eq!(WhisperTranscriber::parse_timestamp("01:00:00,000").unwrap(), 3600.0);
        assert!(WhisperTranscriber::parse_timestamp("1:23").is_err());
    }

    #[test]
    fn test_process_whisper_cpp_output() {
        let json = r#"{
            "result": { "language": "en" },
            "transcription": [
                {
                    "timestamps": { "from": "00:00:00,000", "to": "00:00:04,500" },
                    "text": " Welcome to the tutorial."
                },
                {
                    "timestamps": { "from": "00:00:04,500", "to": "00:00:09,000" },
                    "text": " First, open the terminal."
                }
            ]
        }"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let result = test_transcriber().process_output(output, Duration::from_secs(2));

        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].text, "Welcome to the tutorial.");
        assert_eq!(result.segments[1].start, 4.5);
        assert_eq!(result.language.as_deref(), Some("en"));
        assert_eq!(result.text, "Welcome to the tutorial. First, open the terminal.");
    }

    #[test]
    fn test_process_openai_output() {
        let json = r#"{
            "text": "Hello world.",
            "language": "en",
            "segments": [
                { "start": 0.0, "end": 2.0, "text": " Hello world." }
            ]
        }"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let result = test_transcriber().process_output(output, Duration::from_secs(1));

        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.text, "Hello world.");
        assert_eq!(result.model_used, "medium");
    }

    #[test]
    fn test_empty_segments_are_dropped() {
        let json = r#"{
            "transcription": [
                {
                    "timestamps": { "from": "00:00:00,000", "to": "00:00:01,000" },
                    "text": "   "
                },
                {
                    "timestamps": { "from": "00:00:01,000", "to": "00:00:02,000" },
                    "text": "Keep me."
                }
            ]
        }"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let result = test_transcriber().process_output(output, Duration::from_secs(1));

        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].id, 0);
        assert_eq!(result.segments[0].text, "Keep me.");
    }

    #[test]
    fn test_segments_sorted_by_start() {
        let json = r#"{
            "segments": [
                { "start": 5.0, "end": 7.0, "text": "second" },
                { "start": 0.0, "end": 2.0, "text": "first" }
            ]
        }"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let result = test_transcriber().process_output(output, Duration::from_secs(1));

        assert_eq!(result.segments[0].text, "first");
        assert_eq!(result.segments[1].text, "second");
        assert_eq!(result.segments[1].id, 1);
    }

    #[test]
    fn test_whisper_availability() {
        // Passes or fails based on whether a backend is installed; just exercise it
        tokio_test::block_on(async {
            let _result = WhisperTranscriber::check_availability().await;
        });
    }
}
