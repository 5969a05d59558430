use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::llm::{LlmConfig, LlmProvider};
use crate::output::TranscriptFormat;

/// Configuration for the video-scribe pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Audio extraction settings
    pub audio: AudioConfig,

    /// Whisper transcription settings
    pub transcription: TranscriptionConfig,

    /// Note generation settings
    pub notes: NotesConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate for transcription
    pub target_sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper model size (tiny, base, small, medium, large-v3, ...)
    pub model: String,

    /// Language hint; auto-detected when unset
    pub language: Option<String>,

    /// Timeout for the backend command (seconds)
    pub timeout: u64,

    /// Enable GPU acceleration where the backend supports it
    pub use_gpu: bool,

    /// Temperature setting (0.0 = deterministic)
    pub temperature: f32,

    /// Beam size for decoding
    pub beam_size: u32,

    /// Explicit ggml model file for whisper.cpp backends
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Generate tutorial notes after transcription
    pub enabled: bool,

    /// LLM provider to use
    pub provider: LlmProvider,

    /// Base URL of the local LLM server
    pub endpoint: String,

    /// Model to use for note generation
    pub model: String,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Transcript chunk size in characters (context-window headroom)
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl NotesConfig {
    /// Provider-level view of this configuration
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            provider: self.provider.clone(),
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Transcript output format
    pub format: TranscriptFormat,

    /// Keep the extracted audio file after transcription
    pub keep_audio: bool,
}

impl Config {
    /// Load configuration from file, falling back to environment overrides
    pub fn load() -> Result<Self> {
        let mut config_paths = vec![
            PathBuf::from("video-scribe.toml"),
            PathBuf::from("config/video-scribe.toml"),
        ];
        if let Some(user_config) = Self::user_config_path() {
            config_paths.push(user_config);
        }

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// `~/.config/video-scribe/config.toml`, resolved against `$HOME`
    fn user_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config/video-scribe/config.toml"))
    }

    /// Build configuration from defaults plus environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(model) = std::env::var("VIDEO_SCRIBE_MODEL") {
            config.transcription.model = model;
        }

        if let Ok(sample_rate) = std::env::var("VIDEO_SCRIBE_SAMPLE_RATE") {
            if let Ok(rate) = sample_rate.parse() {
                config.audio.target_sample_rate = rate;
            }
        }

        if let Ok(endpoint) = std::env::var("VIDEO_SCRIBE_OLLAMA_URL") {
            config.notes.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("VIDEO_SCRIBE_NOTES_MODEL") {
            config.notes.model = model;
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.audio.target_sample_rate == 0 {
            return Err(anyhow!("target_sample_rate must be greater than 0"));
        }

        if self.transcription.timeout == 0 {
            return Err(anyhow!("transcription timeout must be greater than 0"));
        }

        if self.transcription.model.is_empty() {
            return Err(anyhow!("transcription model must not be empty"));
        }

        if self.notes.enabled {
            if self.notes.endpoint.is_empty() {
                return Err(anyhow!("LLM endpoint required when note generation is enabled"));
            }
            if self.notes.chunk_overlap >= self.notes.chunk_size {
                return Err(anyhow!("chunk_overlap must be smaller than chunk_size"));
            }
        }

        Ok(())
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "medium".to_string(),
            language: None,
            timeout: 3600, // 60 minutes for long videos
            use_gpu: true,
            temperature: 0.0,
            beam_size: 5,
            model_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig {
                target_sample_rate: 16000, // Optimal for Whisper
            },
            transcription: TranscriptionConfig {
                model: "medium".to_string(),
                language: None,
                timeout: 3600, // 60 minutes for long videos
                use_gpu: true,
                temperature: 0.0,
                beam_size: 5,
                model_path: None,
            },
            notes: NotesConfig {
                enabled: false,
                provider: LlmProvider::Ollama,
                endpoint: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
                temperature: 0.7,
                timeout_seconds: 300,
                // 8k-context models fit ~24k characters; leave room for prompt and output
                chunk_size: 15000,
                chunk_overlap: 500,
            },
            output: OutputConfig {
                format: TranscriptFormat::Markdown,
                keep_audio: false,
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.transcription.model = model.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.config.transcription.language = Some(language.into());
        self
    }

    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.config.transcription.use_gpu = use_gpu;
        self
    }

    pub fn with_format(mut self, format: TranscriptFormat) -> Self {
        self.config.output.format = format;
        self
    }

    pub fn keep_audio(mut self, keep: bool) -> Self {
        self.config.output.keep_audio = keep;
        self
    }

    pub fn enable_notes(mut self, enable: bool) -> Self {
        self.config.notes.enabled = enable;
        self
    }

    pub fn with_notes_model(mut self, model: impl Into<String>) -> Self {
        self.config.notes.model = model.into();
        self
    }

    pub fn with_notes_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.notes.endpoint = endpoint.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.target_sample_rate, 16000);
        assert_eq!(config.transcription.model, "medium");
        assert_eq!(config.transcription.beam_size, 5);
        assert!(!config.notes.enabled);
        assert_eq!(config.output.format, TranscriptFormat::Markdown);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_model("small")
            .with_gpu(false)
            .with_format(TranscriptFormat::Json)
            .enable_notes(true)
            .with_notes_model("mistral")
            .build();

        assert_eq!(config.transcription.model, "small");
        assert!(!config.transcription.use_gpu);
        assert_eq!(config.output.format, TranscriptFormat::Json);
        assert!(config.notes.enabled);
        assert_eq!(config.notes.model, "mistral");
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut bad = Config::default();
        bad.audio.target_sample_rate = 0;
        assert!(bad.validate().is_err());

        let mut bad = Config::default();
        bad.notes.enabled = true;
        bad.notes.chunk_overlap = bad.notes.chunk_size;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_notes_llm_config_view() {
        let config = Config::default();
        let llm = config.notes.llm_config();
        assert_eq!(llm.endpoint, "http://localhost:11434");
        assert_eq!(llm.model, "llama3");
        assert_eq!(llm.provider, LlmProvider::Ollama);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.transcription.model, config.transcription.model);
        assert_eq!(parsed.output.format, config.output.format);
    }

    #[test]
    fn test_user_config_path_resolves_against_home() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_dir = temp_dir.path().join(".config/video-scribe");
        std::fs::create_dir_all(&config_dir).unwrap();

        let mut on_disk = Config::default();
        on_disk.transcription.model = "tiny".to_string();
        std::fs::write(
            config_dir.join("config.toml"),
            toml::to_string_pretty(&on_disk).unwrap(),
        )
        .unwrap();

        let old_home = std::env::var_os("HOME");
        std::env::set_var("HOME", temp_dir.path());
        let resolved = Config::user_config_path();
        let loaded = Config::load();
        match old_home {
            Some(home) => std::env::set_var("HOME", home),
            None => std::env::remove_var("HOME"),
        }

        assert_eq!(
            resolved.unwrap(),
            temp_dir.path().join(".config/video-scribe/config.toml")
        );
        assert_eq!(loaded.unwrap().transcription.model, "tiny");
    }
}
