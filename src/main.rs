use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::{info, warn};

use video_scribe::config::Config;
use video_scribe::output::TranscriptFormat;
use video_scribe::pipeline::{Pipeline, PipelineRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("video-scribe")
        .version("0.1.0")
        .about("Extract audio from a video file, transcribe it with Whisper and optionally generate tutorial notes")
        .arg(
            Arg::new("input")
                .value_name("VIDEO")
                .help("Path to the input video file")
                .required(true)
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Path to save the output transcript (default: <video name>.md)")
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Whisper model size (default: medium)")
        )
        .arg(
            Arg::new("device")
                .long("device")
                .value_name("DEVICE")
                .value_parser(["cuda", "cpu"])
                .help("Device to use for transcription (default: cuda)")
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .value_parser(["markdown", "json"])
                .help("Output format (default: markdown)")
        )
        .arg(
            Arg::new("language")
                .short('l')
                .long("language")
                .value_name("LANG")
                .help("Language hint for transcription (default: auto-detect)")
        )
        .arg(
            Arg::new("keep-audio")
                .long("keep-audio")
                .action(ArgAction::SetTrue)
                .help("Keep the extracted audio file after transcription")
        )
        .arg(
            Arg::new("notes")
                .long("notes")
                .action(ArgAction::SetTrue)
                .help("Generate tutorial notes from the transcript with a local LLM")
        )
        .arg(
            Arg::new("notes-model")
                .long("notes-model")
                .value_name("MODEL")
                .help("LLM model for note generation (default: llama3)")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose logging")
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let env_filter = if verbose {
        "video_scribe=debug,info"
    } else {
        "video_scribe=info,warn"
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Load configuration, then let CLI flags override it
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    if let Some(model) = matches.get_one::<String>("model") {
        config.transcription.model = model.clone();
    }

    if let Some(language) = matches.get_one::<String>("language") {
        config.transcription.language = Some(language.clone());
    }

    if let Some(device) = matches.get_one::<String>("device") {
        config.transcription.use_gpu = device == "cuda";
    }

    if let Some(format) = matches.get_one::<String>("format") {
        config.output.format = format.parse::<TranscriptFormat>()?;
    }

    if let Some(notes_model) = matches.get_one::<String>("notes-model") {
        config.notes.model = notes_model.clone();
    }

    config.validate()?;

    let video_path = PathBuf::from(
        matches
            .get_one::<String>("input")
            .expect("input argument is required"),
    );

    let request = PipelineRequest {
        video_path,
        output_path: matches.get_one::<String>("output").map(PathBuf::from),
        keep_audio: matches.get_flag("keep-audio") || config.output.keep_audio,
        generate_notes: matches.get_flag("notes") || config.notes.enabled,
    };

    info!("🎬 video-scribe starting...");
    info!("🔧 Model: {} | GPU: {}", config.transcription.model, config.transcription.use_gpu);

    let pipeline = Pipeline::new(config);
    let report = pipeline.run(&request).await?;

    if let Some(notes_path) = &report.notes_path {
        info!("📓 Tutorial notes saved to '{}'", notes_path.display());
    }

    Ok(())
}
