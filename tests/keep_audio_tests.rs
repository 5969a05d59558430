//! End-to-end checks for --keep-audio and temp file cleanup, driven by
//! shell stubs standing in for ffmpeg, ffprobe, and whisper-cli.
#![cfg(unix)]

use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

use video_scribe::config::Config;
use video_scribe::pipeline::{Pipeline, PipelineRequest};

// PATH is process-global, so tests that rewrite it must not interleave.
static PATH_LOCK: Mutex<()> = Mutex::new(());

// Stubs rely on shell builtins only (printf): the tests point PATH at the
// stub dir alone, so external commands like cat are unavailable.
const FFPROBE_STUB: &str = r#"#!/bin/sh
case "$*" in
*a:0*)
printf '%s\n' '{"format":{"duration":"2.0"},"streams":[{"codec_type":"audio","codec_name":"pcm_s16le","sample_rate":"16000","channels":1}]}'
;;
*)
printf '%s\n' '{"format":{"format_name":"mov,mp4","duration":"2.0"},"streams":[{"codec_type":"video","codec_name":"h264","width":640,"height":360,"r_frame_rate":"30/1"},{"codec_type":"audio","codec_name":"aac","sample_rate":"44100","channels":2}]}'
;;
esac
exit 0
"#;

const FFMPEG_STUB: &str = r#"#!/bin/sh
for arg in "$@"; do out="$arg"; done
printf 'RIFFfake' > "$out"
exit 0
"#;

const WHISPER_STUB: &str = r#"#!/bin/sh
prev=""
out=""
for arg in "$@"; do
  if [ "$prev" = "-of" ]; then out="$arg"; fi
  prev="$arg"
done
if [ -n "$out" ]; then
printf '%s\n' '{"result":{"language":"en"},"transcription":[{"timestamps":{"from":"00:00:00,000","to":"00:00:02,000"},"text":" Stub speech."}]}' > "$out.json"
fi
exit 0
"#;

fn install_stub(dir: &Path, name: &str, script: &str) {
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
}

fn restore_path(old: Option<OsString>) {
    match old {
        Some(path) => std::env::set_var("PATH", path),
        None => std::env::remove_var("PATH"),
    }
}

#[tokio::test]
async fn test_keep_audio_survives_transcription_failure() {
    let _guard = PATH_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let bin_dir = TempDir::new().unwrap();
    install_stub(bin_dir.path(), "ffprobe", FFPROBE_STUB);
    install_stub(bin_dir.path(), "ffmpeg", FFMPEG_STUB);
    // No whisper backend on PATH, so the run fails after extraction

    let work_dir = TempDir::new().unwrap();
    let video_path = work_dir.path().join("demo.mp4");
    std::fs::write(&video_path, b"mock video content").unwrap();

    let old_path = std::env::var_os("PATH");
    std::env::set_var("PATH", bin_dir.path());

    let pipeline = Pipeline::new(Config::default());
    let request = PipelineRequest {
        video_path,
        output_path: Some(work_dir.path().join("demo.md")),
        keep_audio: true,
        generate_notes: false,
    };
    let result = pipeline.run(&request).await;

    restore_path(old_path);

    let error = result.unwrap_err();
    assert!(
        error.to_string().contains("No Whisper backend found"),
        "unexpected error: {error:#}"
    );
    // The extracted audio must outlive the failed stage
    assert!(work_dir.path().join("demo.wav").exists());
    // The transcript is only written on success
    assert!(!work_dir.path().join("demo.md").exists());
}

#[tokio::test]
async fn test_keep_audio_persists_next_to_transcript_on_success() {
    let _guard = PATH_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let bin_dir = TempDir::new().unwrap();
    install_stub(bin_dir.path(), "ffprobe", FFPROBE_STUB);
    install_stub(bin_dir.path(), "ffmpeg", FFMPEG_STUB);
    install_stub(bin_dir.path(), "whisper-cli", WHISPER_STUB);

    let work_dir = TempDir::new().unwrap();
    let video_path = work_dir.path().join("demo.mp4");
    std::fs::write(&video_path, b"mock video content").unwrap();

    let old_path = std::env::var_os("PATH");
    std::env::set_var("PATH", bin_dir.path());

    let pipeline = Pipeline::new(Config::default());
    let request = PipelineRequest {
        video_path,
        output_path: Some(work_dir.path().join("demo.md")),
        keep_audio: true,
        generate_notes: false,
    };
    let result = pipeline.run(&request).await;

    restore_path(old_path);

    let report = result.unwrap();
    assert_eq!(report.segment_count, 1);

    let transcript = std::fs::read_to_string(work_dir.path().join("demo.md")).unwrap();
    assert!(transcript.contains("Stub speech."));
    assert!(work_dir.path().join("demo.wav").exists());
}

#[tokio::test]
async fn test_no_audio_left_behind_without_keep_audio() {
    let _guard = PATH_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let bin_dir = TempDir::new().unwrap();
    install_stub(bin_dir.path(), "ffprobe", FFPROBE_STUB);
    install_stub(bin_dir.path(), "ffmpeg", FFMPEG_STUB);

    let work_dir = TempDir::new().unwrap();
    let video_path = work_dir.path().join("demo.mp4");
    std::fs::write(&video_path, b"mock video content").unwrap();

    let old_path = std::env::var_os("PATH");
    std::env::set_var("PATH", bin_dir.path());

    let pipeline = Pipeline::new(Config::default());
    let request = PipelineRequest {
        video_path,
        output_path: Some(work_dir.path().join("demo.md")),
        keep_audio: false,
        generate_notes: false,
    };
    let result = pipeline.run(&request).await;

    restore_path(old_path);

    assert!(result.is_err());
    let leftovers: Vec<String> = std::fs::read_dir(work_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(leftovers, vec!["demo.mp4".to_string()]);
}
