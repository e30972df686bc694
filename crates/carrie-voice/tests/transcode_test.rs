//! `AudioBridge` against shell scripts standing in for ffmpeg.

mod common;

use common::{fake_ffmpeg, passthrough_ffmpeg};

use carrie_voice::{AudioBridge, VoiceError};
use std::time::Duration;

#[tokio::test]
async fn to_pcm_pipes_input_through_transcoder() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = AudioBridge::new(passthrough_ffmpeg(dir.path()));

    let input: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();
    let pcm = bridge.to_pcm(&input, 48_000, 1).await.unwrap();
    assert_eq!(pcm, input);
}

#[tokio::test]
async fn to_pcm_passes_rate_and_channels() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_ffmpeg(dir.path(), "ffmpeg-args", "cat > /dev/null\nprintf '%s ' \"$@\"");
    let bridge = AudioBridge::new(script);

    let out = bridge.to_pcm(b"mp3", 24_000, 2).await.unwrap();
    let args = String::from_utf8(out).unwrap();
    assert_eq!(
        args.trim_end(),
        "-hide_banner -loglevel error -i pipe:0 -f s16le -ar 24000 -ac 2 pipe:1"
    );
}

#[tokio::test]
async fn resample_declares_input_format() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_ffmpeg(dir.path(), "ffmpeg-args", "cat > /dev/null\nprintf '%s ' \"$@\"");
    let bridge = AudioBridge::new(script);

    let out = bridge.resample(&[0u8; 32], 16_000, 48_000).await.unwrap();
    let args = String::from_utf8(out).unwrap();
    assert_eq!(
        args.trim_end(),
        "-hide_banner -loglevel error -f s16le -ar 16000 -ac 1 -i pipe:0 -f s16le -ar 48000 -ac 1 pipe:1"
    );
}

#[tokio::test]
async fn non_zero_exit_reports_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_ffmpeg(
        dir.path(),
        "ffmpeg-fail",
        "cat > /dev/null\necho 'Invalid data found when processing input' >&2\nexit 1",
    );
    let bridge = AudioBridge::new(script);

    match bridge.to_pcm(b"garbage", 48_000, 1).await {
        Err(VoiceError::Transcode(msg)) => {
            assert!(msg.contains("Invalid data found"), "message was {}", msg)
        }
        other => panic!("Expected Transcode error, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_binary_is_transcode_error() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = AudioBridge::new(dir.path().join("no-such-ffmpeg"));

    match bridge.to_pcm(b"data", 48_000, 1).await {
        Err(VoiceError::Transcode(msg)) => assert!(msg.contains("Failed to spawn")),
        other => panic!("Expected Transcode error, got {:?}", other),
    }
}

#[tokio::test]
async fn timeout_abandons_hung_transcoder() {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_ffmpeg(dir.path(), "ffmpeg-hang", "exec sleep 30");
    let bridge = AudioBridge::new(script).with_timeout(Duration::from_millis(200));

    let started = std::time::Instant::now();
    match bridge.to_pcm(b"data", 48_000, 1).await {
        Err(VoiceError::Transcode(msg)) => assert!(msg.contains("timed out")),
        other => panic!("Expected Transcode timeout, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(10));
}
