use crate::error::VoiceError;
use carrie_types::{AudioFrame, BYTES_PER_SAMPLE};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Converts compressed audio to raw PCM by piping it through `ffmpeg`.
///
/// Decoding is never done in-process. Each call spawns one scoped child
/// with `kill_on_drop`, so a cancelled or timed-out call does not leave the
/// process running.
#[derive(Debug, Clone)]
pub struct AudioBridge {
    ffmpeg_binary: PathBuf,
    timeout: Option<Duration>,
}

impl AudioBridge {
    pub fn new(ffmpeg_binary: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_binary: ffmpeg_binary.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Decodes `compressed` (MP3, WAV, WebM...) into s16le PCM.
    pub async fn to_pcm(
        &self,
        compressed: &[u8],
        sample_rate: u32,
        channels: u16,
    ) -> Result<Vec<u8>, VoiceError> {
        let args = vec![
            "-i".to_string(),
            "pipe:0".to_string(),
            "-f".to_string(),
            "s16le".to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-ac".to_string(),
            channels.to_string(),
            "pipe:1".to_string(),
        ];
        let pcm = self.run(args, compressed.to_vec()).await?;
        debug!(
            input_bytes = compressed.len(),
            output_bytes = pcm.len(),
            sample_rate,
            channels,
            "converted audio to PCM"
        );
        Ok(pcm)
    }

    /// Resamples mono s16le PCM from `from_rate` to `to_rate`.
    pub async fn resample(
        &self,
        pcm: &[u8],
        from_rate: u32,
        to_rate: u32,
    ) -> Result<Vec<u8>, VoiceError> {
        let args = vec![
            "-f".to_string(),
            "s16le".to_string(),
            "-ar".to_string(),
            from_rate.to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-f".to_string(),
            "s16le".to_string(),
            "-ar".to_string(),
            to_rate.to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "pipe:1".to_string(),
        ];
        self.run(args, pcm.to_vec()).await
    }

    /// Splits s16le PCM into frames of `frame_size_samples` samples.
    ///
    /// A trailing chunk shorter than a full frame is dropped, not padded.
    pub fn to_frames(pcm: &[u8], sample_rate: u32, frame_size_samples: usize) -> Vec<AudioFrame> {
        let frame_bytes = match frame_size_samples.checked_mul(BYTES_PER_SAMPLE) {
            Some(0) | None => return Vec::new(),
            Some(bytes) => bytes,
        };

        pcm.chunks_exact(frame_bytes)
            .map(|chunk| AudioFrame::new(chunk.to_vec(), sample_rate))
            .collect()
    }

    async fn run(&self, args: Vec<String>, input: Vec<u8>) -> Result<Vec<u8>, VoiceError> {
        let binary = self.ffmpeg_binary.display().to_string();

        let mut command = Command::new(&self.ffmpeg_binary);
        command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| VoiceError::Transcode(format!("Failed to spawn {}: {}", binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoiceError::Transcode("Failed to open stdin".to_string()))?;

        // Feed stdin from its own task so a full stdout pipe cannot deadlock us.
        let write_task = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    VoiceError::Transcode(format!("{} timed out after {:?}", binary, limit))
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| VoiceError::Transcode(format!("Failed to wait for {}: {}", binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Transcode(format!(
                "{} exited with {}: {}",
                binary,
                output.status,
                stderr.trim()
            )));
        }

        match write_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "transcoder closed stdin before all input was written"),
            Err(e) => warn!(error = %e, "transcoder stdin task failed"),
        }

        Ok(output.stdout)
    }
}

impl Default for AudioBridge {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrie_types::{DEFAULT_FRAME_SAMPLES, DEFAULT_SAMPLE_RATE};

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let pcm = vec![7u8; 3000];
        let frames = AudioBridge::to_frames(&pcm, DEFAULT_SAMPLE_RATE, DEFAULT_FRAME_SAMPLES);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 1920);
    }

    #[test]
    fn frames_cover_floor_of_buffer() {
        for len in [0usize, 1, 1919, 1920, 1921, 3840, 5000, 9600] {
            let pcm: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let frames = AudioBridge::to_frames(&pcm, DEFAULT_SAMPLE_RATE, DEFAULT_FRAME_SAMPLES);

            assert!(frames.iter().all(|f| f.len() == 1920));
            let joined: Vec<u8> = frames.iter().flat_map(|f| f.as_bytes().to_vec()).collect();
            assert_eq!(joined.len(), (len / 1920) * 1920);
            assert_eq!(&joined[..], &pcm[..joined.len()]);
        }
    }

    #[test]
    fn zero_frame_size_yields_nothing() {
        assert!(AudioBridge::to_frames(&[0u8; 64], 16_000, 0).is_empty());
    }

    #[test]
    fn oversized_frame_size_yields_nothing() {
        assert!(AudioBridge::to_frames(&[0u8; 64], 16_000, usize::MAX).is_empty());
        assert!(AudioBridge::to_frames(&[0u8; 64], 16_000, usize::MAX / 2 + 1).is_empty());
    }

    #[test]
    fn frames_carry_sample_rate() {
        let frames = AudioBridge::to_frames(&[0u8; 640], 16_000, 160);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.sample_rate() == 16_000));
        assert_eq!(frames[0].duration_ms(), 10);
    }
}
