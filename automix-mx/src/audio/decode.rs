//! PCM decode via the external transcoder
//!
//! Decodes any supported container to mono float32 at the working rate
//! by piping bytes through the transcoder and streaming raw `f32le` off
//! its stdout. No intermediate WAV is materialized. Each decode carries
//! a deadline; child processes are killed on drop so a timeout cannot
//! leak a process.

use crate::audio::types::PcmBuffer;
use crate::error::DecodeError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Containers the service accepts
pub const SUPPORTED_MIMES: [&str; 2] = ["audio/mpeg", "audio/wav"];

/// Demuxer name for a supported mime, for unambiguous pipe input
fn demuxer_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "audio/mpeg" => Some("mp3"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        _ => None,
    }
}

/// External-transcoder PCM decoder
///
/// Binary paths are resolved once at startup; every decode spawns its
/// own child, so concurrent decodes do not contend.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg_path: String,
    ffprobe_path: String,
    sample_rate: u32,
    timeout: Duration,
}

impl FfmpegDecoder {
    pub fn new(ffmpeg_path: &str, ffprobe_path: &str, sample_rate: u32, timeout_seconds: u64) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_string(),
            ffprobe_path: ffprobe_path.to_string(),
            sample_rate,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    /// Decode container bytes to mono PCM at the working rate
    pub async fn decode_bytes(&self, bytes: &[u8], mime: &str) -> Result<PcmBuffer, DecodeError> {
        let demuxer =
            demuxer_for_mime(mime).ok_or_else(|| DecodeError::UnsupportedContainer {
                mime: mime.to_string(),
            })?;

        let mut child = Command::new(&self.ffmpeg_path)
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                demuxer,
                "-i",
                "pipe:0",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                "1",
                "-ar",
            ])
            .arg(self.sample_rate.to_string())
            .arg("pipe:1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdin = child.stdin.take().expect("stdin piped");
        let mut stdout = child.stdout.take().expect("stdout piped");
        let mut stderr = child.stderr.take().expect("stderr piped");

        let input = bytes.to_vec();
        let writer = tokio::spawn(async move {
            // The child may stop reading early on malformed input; a write
            // error here is not itself a decode failure.
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        });

        let deadline = self.timeout;
        let result = tokio::time::timeout(deadline, async {
            let mut raw = Vec::new();
            stdout
                .read_to_end(&mut raw)
                .await
                .map_err(|e| DecodeError::TranscoderFailed {
                    detail: format!("reading decoded stream: {e}"),
                })?;
            let mut err_text = String::new();
            let _ = stderr.read_to_string(&mut err_text).await;
            let status = child.wait().await.map_err(|e| DecodeError::TranscoderFailed {
                detail: format!("waiting for transcoder: {e}"),
            })?;
            Ok::<_, DecodeError>((raw, err_text, status))
        })
        .await
        .map_err(|_| DecodeError::Timeout {
            seconds: deadline.as_secs(),
        })??;
        let _ = writer.await;

        let (raw, err_text, status) = result;
        let samples = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect::<Vec<f32>>();

        if !status.success() {
            // Partial output past the first frame is usable; anything less
            // is a truncated stream.
            if samples.len() < 1024 {
                return Err(DecodeError::TruncatedStream {
                    frames_decoded: samples.len(),
                });
            }
            warn!(
                decoded = samples.len(),
                stderr = %err_text.trim(),
                "transcoder exited nonzero after partial decode; keeping output"
            );
        }
        if samples.is_empty() {
            return Err(DecodeError::TruncatedStream { frames_decoded: 0 });
        }

        debug!(
            samples = samples.len(),
            seconds = samples.len() as f64 / f64::from(self.sample_rate),
            "decoded to mono PCM"
        );

        Ok(PcmBuffer {
            samples,
            sample_rate: self.sample_rate,
            channels: 1,
        })
    }

    /// Container-reported duration in seconds, if the prober can tell
    ///
    /// Probe failures are soft: analysis falls back to the sample count.
    pub async fn probe_duration(&self, bytes: &[u8], mime: &str) -> Option<f64> {
        let demuxer = demuxer_for_mime(mime)?;
        let mut child = Command::new(&self.ffprobe_path)
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                demuxer,
                "-show_entries",
                "format=duration",
                "-of",
                "csv=p=0",
                "pipe:0",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .ok()?;

        let mut stdin = child.stdin.take()?;
        let input = bytes.to_vec();
        let writer = tokio::spawn(async move {
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        });

        let output = tokio::time::timeout(Duration::from_secs(10), async {
            let mut stdout = child.stdout.take()?;
            let mut out = String::new();
            stdout.read_to_string(&mut out).await.ok()?;
            let _ = child.wait().await;
            Some(out)
        })
        .await
        .ok()??;
        let _ = writer.await;

        let duration: f64 = output.trim().parse().ok()?;
        (duration > 0.0).then_some(duration)
    }

    fn spawn_error(&self, e: std::io::Error) -> DecodeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            DecodeError::BinaryMissing {
                path: self.ffmpeg_path.clone(),
            }
        } else {
            DecodeError::TranscoderFailed {
                detail: format!("spawn: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demuxer_mapping() {
        assert_eq!(demuxer_for_mime("audio/mpeg"), Some("mp3"));
        assert_eq!(demuxer_for_mime("audio/wav"), Some("wav"));
        assert_eq!(demuxer_for_mime("audio/x-wav"), Some("wav"));
        assert_eq!(demuxer_for_mime("video/mp4"), None);
    }

    #[tokio::test]
    async fn test_unsupported_mime_rejected() {
        let decoder = FfmpegDecoder::new("ffmpeg", "ffprobe", 44100, 60);
        let err = decoder.decode_bytes(b"not audio", "application/pdf").await;
        assert!(matches!(
            err,
            Err(DecodeError::UnsupportedContainer { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_reported() {
        let decoder = FfmpegDecoder::new("/nonexistent/transcoder-bin", "ffprobe", 44100, 60);
        let err = decoder.decode_bytes(&[0u8; 128], "audio/wav").await;
        assert!(matches!(err, Err(DecodeError::BinaryMissing { .. })));
    }
}
