use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use reqwest::{multipart, Client};
use serde::Deserialize;

use crate::shared::config::{self, AsrConfig};
use crate::shared::entities::Recognition;
use crate::shared::error::ai::AsrError;
use crate::shared::ports::ai::{AiFuture, SpeechCapturePort};
use crate::shared::utils::{fill_template, preview};

#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Records one utterance with an external command, then transcribes it with a
/// local Whisper server.
#[derive(Clone)]
pub struct WhisperCapture {
    client: Client,
    whisper_url: String,
    record_command: String,
    wav_path: PathBuf,
    listen_timeout: Duration,
}

impl WhisperCapture {
    pub fn from_config() -> Result<Self> {
        let timeouts = config::timeouts();
        Self::new(config::asr_config(), timeouts.ai_http, timeouts.asr_listen)
    }

    pub fn new(cfg: &AsrConfig, http_timeout: Duration, listen_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: super::http_client(http_timeout)?,
            whisper_url: cfg.whisper_url.clone(),
            record_command: cfg.record_command.clone(),
            wav_path: cfg.wav_path.clone(),
            listen_timeout,
        })
    }

    async fn record(&self) -> Result<(), AsrError> {
        if let Some(dir) = self.wav_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AsrError::RecordingFailed(e.to_string()))?;
        }
        let path = self.wav_path.to_string_lossy();
        let command = fill_template(&self.record_command, &[("path", path.as_ref())]);
        log::info!("[asr] listening...");
        let run = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .kill_on_drop(true)
            .status();
        let status = tokio::time::timeout(self.listen_timeout, run)
            .await
            .map_err(|_| AsrError::Timeout)?
            .map_err(|e| AsrError::RecordingFailed(e.to_string()))?;
        if !status.success() {
            return Err(AsrError::RecordingFailed(format!(
                "record command exited with {}",
                status
            )));
        }
        Ok(())
    }

    async fn transcribe(&self) -> Result<String> {
        let bytes = tokio::fs::read(&self.wav_path).await?;
        let part = multipart::Part::bytes(bytes)
            .file_name("question.wav")
            .mime_str("audio/wav")?;
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(&self.whisper_url)
            .multipart(form)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("whisper error: {} - {}", status, body);
        }
        let result: WhisperResponse = resp.json().await?;
        Ok(result.text)
    }
}

// Whisper tends to emit these on silence.
const HALLUCINATION_PATTERNS: &[&str] = &[
    "ご視聴ありがとうございました",
    "チャンネル登録",
    "高評価",
];

fn is_hallucination(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty()
        || HALLUCINATION_PATTERNS
            .iter()
            .any(|pattern| trimmed.contains(pattern))
}

impl SpeechCapturePort for WhisperCapture {
    fn listen(&self) -> AiFuture<Result<Recognition, AsrError>> {
        let this = self.clone();
        Box::pin(async move {
            match this.record().await {
                Ok(()) => {}
                Err(AsrError::Timeout) => {
                    log::info!("[asr] no speech before timeout");
                    return Ok(Recognition::silence());
                }
                Err(err) => return Err(err),
            }
            let text = this.transcribe().await.map_err(|e| {
                if e.is::<reqwest::Error>() {
                    AsrError::ServiceUnavailable
                } else {
                    AsrError::TranscriptionFailed(e.to_string())
                }
            })?;
            if is_hallucination(&text) {
                log::info!("[asr] discarded: {}", preview(&text, 40));
                return Ok(Recognition::silence());
            }
            log::info!("[asr] recognized: {}", preview(&text, 80));
            Ok(Recognition::heard(text.trim()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hallucination_patterns_match() {
        assert!(is_hallucination("ご視聴ありがとうございました"));
        assert!(is_hallucination("チャンネル登録よろしく"));
        assert!(is_hallucination("   "));
    }

    #[test]
    fn normal_speech_passes() {
        assert!(!is_hallucination("今日の天気を教えて"));
    }

    #[tokio::test]
    async fn failing_record_command_is_recording_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AsrConfig {
            whisper_url: "http://127.0.0.1:9/transcribe".to_string(),
            record_command: "exit 3".to_string(),
            wav_path: dir.path().join("question.wav"),
        };
        let capture =
            WhisperCapture::new(&cfg, Duration::from_secs(1), Duration::from_secs(5)).unwrap();
        let err = capture.listen().await.unwrap_err();
        assert!(matches!(err, AsrError::RecordingFailed(_)));
    }
}
