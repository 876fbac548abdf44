use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::shared::config::{self, TtsConfig};
use crate::shared::error::ai::TtsError;
use crate::shared::ports::ai::{AiFuture, TtsPort};

/// VOICEVOX-compatible engine client (AivisSpeech by default).
#[derive(Clone)]
pub struct SpeechSynthesizer {
    client: Client,
    engine_url: String,
    speaker: u64,
    readings: Vec<(String, String)>,
}

impl SpeechSynthesizer {
    pub fn from_config() -> Result<Self> {
        Self::new(config::tts_config(), config::timeouts().ai_http)
    }

    pub fn new(cfg: &TtsConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: super::http_client(timeout)?,
            engine_url: cfg.engine_url.trim_end_matches('/').to_string(),
            speaker: cfg.speaker,
            readings: cfg.readings.clone(),
        })
    }

    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()> {
        let speaker = self.speaker.to_string();
        let query_resp = self
            .client
            .post(format!("{}/audio_query", self.engine_url))
            .query(&[("text", text), ("speaker", speaker.as_str())])
            .send()
            .await?;
        let status = query_resp.status();
        let query_body = query_resp.text().await?;
        if !status.is_success() {
            anyhow::bail!("audio_query error {}: {}", status, query_body);
        }

        let synth_resp = self
            .client
            .post(format!("{}/synthesis", self.engine_url))
            .query(&[("speaker", speaker.as_str())])
            .header("Content-Type", "application/json")
            .body(query_body)
            .send()
            .await?;
        let status = synth_resp.status();
        let wav_bytes = synth_resp.bytes().await?;
        if !status.is_success() {
            anyhow::bail!("synthesis error {} ({} bytes)", status, wav_bytes.len());
        }

        write_atomically(out_path, &wav_bytes).await
    }
}

/// Applies reading substitutions in order so the engine pronounces names correctly.
pub fn apply_readings(text: &str, readings: &[(String, String)]) -> String {
    readings
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
}

/// Writes to a sibling temp file and renames it over `path` after flushing, so
/// the avatar never plays a half-written file.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let tmp = temp_sibling(path);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "voice.wav".into());
    name.push(".part");
    path.with_file_name(name)
}

impl TtsPort for SpeechSynthesizer {
    fn synth_to_wav(&self, text: String, path: PathBuf) -> AiFuture<Result<PathBuf, TtsError>> {
        let this = self.clone();
        Box::pin(async move {
            let spoken = apply_readings(text.trim(), &this.readings);
            if spoken.is_empty() {
                return Err(TtsError::EmptyText);
            }
            this.synthesize(&spoken, &path)
                .await
                .map_err(|e| TtsError::SynthesisFailed(e.to_string()))?;
            log::debug!("[tts] written to {}", path.display());
            Ok(path)
        })
    }
}
