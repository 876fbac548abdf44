//! Stateful Gemini `generateContent` chat sessions.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::shared::utils::preview;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, thiserror::Error)]
pub enum GeminiFailure {
    #[error("api key not configured")]
    MissingKey,
    #[error("rate limited")]
    RateLimited,
    #[error("no candidate text in response")]
    Empty,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inline_data: Option<InlineData>,
}

impl GeminiPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn png(base64_data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/png".to_string(),
                data: base64_data,
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn with_role(role: &str, parts: Vec<GeminiPart>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Serialize, Debug)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent,
    contents: &'a [GeminiContent],
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentOut>,
}

#[derive(Deserialize)]
struct GeminiContentOut {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub name: &'static str,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub system_prompt: String,
}

/// One chat session. The history lock is held for the whole round trip and is
/// only extended after a successful reply, so a failed call leaves it untouched.
pub struct ChatSession {
    spec: SessionSpec,
    api_base: String,
    history: Mutex<Vec<GeminiContent>>,
}

impl ChatSession {
    pub fn new(spec: SessionSpec, api_base: impl Into<String>) -> Self {
        Self {
            spec,
            api_base: api_base.into(),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    /// Sends `parts` as the next user message. `stored_text` is what the
    /// history keeps for that message (inline images are not retained).
    pub async fn send(
        &self,
        client: &Client,
        parts: Vec<GeminiPart>,
        stored_text: String,
    ) -> Result<String> {
        let api_key = self
            .spec
            .api_key
            .as_deref()
            .ok_or(GeminiFailure::MissingKey)?;

        let mut history = self.history.lock().await;
        let mut contents = history.clone();
        contents.push(GeminiContent::with_role("user", parts));

        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(self.spec.system_prompt.clone())],
            },
            contents: &contents,
            generation_config: GenerationConfig {
                temperature: self.spec.temperature,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 8192,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.spec.model
        );
        // Key goes in a header so it never shows up in a reqwest error's URL.
        let resp = client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = resp.status();
        let body_text = resp.text().await.map_err(reqwest::Error::without_url)?;
        log::debug!(
            "[gemini {}] status={} body={}",
            self.spec.name,
            status,
            preview(&body_text, 200)
        );

        if status.as_u16() == 429 {
            return Err(GeminiFailure::RateLimited.into());
        }
        if !status.is_success() {
            anyhow::bail!("Gemini HTTP error {}: {}", status, preview(&body_text, 200));
        }

        let answer = extract_answer(&body_text)?;
        history.push(GeminiContent::with_role(
            "user",
            vec![GeminiPart::text(stored_text)],
        ));
        history.push(GeminiContent::with_role(
            "model",
            vec![GeminiPart::text(answer.clone())],
        ));
        Ok(answer)
    }
}

/// Concatenated text parts of the first candidate.
fn extract_answer(body_text: &str) -> Result<String> {
    let body: GeminiResponse = serde_json::from_str(body_text)
        .map_err(|e| anyhow!("Gemini response parse error: {}", e))?;
    let text: String = body
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|cand| cand.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GeminiFailure::Empty.into());
    }
    Ok(text.trim().to_string())
}
