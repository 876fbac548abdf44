//! External inference clients: Gemini chat sessions, speech synthesis and
//! speech capture. HTTP and file I/O stay inside this module; callers only see
//! the port traits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use base64::Engine;
use reqwest::Client;

use crate::shared::config::{self, AiConfig};
use crate::shared::error::ai::{
    EmotionError, ImageRequirementError, IntentError, LlmError, TranslateError, TtsError,
};
use crate::shared::ports::ai::{
    AiFuture, DialoguePort, EmotionPort, ImageRequirementPort, IntentPort, MoodPort,
    TranslatorPort, TtsPort,
};

pub mod asr;
pub mod gemini;
pub mod prompts;
pub mod tts;

pub use asr::WhisperCapture;
pub use gemini::{ChatSession, GeminiFailure, GeminiPart, SessionSpec};
pub use prompts::{init_prompts, prompt, PromptKind};
pub use tts::SpeechSynthesizer;

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Marker the image-requirement classifier uses for "screenshot needed".
pub fn image_required_from(raw: &str) -> bool {
    raw.contains("必要")
}

struct Sessions {
    client: Client,
    dialogue: ChatSession,
    translation: ChatSession,
    emotion: ChatSession,
    mood: ChatSession,
    intent: ChatSession,
    image: ChatSession,
}

/// The six Gemini sessions behind the inference ports. Cloning shares the
/// sessions and their histories.
#[derive(Clone)]
pub struct GeminiServices {
    inner: Arc<Sessions>,
}

impl GeminiServices {
    /// Builds every session from `ai_config()` and the cached prompts.
    /// `intent_prompt` is rendered from the task catalogue by the caller.
    pub fn from_config(intent_prompt: String) -> Result<Self> {
        let cfg = config::ai_config();
        if cfg.gemini_api_key.is_none() {
            log::warn!("[ai] GEMINI_API_KEY is not set; every inference call will fail");
        }
        Self::new(cfg, intent_prompt, config::timeouts().ai_http)
    }

    pub fn new(cfg: &AiConfig, intent_prompt: String, timeout: Duration) -> Result<Self> {
        let key = cfg.gemini_api_key.clone();
        let session = |name: &'static str, model: &str, temperature: f32, prompt: String| {
            ChatSession::new(
                SessionSpec {
                    name,
                    model: model.to_string(),
                    api_key: key.clone(),
                    temperature,
                    system_prompt: prompt,
                },
                cfg.gemini_api_base.clone(),
            )
        };

        let analyzer = cfg.analyzer_model.as_str();
        let translation = ChatSession::new(
            SessionSpec {
                name: "translation",
                model: analyzer.to_string(),
                api_key: cfg.gemini_translate_api_key.clone(),
                temperature: 1.0,
                system_prompt: prompt(PromptKind::Translation),
            },
            cfg.gemini_api_base.clone(),
        );

        Ok(Self {
            inner: Arc::new(Sessions {
                client: http_client(timeout)?,
                dialogue: session(
                    "dialogue",
                    &cfg.dialogue_model,
                    1.0,
                    prompt(PromptKind::Persona),
                ),
                translation,
                emotion: session("emotion", analyzer, 0.0, prompt(PromptKind::Emotion)),
                mood: session("mood", analyzer, 0.0, prompt(PromptKind::Mood)),
                intent: session("intent", analyzer, 0.0, intent_prompt),
                image: session(
                    "image_requirement",
                    analyzer,
                    0.0,
                    prompt(PromptKind::ImageRequirement),
                ),
            }),
        })
    }

    async fn ask(&self, pick: fn(&Sessions) -> &ChatSession, text: String) -> Result<String> {
        let sessions = &*self.inner;
        let session = pick(sessions);
        let answer = session
            .send(&sessions.client, vec![GeminiPart::text(text.clone())], text)
            .await;
        if let Err(err) = &answer {
            log::warn!("[gemini {}] request failed: {}", session.name(), err);
        }
        answer
    }
}

fn to_llm_error(err: anyhow::Error) -> LlmError {
    match err.downcast_ref::<GeminiFailure>() {
        Some(GeminiFailure::MissingKey) => LlmError::MissingApiKey,
        Some(GeminiFailure::RateLimited) => LlmError::RateLimited,
        Some(GeminiFailure::Empty) => LlmError::EmptyResponse,
        None => LlmError::GenerationFailed(err.to_string()),
    }
}

impl DialoguePort for GeminiServices {
    fn generate(&self, prompt: String) -> AiFuture<Result<String, LlmError>> {
        let this = self.clone();
        Box::pin(async move {
            this.ask(|s| &s.dialogue, prompt)
                .await
                .map_err(to_llm_error)
        })
    }

    fn generate_with_image(
        &self,
        prompt: String,
        image: PathBuf,
    ) -> AiFuture<Result<String, LlmError>> {
        let this = self.clone();
        Box::pin(async move {
            let bytes = tokio::fs::read(&image).await.map_err(|e| {
                LlmError::GenerationFailed(format!("read {}: {}", image.display(), e))
            })?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            let sessions = &*this.inner;
            sessions
                .dialogue
                .send(
                    &sessions.client,
                    vec![GeminiPart::text(prompt.clone()), GeminiPart::png(encoded)],
                    prompt,
                )
                .await
                .map_err(to_llm_error)
        })
    }
}

impl TranslatorPort for GeminiServices {
    fn translate(&self, text: String) -> AiFuture<Result<String, TranslateError>> {
        let this = self.clone();
        Box::pin(async move {
            this.ask(|s| &s.translation, text)
                .await
                .map_err(|e| TranslateError::TranslationFailed(e.to_string()))
        })
    }
}

impl EmotionPort for GeminiServices {
    fn classify_emotion(&self, text: String) -> AiFuture<Result<String, EmotionError>> {
        let this = self.clone();
        Box::pin(async move {
            this.ask(|s| &s.emotion, text)
                .await
                .map_err(|e| EmotionError::AnalysisFailed(e.to_string()))
        })
    }
}

impl MoodPort for GeminiServices {
    fn score_mood(&self, user_text: String, response: String) -> AiFuture<Result<String, LlmError>> {
        let this = self.clone();
        Box::pin(async move {
            let message = format!("ユーザーの発言: {}\nAITuberの発言: {}", user_text, response);
            this.ask(|s| &s.mood, message).await.map_err(to_llm_error)
        })
    }
}

impl IntentPort for GeminiServices {
    fn classify_intent(&self, text: String) -> AiFuture<Result<String, IntentError>> {
        let this = self.clone();
        Box::pin(async move {
            this.ask(|s| &s.intent, text)
                .await
                .map_err(|e| IntentError::ClassificationFailed(e.to_string()))
        })
    }
}

impl ImageRequirementPort for GeminiServices {
    fn detect_image_requirement(
        &self,
        text: String,
    ) -> AiFuture<Result<String, ImageRequirementError>> {
        let this = self.clone();
        Box::pin(async move {
            this.ask(|s| &s.image, text)
                .await
                .map_err(|e| ImageRequirementError::DetectionFailed(e.to_string()))
        })
    }
}

/// Gemini sessions plus the speech synthesizer: everything one turn fans out to.
#[derive(Clone)]
pub struct DefaultAiPort {
    gemini: GeminiServices,
    tts: SpeechSynthesizer,
}

impl DefaultAiPort {
    pub fn new(gemini: GeminiServices, tts: SpeechSynthesizer) -> Self {
        Self { gemini, tts }
    }
}

impl DialoguePort for DefaultAiPort {
    fn generate(&self, prompt: String) -> AiFuture<Result<String, LlmError>> {
        self.gemini.generate(prompt)
    }

    fn generate_with_image(
        &self,
        prompt: String,
        image: PathBuf,
    ) -> AiFuture<Result<String, LlmError>> {
        self.gemini.generate_with_image(prompt, image)
    }
}

impl TranslatorPort for DefaultAiPort {
    fn translate(&self, text: String) -> AiFuture<Result<String, TranslateError>> {
        self.gemini.translate(text)
    }
}

impl EmotionPort for DefaultAiPort {
    fn classify_emotion(&self, text: String) -> AiFuture<Result<String, EmotionError>> {
        self.gemini.classify_emotion(text)
    }
}

impl MoodPort for DefaultAiPort {
    fn score_mood(&self, user_text: String, response: String) -> AiFuture<Result<String, LlmError>> {
        self.gemini.score_mood(user_text, response)
    }
}

impl ImageRequirementPort for DefaultAiPort {
    fn detect_image_requirement(
        &self,
        text: String,
    ) -> AiFuture<Result<String, ImageRequirementError>> {
        self.gemini.detect_image_requirement(text)
    }
}

impl TtsPort for DefaultAiPort {
    fn synth_to_wav(&self, text: String, path: PathBuf) -> AiFuture<Result<PathBuf, TtsError>> {
        self.tts.synth_to_wav(text, path)
    }
}
