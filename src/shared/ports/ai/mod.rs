use std::future::Future;
use std::pin::Pin;

pub mod asr;
pub mod emotion;
pub mod image;
pub mod intent;
pub mod llm;
pub mod mood;
pub mod translate;
pub mod tts;

pub use asr::SpeechCapturePort;
pub use emotion::EmotionPort;
pub use image::ImageRequirementPort;
pub use intent::IntentPort;
pub use llm::DialoguePort;
pub use mood::MoodPort;
pub use translate::TranslatorPort;
pub use tts::TtsPort;

pub use crate::shared::error::ai::{
    AsrError, EmotionError, ImageRequirementError, IntentError, LlmError, TranslateError,
    TtsError,
};

pub type AiFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Aggregate trait for the services one turn fans out to.
pub trait AiServices:
    DialoguePort + TranslatorPort + EmotionPort + MoodPort + ImageRequirementPort + TtsPort
{
}

impl<T> AiServices for T where
    T: DialoguePort + TranslatorPort + EmotionPort + MoodPort + ImageRequirementPort + TtsPort
{
}
