use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsrError {
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("Recording failed: {0}")]
    RecordingFailed(String),
    #[error("Service unavailable")]
    ServiceUnavailable,
    #[error("Timeout")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum IntentError {
    #[error("Classification failed: {0}")]
    ClassificationFailed(String),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    #[error("Missing API key")]
    MissingApiKey,
    #[error("Rate limited")]
    RateLimited,
    #[error("Empty response")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Translation failed: {0}")]
    TranslationFailed(String),
}

#[derive(Debug, Error)]
pub enum EmotionError {
    #[error("Emotion analysis failed: {0}")]
    AnalysisFailed(String),
}

#[derive(Debug, Error)]
pub enum ImageRequirementError {
    #[error("Image requirement detection failed: {0}")]
    DetectionFailed(String),
}

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),
    #[error("Empty text")]
    EmptyText,
}
