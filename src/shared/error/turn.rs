use thiserror::Error;

use super::ai::LlmError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoodError {
    #[error("no mood score in classifier output")]
    NotFound,
    #[error("mood score {0} outside 0..=100")]
    OutOfRange(u32),
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("empty input")]
    EmptyInput,
    #[error("response generation failed: {0}")]
    Generation(#[from] LlmError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputModeError {
    #[error("unsupported input mode: {0:?}")]
    Unsupported(String),
}
