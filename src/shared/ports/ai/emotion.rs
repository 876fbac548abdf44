use crate::shared::error::ai::EmotionError;

use super::AiFuture;

/// Returns the classifier's raw text; label extraction happens in the caller.
pub trait EmotionPort: Send + Sync {
    fn classify_emotion(&self, text: String) -> AiFuture<Result<String, EmotionError>>;
}
