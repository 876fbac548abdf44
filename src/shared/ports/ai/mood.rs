use crate::shared::error::ai::LlmError;

use super::AiFuture;

pub trait MoodPort: Send + Sync {
    fn score_mood(&self, user_text: String, response: String) -> AiFuture<Result<String, LlmError>>;
}
