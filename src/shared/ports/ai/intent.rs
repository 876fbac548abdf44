use crate::shared::error::ai::IntentError;

use super::AiFuture;

pub trait IntentPort: Send + Sync {
    fn classify_intent(&self, text: String) -> AiFuture<Result<String, IntentError>>;
}
