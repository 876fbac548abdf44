use std::path::PathBuf;

use crate::shared::error::ai::LlmError;

use super::AiFuture;

pub trait DialoguePort: Send + Sync {
    fn generate(&self, prompt: String) -> AiFuture<Result<String, LlmError>>;

    /// Same session as `generate`, with a PNG attached to the user message.
    fn generate_with_image(
        &self,
        prompt: String,
        image: PathBuf,
    ) -> AiFuture<Result<String, LlmError>>;
}
