use crate::shared::error::ai::TranslateError;

use super::AiFuture;

pub trait TranslatorPort: Send + Sync {
    fn translate(&self, text: String) -> AiFuture<Result<String, TranslateError>>;
}
