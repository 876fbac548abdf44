use std::path::PathBuf;

use crate::shared::error::ai::TtsError;

use super::AiFuture;

pub trait TtsPort: Send + Sync {
    fn synth_to_wav(&self, text: String, path: PathBuf) -> AiFuture<Result<PathBuf, TtsError>>;
}
