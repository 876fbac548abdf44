use crate::shared::entities::Recognition;
use crate::shared::error::ai::AsrError;

use super::AiFuture;

pub trait SpeechCapturePort: Send + Sync {
    /// Records one utterance and transcribes it.
    fn listen(&self) -> AiFuture<Result<Recognition, AsrError>>;
}
