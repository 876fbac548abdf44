use crate::shared::error::ai::ImageRequirementError;

use super::AiFuture;

pub trait ImageRequirementPort: Send + Sync {
    fn detect_image_requirement(
        &self,
        text: String,
    ) -> AiFuture<Result<String, ImageRequirementError>>;
}
