use std::future::Future;
use std::pin::Pin;

use crate::shared::entities::AvatarOutcome;

pub type AvatarFuture = Pin<Box<dyn Future<Output = AvatarOutcome> + Send>>;

/// Avatar control plane. Every call resolves to an outcome and never errors.
pub trait AvatarPort: Send + Sync {
    fn set_expression(&self, expression: String) -> AvatarFuture;
    /// Plays the motion clip mapped from an emotion label.
    fn play_motion(&self, emotion: String) -> AvatarFuture;
    fn set_mood(&self, mood: u8) -> AvatarFuture;
    fn play_voice(&self) -> AvatarFuture;
    fn send_subtitle(&self, japanese: String, english: String) -> AvatarFuture;
}

pub trait SubtitlePort: Send + Sync {
    fn update_subtitle(&self, text: String) -> AvatarFuture;
}
