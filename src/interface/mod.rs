pub mod avatar;
pub mod screenshot;

pub use avatar::{HttpAvatarClient, NoopAvatar};
pub use screenshot::CommandScreenshot;
