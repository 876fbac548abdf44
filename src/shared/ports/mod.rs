pub mod ai;
pub mod avatar;
pub mod screenshot;
pub mod skills;
pub mod turn;

pub use ai::{AiFuture, AiServices};
pub use avatar::{AvatarFuture, AvatarPort, SubtitlePort};
pub use screenshot::{ScreenshotPort, WindowRef};
pub use skills::{SkillFuture, SkillServices};
pub use turn::{turn_channel, TurnRequest, TurnRx, TurnTx};
