pub mod ai;
pub mod conversation;
pub mod session;
pub mod skills;

pub use ai::{DefaultAiPort, GeminiServices};
pub use conversation::Orchestrator;
pub use session::{turn_channel, SessionLoop, TurnRequest, TurnRx, TurnTx};
pub use skills::SkillDispatcher;
