pub mod ai;
pub mod skill;
pub mod turn;

pub use ai::{
    AsrError, EmotionError, ImageRequirementError, IntentError, LlmError, TranslateError,
    TtsError,
};
pub use skill::SkillError;
pub use turn::{InputModeError, MoodError, TurnError};
