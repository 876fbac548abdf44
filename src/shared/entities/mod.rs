pub mod emotion;
pub mod mood;
pub mod skill;
pub mod turn;

pub use emotion::Emotion;
pub use mood::MoodValue;
pub use skill::SkillResult;
pub use turn::{
    AvatarOutcome, DispatchReport, InputMode, Phase, PhaseTimings, Recognition, Turn, TurnId,
    TurnKind,
};
