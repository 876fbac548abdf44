use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::shared::entities::{Emotion, MoodValue};
use crate::shared::error::InputModeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 hex digits, enough to correlate log lines of one turn.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Manual,
    Voice,
}

impl InputMode {
    /// `"0"` selects typed input, `"1"` speech recognition.
    pub fn from_selection(raw: &str) -> Result<Self, InputModeError> {
        match raw.trim() {
            "0" => Ok(InputMode::Manual),
            "1" => Ok(InputMode::Voice),
            other => Err(InputModeError::Unsupported(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::Manual => "manual",
            InputMode::Voice => "voice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    User,
    Greeting,
    TimerNotice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreAnalysis,
    Intent,
    ImageRequirement,
    PromptAssembly,
    Screenshot,
    Generation,
    PostAnalysis,
    Translation,
    Emotion,
    Mood,
    Synthesis,
    Dispatch,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::PreAnalysis => "pre_analysis",
            Phase::Intent => "intent",
            Phase::ImageRequirement => "image_requirement",
            Phase::PromptAssembly => "prompt_assembly",
            Phase::Screenshot => "screenshot",
            Phase::Generation => "generation",
            Phase::PostAnalysis => "post_analysis",
            Phase::Translation => "translation",
            Phase::Emotion => "emotion",
            Phase::Mood => "mood",
            Phase::Synthesis => "synthesis",
            Phase::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elapsed time per phase and per concurrent task, in recording order.
#[derive(Debug, Clone, Default)]
pub struct PhaseTimings {
    entries: Vec<(Phase, Duration)>,
}

impl PhaseTimings {
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        self.entries.push((phase, elapsed));
    }

    pub fn get(&self, phase: Phase) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, d)| *d)
    }

    pub fn entries(&self) -> &[(Phase, Duration)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one avatar control call. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarOutcome {
    Delivered,
    Rejected(u16),
    Unreachable(String),
    Disabled,
}

impl AvatarOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AvatarOutcome::Delivered)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub subtitle: Option<AvatarOutcome>,
    pub expression: Option<AvatarOutcome>,
    pub motion: Option<AvatarOutcome>,
    pub mood: Option<AvatarOutcome>,
    /// `None` when synthesis failed and the voice trigger was skipped.
    pub voice: Option<AvatarOutcome>,
    pub avatar_subtitle: Option<AvatarOutcome>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        [
            &self.subtitle,
            &self.expression,
            &self.motion,
            &self.mood,
            &self.voice,
            &self.avatar_subtitle,
        ]
        .into_iter()
        .flatten()
        .all(AvatarOutcome::is_success)
    }
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub id: TurnId,
    pub kind: TurnKind,
    pub user_input: String,
    pub mode: InputMode,
    pub prompt: String,
    pub task_matched: bool,
    pub image_required: bool,
    pub response: String,
    pub translation: String,
    pub emotion: Emotion,
    pub mood: MoodValue,
    pub voice_path: Option<PathBuf>,
    pub timings: PhaseTimings,
    pub total: Duration,
    pub dispatch: DispatchReport,
}

impl Turn {
    pub fn new(kind: TurnKind, user_input: impl Into<String>, mode: InputMode) -> Self {
        Self {
            id: TurnId::new(),
            kind,
            user_input: user_input.into(),
            mode,
            prompt: String::new(),
            task_matched: false,
            image_required: false,
            response: String::new(),
            translation: String::new(),
            emotion: Emotion::Normal,
            mood: MoodValue::NEUTRAL,
            voice_path: None,
            timings: PhaseTimings::default(),
            total: Duration::ZERO,
            dispatch: DispatchReport::default(),
        }
    }

    /// Text pushed to the subtitle display.
    pub fn subtitle_text(&self) -> String {
        format!("{} <br> {}", self.response, self.translation)
    }
}

/// One speech capture attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    pub text: String,
    pub recognized: bool,
}

impl Recognition {
    pub fn heard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            recognized: true,
        }
    }

    pub fn silence() -> Self {
        Self::default()
    }
}
